//! Permafrost CLI: cron-invoked freshness probes for off-site backups.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use permafrost::config::{CliArgs, ProbeConfig};
use permafrost::probe::{self, RunContext};
use permafrost_core::capture::CommandCapture;
use permafrost_core::emit;
use permafrost_core::metrics::events::{ArtifactKind, ProbeFailed};
use permafrost_core::storage::StorageProvider;
use permafrost_core::{init_metrics, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();
    let config = match ProbeConfig::from_args(args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_metrics(config.push_gateway.as_ref()) {
        eprintln!("Failed to initialize metrics: {e}");
        return ExitCode::FAILURE;
    }

    let mut failures = 0usize;

    if let Some(postgres) = &config.postgres {
        match build_context(&config, &postgres.prefix_url).await {
            Ok(ctx) => {
                if let Err(e) =
                    probe::incremental::measure_latest_object(&ctx, ArtifactKind::Wal, &postgres.wal_subdir)
                        .await
                {
                    failures += 1;
                    emit!(ProbeFailed {
                        kind: ArtifactKind::Wal
                    });
                    error!("wal probe failed: {e}");
                }

                let capture = CommandCapture::new().with_timeout(config.command_timeout);
                if let Err(e) = probe::base::measure_last_base(
                    &ctx,
                    &capture,
                    &postgres.backup_list_command,
                    &postgres.base_dir_prefix,
                )
                .await
                {
                    failures += 1;
                    emit!(ProbeFailed {
                        kind: ArtifactKind::Base
                    });
                    error!("base probe failed: {e}");
                }
            }
            Err(e) => {
                // Both measurements for this target were skipped.
                failures += 2;
                error!("cannot reach PostgreSQL backup prefix: {e}");
            }
        }
    }

    if let Some(redis) = &config.redis {
        match build_context(&config, &redis.prefix_url).await {
            Ok(ctx) => {
                if let Err(e) = probe::incremental::measure_latest_object(
                    &ctx,
                    ArtifactKind::RedisDump,
                    &redis.subdir,
                )
                .await
                {
                    failures += 1;
                    emit!(ProbeFailed {
                        kind: ArtifactKind::RedisDump
                    });
                    error!("redis-dump probe failed: {e}");
                }
            }
            Err(e) => {
                failures += 1;
                error!("cannot reach Redis backup prefix: {e}");
            }
        }
    }

    if let Some(push) = &config.push_gateway {
        // Give the push exporter one full cycle to deliver the final gauges.
        tokio::time::sleep(push.interval).await;
    }

    if failures > 0 {
        info!(failures, "Probe run finished with failures");
        ExitCode::FAILURE
    } else {
        info!("Probe run finished");
        ExitCode::SUCCESS
    }
}

async fn build_context(
    config: &ProbeConfig,
    prefix_url: &str,
) -> Result<RunContext, permafrost_core::error::StorageError> {
    let storage =
        StorageProvider::for_url_with_options(prefix_url, config.storage_options()).await?;

    Ok(RunContext {
        storage: Arc::new(storage),
        page_size: config.page_size,
        state_dir: config.state_dir.clone(),
    })
}
