//! CLI and environment configuration for the probe driver.
//!
//! Targets are identified by storage prefix URIs (`s3://bucket/path`, local
//! paths for development), arriving as flags or environment variables.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use snafu::prelude::*;

use permafrost_core::metrics::PushGatewayConfig;

use crate::error::{ConfigError, EmptyBackupListCommandSnafu, NoTargetsSnafu};

#[derive(Parser, Debug)]
#[command(name = "permafrost", version, about = "Backup freshness probes for object storage")]
pub struct CliArgs {
    /// Storage prefix URI holding PostgreSQL backups (WAL + base images)
    #[arg(long, env = "WAL_PREFIX")]
    pub wal_prefix: Option<String>,

    /// Directory under the PostgreSQL prefix holding archived WAL segments
    #[arg(long, default_value = "wal_005")]
    pub wal_subdir: String,

    /// Directory-name prefix of the groupings holding base backups
    #[arg(long, default_value = "basebackups_")]
    pub base_dir_prefix: String,

    /// Command that prints the newest base backup on its second output line
    #[arg(long, default_value = "wal-e backup-list LATEST")]
    pub backup_list_command: String,

    /// Storage prefix URI holding Redis dumps
    #[arg(long, env = "REDIS_BACKUP_PREFIX")]
    pub redis_prefix: Option<String>,

    /// Directory under the Redis prefix holding dumps
    #[arg(long, default_value = "redis")]
    pub redis_subdir: String,

    /// Directory for per-target cursor files
    #[arg(long, env = "PERMAFROST_STATE_DIR", default_value = "tmp")]
    pub state_dir: PathBuf,

    /// Maximum keys per listing page
    #[arg(long, default_value_t = 1000)]
    pub page_size: usize,

    /// Timeout for storage API requests, in seconds
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Deadline for the backup listing command, in seconds
    #[arg(long, default_value_t = 120)]
    pub command_timeout_secs: u64,

    /// Prometheus push gateway URL (omit to record without exporting)
    #[arg(long, env = "PUSHGATEWAY_URL")]
    pub pushgateway_url: Option<String>,

    /// Push interval for the gateway exporter, in seconds
    #[arg(long, default_value_t = 10)]
    pub push_interval_secs: u64,
}

/// PostgreSQL backup target (WAL segments + base images).
#[derive(Debug, Clone)]
pub struct PostgresTarget {
    pub prefix_url: String,
    pub wal_subdir: String,
    pub base_dir_prefix: String,
    pub backup_list_command: Vec<String>,
}

/// Redis dump target.
#[derive(Debug, Clone)]
pub struct RedisTarget {
    pub prefix_url: String,
    pub subdir: String,
}

/// Validated configuration for one probe run.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub postgres: Option<PostgresTarget>,
    pub redis: Option<RedisTarget>,
    pub state_dir: PathBuf,
    pub page_size: usize,
    pub request_timeout: Duration,
    pub command_timeout: Duration,
    pub push_gateway: Option<PushGatewayConfig>,
}

impl ProbeConfig {
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        ensure!(
            args.wal_prefix.is_some() || args.redis_prefix.is_some(),
            NoTargetsSnafu
        );

        let postgres = args
            .wal_prefix
            .map(|prefix_url| {
                let backup_list_command: Vec<String> = args
                    .backup_list_command
                    .split_whitespace()
                    .map(str::to_owned)
                    .collect();
                ensure!(!backup_list_command.is_empty(), EmptyBackupListCommandSnafu);

                Ok(PostgresTarget {
                    prefix_url,
                    wal_subdir: args.wal_subdir,
                    base_dir_prefix: args.base_dir_prefix,
                    backup_list_command,
                })
            })
            .transpose()?;

        let redis = args.redis_prefix.map(|prefix_url| RedisTarget {
            prefix_url,
            subdir: args.redis_subdir,
        });

        let push_gateway = args.pushgateway_url.map(|endpoint| PushGatewayConfig {
            endpoint,
            interval: Duration::from_secs(args.push_interval_secs.max(1)),
        });

        Ok(Self {
            postgres,
            redis,
            state_dir: args.state_dir,
            page_size: args.page_size,
            request_timeout: Duration::from_secs(args.request_timeout_secs),
            command_timeout: Duration::from_secs(args.command_timeout_secs),
            push_gateway,
        })
    }

    /// Backend options passed through to the storage provider.
    pub fn storage_options(&self) -> HashMap<String, String> {
        HashMap::from([(
            "timeout".to_string(),
            format!("{}s", self.request_timeout.as_secs()),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("permafrost").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_no_targets_rejected() {
        let err = ProbeConfig::from_args(parse(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::NoTargets));
    }

    #[test]
    fn test_postgres_target() {
        let config =
            ProbeConfig::from_args(parse(&["--wal-prefix", "s3://backups/pg"])).unwrap();

        let postgres = config.postgres.unwrap();
        assert_eq!(postgres.prefix_url, "s3://backups/pg");
        assert_eq!(postgres.wal_subdir, "wal_005");
        assert_eq!(
            postgres.backup_list_command,
            vec!["wal-e", "backup-list", "LATEST"]
        );
        assert!(config.redis.is_none());
    }

    #[test]
    fn test_redis_target_only() {
        let config =
            ProbeConfig::from_args(parse(&["--redis-prefix", "s3://backups/redis"])).unwrap();

        assert!(config.postgres.is_none());
        let redis = config.redis.unwrap();
        assert_eq!(redis.prefix_url, "s3://backups/redis");
        assert_eq!(redis.subdir, "redis");
    }

    #[test]
    fn test_empty_backup_list_command_rejected() {
        let err = ProbeConfig::from_args(parse(&[
            "--wal-prefix",
            "s3://backups/pg",
            "--backup-list-command",
            "   ",
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyBackupListCommand));
    }

    #[test]
    fn test_storage_options_carry_timeout() {
        let config = ProbeConfig::from_args(parse(&[
            "--redis-prefix",
            "s3://backups/redis",
            "--request-timeout-secs",
            "15",
        ]))
        .unwrap();

        assert_eq!(
            config.storage_options().get("timeout"),
            Some(&"15s".to_string())
        );
    }

    #[test]
    fn test_push_gateway_config() {
        let config = ProbeConfig::from_args(parse(&[
            "--redis-prefix",
            "s3://backups/redis",
            "--pushgateway-url",
            "http://pushgateway:9091/metrics/job/permafrost",
        ]))
        .unwrap();

        let push = config.push_gateway.unwrap();
        assert_eq!(push.endpoint, "http://pushgateway:9091/metrics/job/permafrost");
        assert_eq!(push.interval, Duration::from_secs(10));
    }
}
