//! Metrics emission and recorder initialization.
//!
//! Gauges and counters are emitted through typed events (`events` module)
//! rather than scattered `gauge!`/`counter!` calls. The recorder is
//! Prometheus-backed; because each probe run is a short-lived cron process,
//! the exporter pushes to a push gateway instead of serving a scrape
//! endpoint.

pub mod events;

use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;
use snafu::prelude::*;

use crate::error::{MetricsError, PrometheusInitSnafu};

/// Push gateway endpoint for short-lived probe processes.
#[derive(Debug, Clone)]
pub struct PushGatewayConfig {
    /// Full push URL, e.g. `http://pushgateway:9091/metrics/job/permafrost`.
    pub endpoint: String,
    /// How often the exporter pushes collected metrics.
    pub interval: Duration,
}

/// Install the Prometheus recorder.
///
/// With a [`PushGatewayConfig`] the exporter pushes on `interval` until the
/// process exits; without one the recorder is installed standalone (metrics
/// are recorded but not exported — useful for dev runs and tests).
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(push: Option<&PushGatewayConfig>) -> Result<(), MetricsError> {
    match push {
        Some(config) => PrometheusBuilder::new()
            .with_push_gateway(&config.endpoint, config.interval, None, None)
            .context(PrometheusInitSnafu)?
            .install()
            .context(PrometheusInitSnafu)?,
        None => {
            PrometheusBuilder::new()
                .install_recorder()
                .context(PrometheusInitSnafu)?;
        }
    }
    Ok(())
}

/// Macro for emitting metric events.
///
/// Calls `InternalEvent::emit()` on the given event, which records the
/// corresponding Prometheus metric.
///
/// # Example
///
/// ```ignore
/// use permafrost_core::emit;
/// use permafrost_core::metrics::events::{ArtifactKind, ScanEmpty};
///
/// emit!(ScanEmpty { kind: ArtifactKind::Wal });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}

pub use emit;
