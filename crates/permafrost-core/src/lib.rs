//! permafrost-core: Shared infrastructure for the permafrost probes.
//!
//! This crate contains the pieces the probe binary builds on:
//!
//! - `storage/` - Object-storage abstraction (S3, local) with paginated listing
//! - `cursor/` - Durable, crash-safe cursor persistence for incremental scans
//! - `capture/` - Subprocess output capture with streamed stdout
//! - `value` - Ordered classification of raw text into typed metric values
//! - `metrics/` - Gauge/counter emission and recorder initialization
//! - `error` - Error types per concern
//! - `tracing` - Tracing initialization for CLI entry points

pub mod capture;
pub mod cursor;
pub mod error;
pub mod metrics;
pub mod storage;
pub mod tracing;
pub mod value;

// Re-export commonly used items
pub use capture::{CaptureOutcome, CommandCapture};
pub use cursor::{CursorStore, START_AFTER_KEY};
pub use error::{CaptureError, CursorError, MetricsError, StorageError, ValueError};
pub use metrics::{PushGatewayConfig, init_metrics};
pub use metrics::events::ArtifactKind;
pub use storage::{ListPage, ObjectInfo, ObjectLister, StorageProvider, StorageProviderRef};
pub use tracing::init_tracing;
pub use value::{ClassifiedValue, classify};
