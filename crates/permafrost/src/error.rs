//! Error types for the permafrost probes.

use snafu::prelude::*;

// Re-export core errors
pub use permafrost_core::error::{CaptureError, CursorError, StorageError, ValueError};

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// No monitored target was configured.
    #[snafu(display(
        "No targets configured: set --wal-prefix and/or --redis-prefix (or the matching env vars)"
    ))]
    NoTargets,

    /// The backup listing command is empty.
    #[snafu(display("Backup listing command is empty"))]
    EmptyBackupListCommand,
}

/// Errors that abort measurement of one target.
///
/// The driver catches these per target: a failure on one target is logged
/// and does not block measurement of the others.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProbeError {
    /// Cursor store failure (IO or corrupt persisted content).
    #[snafu(display("Cursor store failure: {source}"))]
    Cursor { source: CursorError },

    /// Object listing failure from the storage API.
    #[snafu(display("Object listing failure: {source}"))]
    Listing { source: StorageError },

    /// The backup listing command could not be run or exited unsuccessfully.
    #[snafu(display("Backup listing command failure: {source}"))]
    Capture { source: CaptureError },

    /// A field of the listing tool's output could not be used.
    #[snafu(display("{source}"))]
    Value { source: ValueError },

    /// The listing tool exited cleanly but never printed a detail line.
    #[snafu(display("Backup listing command `{command}` produced no detail line"))]
    MissingListingLine { command: String },

    /// The detail line did not have the expected shape.
    #[snafu(display("Malformed backup listing line: {line:?}"))]
    MalformedListingLine { line: String },
}
