//! Common error types for the permafrost crates.
//!
//! One enum per concern: storage, cursor persistence, subprocess capture,
//! value classification, and metrics initialization.

use snafu::prelude::*;
use std::path::PathBuf;
use std::time::Duration;

// ============ Storage Errors ============

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed: {source}"))]
    ObjectStore { source: object_store::Error },

    /// IO error during storage operations.
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error: {source}"))]
    S3Config { source: object_store::Error },
}

impl StorageError {
    /// Check if this error represents a "not found" condition (404, NoSuchKey, etc.)
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::ObjectStore { source } => {
                matches!(source, object_store::Error::NotFound { .. })
            }
            _ => false,
        }
    }
}

// ============ Cursor Store Errors ============

/// Errors that can occur while loading or persisting a cursor file.
///
/// A missing file is not an error (the store starts empty); a present but
/// malformed file is fatal and intentionally does not self-heal.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CursorError {
    /// Failed to read the persisted cursor file.
    #[snafu(display("Failed to read cursor file {}: {source}", path.display()))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The persisted cursor file exists but does not parse.
    #[snafu(display("Corrupt cursor file {}: {source}", path.display()))]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to write the temporary cursor file.
    #[snafu(display("Failed to write cursor file {}: {source}", path.display()))]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to atomically replace the cursor file.
    #[snafu(display("Failed to replace cursor file {}: {source}", path.display()))]
    Persist {
        path: PathBuf,
        source: tempfile::PersistError,
    },
}

// ============ Capture Errors ============

/// Errors that can occur while running an external command.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CaptureError {
    /// No command was given.
    #[snafu(display("Cannot capture an empty command"))]
    EmptyCommand,

    /// Failed to create the stderr spool file.
    #[snafu(display("Failed to create stderr spool file: {source}"))]
    Spool { source: std::io::Error },

    /// Failed to spawn the child process.
    #[snafu(display("Failed to spawn `{command}`: {source}"))]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// Failed to read the child's stdout.
    #[snafu(display("Failed to read stdout of `{command}`: {source}"))]
    Stdout {
        command: String,
        source: std::io::Error,
    },

    /// Failed to wait for the child process.
    #[snafu(display("Failed to wait for `{command}`: {source}"))]
    Wait {
        command: String,
        source: std::io::Error,
    },

    /// The command exited unsuccessfully.
    #[snafu(display("Command `{command}` exited with {} ({} stderr line(s))",
        match status {
            Some(code) => format!("status {code}"),
            None => "a signal".to_string(),
        },
        stderr.len()))]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: Vec<String>,
    },

    /// The command did not finish within the configured deadline.
    #[snafu(display("Command `{command}` timed out after {timeout:?}"))]
    TimedOut { command: String, timeout: Duration },
}

// ============ Value Classification Errors ============

/// Errors raised when a classified value cannot be used as requested.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ValueError {
    /// A field did not classify to anything the caller can use.
    ///
    /// Treated as fatal: it signals an upstream output-format change,
    /// not a transient condition.
    #[snafu(display("Unrecognized value for {field}: {value:?}"))]
    UnrecognizedValue { field: String, value: String },
}

// ============ Metrics Errors ============

/// Errors that can occur during metrics initialization.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MetricsError {
    /// Failed to initialize the Prometheus recorder.
    #[snafu(display("Failed to initialize Prometheus recorder: {source}"))]
    PrometheusInit {
        source: metrics_exporter_prometheus::BuildError,
    },
}
