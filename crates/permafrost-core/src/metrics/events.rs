//! Internal events for permafrost metrics emission.
//!
//! Each event struct represents a measurable occurrence in a probe run.
//! Events implement the [`InternalEvent`] trait which emits the
//! corresponding Prometheus metric, labelled by backup artifact kind.

use metrics::{counter, gauge};
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// The kind of backup artifact a measurement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Archived write-ahead-log segment.
    Wal,
    /// Full/base snapshot.
    Base,
    /// Key-value-store dump.
    RedisDump,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Wal => "wal",
            ArtifactKind::Base => "base",
            ArtifactKind::RedisDump => "redis-dump",
        }
    }

    /// Human description used in report lines.
    pub fn description(&self) -> &'static str {
        match self {
            ArtifactKind::Wal => "archived WAL",
            ArtifactKind::Base => "base image",
            ArtifactKind::RedisDump => "Redis backup",
        }
    }
}

/// Age of the most recent backup artifact.
pub struct BackupAge {
    pub kind: ArtifactKind,
    pub age_seconds: f64,
}

impl InternalEvent for BackupAge {
    fn emit(self) {
        trace!(kind = self.kind.as_str(), age_seconds = self.age_seconds, "Backup age");
        gauge!("permafrost_backup_age_seconds", "kind" => self.kind.as_str())
            .set(self.age_seconds);
    }
}

/// Size of the most recent backup artifact.
pub struct BackupSize {
    pub kind: ArtifactKind,
    pub bytes: u64,
}

impl InternalEvent for BackupSize {
    fn emit(self) {
        trace!(kind = self.kind.as_str(), bytes = self.bytes, "Backup size");
        gauge!("permafrost_backup_size_bytes", "kind" => self.kind.as_str())
            .set(self.bytes as f64);
    }
}

/// A scan returned a truncated page; no sample was produced.
pub struct ScanTruncated {
    pub kind: ArtifactKind,
}

impl InternalEvent for ScanTruncated {
    fn emit(self) {
        trace!(kind = self.kind.as_str(), "Scan truncated");
        counter!("permafrost_scan_truncated_total", "kind" => self.kind.as_str()).increment(1);
    }
}

/// A scan found no objects under the target prefix.
pub struct ScanEmpty {
    pub kind: ArtifactKind,
}

impl InternalEvent for ScanEmpty {
    fn emit(self) {
        trace!(kind = self.kind.as_str(), "Scan empty");
        counter!("permafrost_scan_empty_total", "kind" => self.kind.as_str()).increment(1);
    }
}

/// A probe failed; the run continues with remaining targets.
pub struct ProbeFailed {
    pub kind: ArtifactKind,
}

impl InternalEvent for ProbeFailed {
    fn emit(self) {
        trace!(kind = self.kind.as_str(), "Probe failed");
        counter!("permafrost_probe_failures_total", "kind" => self.kind.as_str()).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_kind_labels() {
        assert_eq!(ArtifactKind::Wal.as_str(), "wal");
        assert_eq!(ArtifactKind::Base.as_str(), "base");
        assert_eq!(ArtifactKind::RedisDump.as_str(), "redis-dump");
    }

    #[test]
    fn test_emit_without_recorder_is_a_noop() {
        // The metrics facade drops events when no recorder is installed;
        // probes must be runnable without one.
        crate::emit!(BackupAge {
            kind: ArtifactKind::Wal,
            age_seconds: 12.5,
        });
        crate::emit!(ScanEmpty {
            kind: ArtifactKind::RedisDump,
        });
    }
}
