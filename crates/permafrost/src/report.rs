//! Freshness reporting: samples, gauges, and human-readable lines.

use chrono::{DateTime, Utc};

use permafrost_core::emit;
use permafrost_core::metrics::events::{ArtifactKind, BackupAge, BackupSize};
use permafrost_core::storage::ObjectInfo;

/// Age and size of the most recently discovered backup artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct FreshnessSample {
    pub kind: ArtifactKind,
    pub last_modified: DateTime<Utc>,
    pub age_seconds: f64,
    pub size_bytes: u64,
}

impl FreshnessSample {
    /// Derive a sample from one object descriptor.
    pub fn from_object(kind: ArtifactKind, object: &ObjectInfo, now: DateTime<Utc>) -> Self {
        Self::from_parts(kind, object.last_modified, object.size, now)
    }

    /// Derive a sample from a timestamp and a (possibly summed) size.
    pub fn from_parts(
        kind: ArtifactKind,
        last_modified: DateTime<Utc>,
        size_bytes: u64,
        now: DateTime<Utc>,
    ) -> Self {
        let age_seconds = (now - last_modified).num_milliseconds() as f64 / 1000.0;
        Self {
            kind,
            last_modified,
            age_seconds,
            size_bytes,
        }
    }
}

/// Emit the sample's two gauges and return the human report line.
pub fn report(sample: &FreshnessSample) -> String {
    emit!(BackupAge {
        kind: sample.kind,
        age_seconds: sample.age_seconds,
    });
    emit!(BackupSize {
        kind: sample.kind,
        bytes: sample.size_bytes,
    });

    format!(
        "Latest {}: {} ({}s ago, {})",
        sample.kind.description(),
        sample.last_modified.format("%Y-%m-%d %H:%M:%S UTC"),
        sample.age_seconds as i64,
        format_size(sample.size_bytes)
    )
}

const SIZE_UNITS: [(u64, &str); 4] = [
    (1_000_000_000_000, "TB"),
    (1_000_000_000, "GB"),
    (1_000_000, "MB"),
    (1_000, "kB"),
];

/// Humanize a byte count: the first unit whose quotient is >= 1.0, to one
/// decimal place; raw bytes below 1 kB.
pub fn format_size(bytes: u64) -> String {
    for (denom, unit) in SIZE_UNITS {
        let value = bytes as f64 / denom as f64;
        if value >= 1.0 {
            return format!("{value:.1} {unit}");
        }
    }

    format!("{bytes} bytes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_size_gb() {
        assert_eq!(format_size(1_500_000_000), "1.5 GB");
    }

    #[test]
    fn test_format_size_bytes() {
        assert_eq!(format_size(999), "999 bytes");
        assert_eq!(format_size(0), "0 bytes");
    }

    #[test]
    fn test_format_size_kb() {
        assert_eq!(format_size(2_000), "2.0 kB");
    }

    #[test]
    fn test_format_size_mb_and_tb() {
        assert_eq!(format_size(1_000_000), "1.0 MB");
        assert_eq!(format_size(2_340_000_000_000), "2.3 TB");
    }

    #[test]
    fn test_sample_age() {
        let last_modified = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 12, 5, 30).unwrap();

        let sample = FreshnessSample::from_parts(ArtifactKind::Wal, last_modified, 42, now);
        assert_eq!(sample.age_seconds, 330.0);
    }

    #[test]
    fn test_report_line() {
        let last_modified = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 12, 1, 0).unwrap();

        let sample =
            FreshnessSample::from_parts(ArtifactKind::RedisDump, last_modified, 2_000, now);
        assert_eq!(
            report(&sample),
            "Latest Redis backup: 2026-08-01 12:00:00 UTC (60s ago, 2.0 kB)"
        );
    }
}
