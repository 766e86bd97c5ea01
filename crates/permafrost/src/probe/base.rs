//! Base (full snapshot) backup probe.
//!
//! Runs the external backup-listing tool, takes the backup id and start
//! time from its detail line, then sums the backup's object sizes across
//! every base-backup grouping — cursor-less, paginating to exhaustion,
//! since one backup can span more objects than fit in a single page.
//!
//! The tool's stdout is consumed as a stream: the probe reacts to the
//! detail line as soon as it arrives, and a later non-zero exit does not
//! invalidate what was already recorded — the sample is reported first,
//! the failure surfaced after.

use chrono::{DateTime, Utc};
use snafu::prelude::*;
use tracing::debug;

use permafrost_core::capture::CommandCapture;
use permafrost_core::error::UnrecognizedValueSnafu;
use permafrost_core::metrics::events::ArtifactKind;
use permafrost_core::value::{ClassifiedValue, classify};

use crate::error::{
    CaptureSnafu, ListingSnafu, MalformedListingLineSnafu, MissingListingLineSnafu, ProbeError,
    ValueSnafu,
};
use crate::probe::RunContext;
use crate::report::{FreshnessSample, report};
use crate::scanner::Scanner;

/// The newest backup as described by the listing tool.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupListing {
    pub backup_id: String,
    pub started_at: DateTime<Utc>,
    /// Uncompressed size, when the tool's output format includes it.
    pub expanded_size_bytes: Option<u64>,
}

/// Parse the tab-separated detail line of the listing tool.
///
/// Expected shape: `<backup_id>\t<start_time>[\t<field>...]`. The first
/// trailing field that classifies as an integer is taken as the expanded
/// size; identifier-like fields (zero-padded segment names, offsets)
/// classify as strings and are ignored.
pub fn parse_backup_line(line: &str) -> Result<BackupListing, ProbeError> {
    let fields: Vec<&str> = line.trim_end().split('\t').collect();
    let [backup_id, started_at, rest @ ..] = fields.as_slice() else {
        return MalformedListingLineSnafu { line }.fail();
    };
    ensure!(!backup_id.is_empty(), MalformedListingLineSnafu { line });

    let started_at = DateTime::parse_from_rfc3339(started_at)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| {
            UnrecognizedValueSnafu {
                field: "start_time".to_string(),
                value: started_at.to_string(),
            }
            .build()
        })
        .context(ValueSnafu)?;

    let expanded_size_bytes = rest.iter().find_map(|field| match classify(field) {
        ClassifiedValue::Integer(v) if v >= 0 => Some(v as u64),
        _ => None,
    });

    Ok(BackupListing {
        backup_id: backup_id.to_string(),
        started_at,
        expanded_size_bytes,
    })
}

/// Measure the newest base backup.
///
/// `command` prints the newest backup on its second line (after a header);
/// `base_dir_prefix` names the directory groupings holding base backups
/// (e.g. `basebackups_`).
pub async fn measure_last_base(
    ctx: &RunContext,
    capture: &CommandCapture,
    command: &[String],
    base_dir_prefix: &str,
) -> Result<FreshnessSample, ProbeError> {
    let mut detail_line: Option<String> = None;
    let outcome = capture
        .run(command, |line, index| {
            // Line 0 is the header; line 1 describes the newest backup.
            if index == 1 {
                detail_line = Some(line.to_string());
            }
        })
        .await
        .context(CaptureSnafu)?;

    let mut sample = None;
    if let Some(line) = &detail_line {
        let listing = parse_backup_line(line)?;
        if let Some(bytes) = listing.expanded_size_bytes {
            debug!(
                backup_id = %listing.backup_id,
                expanded_size_bytes = bytes,
                "Listing tool reported an expanded size"
            );
        }

        let total = total_backup_size(ctx, base_dir_prefix, &listing.backup_id).await?;
        let s = FreshnessSample::from_parts(ArtifactKind::Base, listing.started_at, total, Utc::now());
        println!("{}", report(&s));
        sample = Some(s);
    }

    // Surface a failed exit only after the stream has been fully consumed
    // and anything recorded from it reported.
    if !outcome.success {
        eprintln!("*** Command FAILED: {}", outcome.command());
        for line in &outcome.stderr {
            eprintln!("ERR {line}");
        }
        outcome.into_result().context(CaptureSnafu)?;
    }

    sample.context(MissingListingLineSnafu {
        command: command.join(" "),
    })
}

/// Total stored size of one backup across every base-backup grouping.
async fn total_backup_size(
    ctx: &RunContext,
    base_dir_prefix: &str,
    backup_id: &str,
) -> Result<u64, ProbeError> {
    let scanner = Scanner::new(ctx.storage.as_ref(), ctx.page_size);

    let dirs = match ctx.storage.list_dirs(None).await {
        Ok(dirs) => dirs,
        Err(e) if e.is_not_found() => Vec::new(),
        Err(e) => return Err(e).context(ListingSnafu),
    };

    let mut total = 0u64;
    for dir in dirs.iter().filter(|d| d.starts_with(base_dir_prefix)) {
        total += scanner
            .total_size(&format!("{dir}/{backup_id}"))
            .await
            .context(ListingSnafu)?;
    }

    Ok(total)
}
