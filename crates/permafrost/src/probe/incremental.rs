//! Cursor-backed latest-object probe.
//!
//! Used for artifact streams that accumulate as individual objects (WAL
//! segments, key-value dumps): scan strictly after the persisted cursor,
//! report the newest object, flush the cursor.

use chrono::Utc;
use snafu::prelude::*;

use permafrost_core::cursor::CursorStore;
use permafrost_core::emit;
use permafrost_core::metrics::events::{ArtifactKind, ScanEmpty, ScanTruncated};

use crate::error::{CursorSnafu, ListingSnafu, ProbeError};
use crate::probe::RunContext;
use crate::report::{FreshnessSample, report};
use crate::scanner::{ScanOutcome, Scanner};

/// Measure the newest object under `prefix` and advance the cursor.
///
/// Returns the reported sample, or `None` when the listing was truncated or
/// empty (no sample is produced in either case). The cursor store is
/// flushed even then; truncation advances it so repeated runs converge.
pub async fn measure_latest_object(
    ctx: &RunContext,
    kind: ArtifactKind,
    prefix: &str,
) -> Result<Option<FreshnessSample>, ProbeError> {
    let mut cursor = CursorStore::open(ctx.cursor_path(kind)).context(CursorSnafu)?;
    let scanner = Scanner::new(ctx.storage.as_ref(), ctx.page_size);

    let sample = match scanner
        .scan_latest(prefix, &mut cursor)
        .await
        .context(ListingSnafu)?
    {
        ScanOutcome::Latest(object) => {
            let sample = FreshnessSample::from_object(kind, &object, Utc::now());
            println!("{}", report(&sample));
            Some(sample)
        }
        ScanOutcome::Truncated => {
            emit!(ScanTruncated { kind });
            println!(
                "Cannot measure latest {}: listing truncated. Repeated runs should fix this.",
                kind.description()
            );
            None
        }
        ScanOutcome::Empty => {
            emit!(ScanEmpty { kind });
            println!("No objects found under '{prefix}'.");
            None
        }
    };

    cursor.flush().context(CursorSnafu)?;
    Ok(sample)
}
