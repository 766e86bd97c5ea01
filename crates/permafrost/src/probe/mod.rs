//! The probes: one module per measurement style, plus the shared run
//! context.
//!
//! Each probe measures one target independently; the driver catches probe
//! errors so a failing target never blocks the others.

pub mod base;
pub mod incremental;

use std::path::PathBuf;

use permafrost_core::metrics::events::ArtifactKind;
use permafrost_core::storage::StorageProviderRef;

/// Everything a probe needs for one run, constructed once per invocation
/// and passed in explicitly.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Storage provider for the target's prefix URI.
    pub storage: StorageProviderRef,
    /// Maximum keys per listing page.
    pub page_size: usize,
    /// Directory holding the per-target cursor files.
    pub state_dir: PathBuf,
}

impl RunContext {
    /// Cursor file path for the given artifact kind.
    pub fn cursor_path(&self, kind: ArtifactKind) -> PathBuf {
        self.state_dir.join(format!("{}.json", kind.as_str()))
    }
}
