//! Durable cursor persistence for incremental scans.
//!
//! A [`CursorStore`] holds a small JSON map, one file per monitored target.
//! The map is loaded at the start of a run, mutated in memory, and flushed
//! once at the end.
//!
//! # Atomic Writes
//!
//! `flush` writes the full map to a temporary file created in the same
//! directory as the target path (same-filesystem requirement for an atomic
//! rename), then renames it over the target. A crash before the rename
//! leaves the previous file intact; a crash after leaves the new file
//! intact. An observer never sees a partially written file.
//!
//! There is no locking: at most one writer per path is an external
//! scheduling guarantee.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use snafu::prelude::*;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{CorruptSnafu, CursorError, PersistSnafu, WriteSnafu};

/// Key under which the exclusive listing lower bound is persisted.
pub const START_AFTER_KEY: &str = "start_after";

/// A persisted map of cursor values for one monitored target.
#[derive(Debug)]
pub struct CursorStore {
    path: PathBuf,
    map: Map<String, Value>,
}

impl CursorStore {
    /// Open the store at `path`.
    ///
    /// A missing file yields an empty map. A present but malformed file is
    /// a [`CursorError::Corrupt`] and aborts the run: silently resetting
    /// the cursor would force a full re-listing of the target prefix.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CursorError> {
        let path = path.into();
        let map = match std::fs::read(&path) {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).context(CorruptSnafu { path: path.clone() })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No cursor file, starting empty");
                Map::new()
            }
            Err(source) => return Err(CursorError::Read { path, source }),
        };

        Ok(Self { path, map })
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    /// Get a string value by key.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.map.get(key).and_then(Value::as_str)
    }

    /// Set a value, replacing any previous entry for `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.map.insert(key.into(), value.into());
    }

    /// The path this store persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize the full map and atomically replace the target file.
    pub fn flush(&self) -> Result<(), CursorError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).context(WriteSnafu {
            path: self.path.clone(),
        })?;

        let mut tmp = NamedTempFile::new_in(dir).context(WriteSnafu {
            path: self.path.clone(),
        })?;

        let mut json = Value::Object(self.map.clone()).to_string();
        json.push('\n');
        tmp.write_all(json.as_bytes()).context(WriteSnafu {
            path: self.path.clone(),
        })?;
        // The rename is only atomic for data that has reached the disk.
        tmp.as_file().sync_all().context(WriteSnafu {
            path: self.path.clone(),
        })?;

        tmp.persist(&self.path).context(PersistSnafu {
            path: self.path.clone(),
        })?;

        debug!(path = %self.path.display(), "Flushed cursor store");
        Ok(())
    }
}
