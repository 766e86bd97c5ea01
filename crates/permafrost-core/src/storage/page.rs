//! Paginated object listing types.
//!
//! Models the listing API of an append-only object store: keys are
//! slash-delimited strings, pages are ascending by key, and a page may be
//! truncated when more results exist beyond it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageError;

/// Metadata for one listed object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    /// Object key, relative to the provider's configured prefix.
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
    /// Last-modified timestamp reported by the store.
    pub last_modified: DateTime<Utc>,
}

/// One page of an object listing, ascending by key.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectInfo>,
    /// More objects exist beyond this page.
    pub truncated: bool,
}

/// Seam for paginated listings, implemented by the storage provider and by
/// in-memory fakes in tests.
#[async_trait]
pub trait ObjectLister: Send + Sync {
    /// List at most `max_keys` keys under `prefix`, strictly after
    /// `start_after` (exclusive), ascending. `truncated` is set when more
    /// keys remain beyond the returned page.
    async fn list_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage, StorageError>;
}
