//! Object-storage abstraction for the probes.
//!
//! Provides a unified interface over S3 and the local filesystem, built on
//! the `object_store` crate. The probes only ever *observe* backup data, so
//! the surface is listing-only: paginated key listing (`list_page`) and
//! delimiter listing of common prefixes (`list_dirs`).

mod local;
mod page;
mod s3;
mod url_parser;

pub use page::{ListPage, ObjectInfo, ObjectLister};
pub use url_parser::BackendConfig;

use async_trait::async_trait;
use futures::StreamExt;
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore};
use snafu::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ObjectStoreSnafu, StorageError};

// Re-export config types
pub use local::LocalConfig;
pub use s3::S3Config;

/// A reference-counted storage provider.
pub type StorageProviderRef = Arc<StorageProvider>;

/// Storage provider that abstracts over the supported backends.
#[derive(Clone)]
pub struct StorageProvider {
    pub(crate) config: BackendConfig,
    pub(crate) object_store: Arc<dyn ObjectStore>,
    pub(crate) canonical_url: String,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.canonical_url)
    }
}

impl StorageProvider {
    /// Create a storage provider for the given URL with storage options.
    ///
    /// Options are backend configuration strings passed through to the
    /// underlying store (e.g. `"timeout" => "30s"` for client timeouts).
    pub async fn for_url_with_options(
        url: &str,
        options: HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        let config = BackendConfig::parse_url(url)?;

        match config {
            BackendConfig::S3(config) => Self::construct_s3(config, options).await,
            BackendConfig::Local(config) => Self::construct_local(config).await,
        }
    }

    /// Get the backend configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// List at most `max_keys` keys under `prefix` (relative to the
    /// configured base prefix), strictly after `start_after`, ascending by
    /// key. Sets `truncated` when more keys remain.
    ///
    /// Cloud listings arrive in lexicographic order from the service and are
    /// consumed lazily, so a page near the tail of a large prefix never
    /// re-lists the whole prefix. The local backend gives no ordering
    /// guarantee and is collected and sorted instead (test/dev scale).
    pub async fn list_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage, StorageError> {
        let max_keys = max_keys.max(1);
        match &self.config {
            BackendConfig::Local(_) => {
                self.list_page_collected(prefix, start_after, max_keys).await
            }
            BackendConfig::S3(_) => self.list_page_streamed(prefix, start_after, max_keys).await,
        }
    }

    async fn list_page_streamed(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage, StorageError> {
        let full_prefix = self.full_prefix(prefix);
        let strip_parts = self.key_part_count();

        let mut stream = match start_after {
            Some(after) => {
                let offset = self.qualify_key(after);
                self.object_store
                    .list_with_offset(full_prefix.as_ref(), &offset)
            }
            None => self.object_store.list(full_prefix.as_ref()),
        };

        let mut objects = Vec::new();
        let mut truncated = false;
        while let Some(result) = stream.next().await {
            let meta = result.context(ObjectStoreSnafu)?;
            if objects.len() == max_keys {
                truncated = true;
                break;
            }
            objects.push(Self::to_object_info(meta, strip_parts));
        }

        Ok(ListPage { objects, truncated })
    }

    async fn list_page_collected(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage, StorageError> {
        let full_prefix = self.full_prefix(prefix);
        let strip_parts = self.key_part_count();

        let mut stream = self.object_store.list(full_prefix.as_ref());
        let mut objects = Vec::new();
        while let Some(result) = stream.next().await {
            let meta = result.context(ObjectStoreSnafu)?;
            objects.push(Self::to_object_info(meta, strip_parts));
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        if let Some(after) = start_after {
            objects.retain(|o| o.key.as_str() > after);
        }

        let truncated = objects.len() > max_keys;
        objects.truncate(max_keys);

        Ok(ListPage { objects, truncated })
    }

    /// List the common prefixes (directory names) directly under `prefix`,
    /// relative to the configured base prefix, sorted ascending.
    pub async fn list_dirs(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        let full_prefix = match prefix {
            Some(p) => self.full_prefix(p),
            None => self.config.key().cloned(),
        };
        let strip_parts = self.key_part_count();

        let result = self
            .object_store
            .list_with_delimiter(full_prefix.as_ref())
            .await
            .context(ObjectStoreSnafu)?;

        let mut dirs: Vec<String> = result
            .common_prefixes
            .into_iter()
            .map(|p| p.parts().skip(strip_parts).collect::<Path>().to_string())
            .collect();
        dirs.sort();

        Ok(dirs)
    }

    /// Combine the configured key prefix with a listing prefix.
    fn full_prefix(&self, prefix: &str) -> Option<Path> {
        let combined: Path = match self.config.key() {
            Some(key) => key.parts().chain(Path::from(prefix).parts()).collect(),
            None => Path::from(prefix),
        };
        if combined.as_ref().is_empty() {
            None
        } else {
            Some(combined)
        }
    }

    /// Qualify a base-prefix-relative key with the configured key prefix.
    fn qualify_key(&self, key: &str) -> Path {
        match self.config.key() {
            Some(prefix) => prefix.parts().chain(Path::from(key).parts()).collect(),
            None => Path::from(key),
        }
    }

    fn key_part_count(&self) -> usize {
        self.config
            .key()
            .map(|key| key.parts().count())
            .unwrap_or_default()
    }

    fn to_object_info(meta: ObjectMeta, strip_parts: usize) -> ObjectInfo {
        // Strip the configured prefix so callers see base-relative keys,
        // matching the keys they pass back as cursors.
        let relative: Path = meta.location.parts().skip(strip_parts).collect();
        ObjectInfo {
            key: relative.to_string(),
            size: meta.size,
            last_modified: meta.last_modified,
        }
    }
}

#[async_trait]
impl ObjectLister for StorageProvider {
    async fn list_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage, StorageError> {
        StorageProvider::list_page(self, prefix, start_after, max_keys).await
    }
}
