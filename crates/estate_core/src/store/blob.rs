//! Path-addressed blob store contract.
//!
//! Paths are `/`-separated strings without a leading slash. A "folder" is
//! only a shared prefix; `list` reports direct children as items and the next
//! path segment of deeper objects as sub-prefixes.

use super::StoreResult;
use async_trait::async_trait;

/// Size and type of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub size: u64,
    pub content_type: String,
}

/// One level of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobListing {
    /// Full paths of objects directly under the prefix.
    pub items: Vec<String>,
    /// Full sub-prefixes (ending in `/`) one level below the prefix.
    pub prefixes: Vec<String>,
}

/// Byte store addressed by canonical asset paths.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes (or overwrites) the object at `path`.
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> StoreResult<()>;

    /// Bytes of the object. `StoreError::NotFound` when absent.
    async fn read(&self, path: &str) -> StoreResult<Vec<u8>>;

    /// Retrievable URL of the object. `StoreError::NotFound` when absent.
    async fn url(&self, path: &str) -> StoreResult<String>;

    async fn list(&self, prefix: &str) -> StoreResult<BlobListing>;

    /// Removes the object. `StoreError::NotFound` when absent.
    async fn delete(&self, path: &str) -> StoreResult<()>;

    /// `StoreError::NotFound` when absent.
    async fn metadata(&self, path: &str) -> StoreResult<ObjectMetadata>;

    /// Maps a URL produced by `url` back to its path, when recognizable.
    fn path_for_url(&self, _url: &str) -> Option<String> {
        None
    }

    async fn exists(&self, path: &str) -> StoreResult<bool> {
        match self.metadata(path).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Normalizes a listing prefix to either empty or `.../`.
pub(crate) fn folder_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

/// Splits `paths` into direct items and first-level sub-prefixes of `prefix`.
pub(crate) fn split_listing<'a>(prefix: &str, paths: impl Iterator<Item = &'a str>) -> BlobListing {
    let folder = folder_prefix(prefix);
    let mut listing = BlobListing::default();
    for path in paths {
        let Some(rest) = path.strip_prefix(folder.as_str()) else {
            continue;
        };
        match rest.split_once('/') {
            None if !rest.is_empty() => listing.items.push(path.to_string()),
            Some((segment, _)) if !segment.is_empty() => {
                let sub = format!("{folder}{segment}/");
                if !listing.prefixes.contains(&sub) {
                    listing.prefixes.push(sub);
                }
            }
            _ => {}
        }
    }
    listing.items.sort();
    listing.prefixes.sort();
    listing
}
