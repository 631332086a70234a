//! In-memory blob store used as a test double and for ephemeral runs.

use super::blob::{split_listing, BlobListing, BlobStore, ObjectMetadata};
use super::{StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

const DEFAULT_BASE_URL: &str = "memory://assets";

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    objects: BTreeMap<String, StoredObject>,
    failing_paths: BTreeSet<String>,
    failing_prefixes: BTreeSet<String>,
}

/// Blob store keeping objects in a sorted map.
///
/// URLs have the shape `{base_url}/{path}` and can be read back with
/// [`MemoryBlobStore::read_url`].
#[derive(Debug)]
pub struct MemoryBlobStore {
    base_url: String,
    state: Mutex<MemoryState>,
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl MemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Returns the bytes behind a URL produced by this store.
    pub fn read_url(&self, url: &str) -> StoreResult<Vec<u8>> {
        let path = self
            .path_for_url(url)
            .ok_or_else(|| StoreError::NotFound(url.to_string()))?;
        let state = self.lock()?;
        state
            .objects
            .get(&path)
            .map(|object| object.bytes.clone())
            .ok_or_else(|| StoreError::NotFound(path))
    }

    /// Makes every call addressing `path` fail with `Unavailable`.
    pub fn fail_path(&self, path: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_paths.insert(path.to_string());
        }
    }

    /// Makes listings under `prefix` fail with `Unavailable`.
    pub fn fail_listing(&self, prefix: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_prefixes.insert(prefix.trim_matches('/').to_string());
        }
    }

    pub fn object_count(&self) -> usize {
        self.state.lock().map(|state| state.objects.len()).unwrap_or(0)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory blob store lock poisoned".to_string()))
    }

    fn checked(&self, path: &str) -> StoreResult<MutexGuard<'_, MemoryState>> {
        let state = self.lock()?;
        if state.failing_paths.contains(path) {
            return Err(StoreError::Unavailable(format!("injected failure for `{path}`")));
        }
        Ok(state)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn path_for_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(self.base_url.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .map(str::to_string)
    }

    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> StoreResult<()> {
        let mut state = self.checked(path)?;
        state.objects.insert(
            path.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn read(&self, path: &str) -> StoreResult<Vec<u8>> {
        let state = self.checked(path)?;
        state
            .objects
            .get(path)
            .map(|object| object.bytes.clone())
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    async fn url(&self, path: &str) -> StoreResult<String> {
        let state = self.checked(path)?;
        if !state.objects.contains_key(path) {
            return Err(StoreError::NotFound(path.to_string()));
        }
        Ok(format!("{}/{path}", self.base_url))
    }

    async fn list(&self, prefix: &str) -> StoreResult<BlobListing> {
        let state = self.lock()?;
        if state.failing_prefixes.contains(prefix.trim_matches('/')) {
            return Err(StoreError::Unavailable(format!(
                "injected listing failure for `{prefix}`"
            )));
        }
        Ok(split_listing(prefix, state.objects.keys().map(String::as_str)))
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        let mut state = self.checked(path)?;
        match state.objects.remove(path) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(path.to_string())),
        }
    }

    async fn metadata(&self, path: &str) -> StoreResult<ObjectMetadata> {
        let state = self.checked(path)?;
        state
            .objects
            .get(path)
            .map(|object| ObjectMetadata {
                size: object.bytes.len() as u64,
                content_type: object.content_type.clone(),
            })
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryBlobStore;
    use crate::store::blob::BlobStore;

    #[tokio::test]
    async fn put_url_and_read_back() {
        let store = MemoryBlobStore::new("https://cdn.test/");
        store
            .put("images/a.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap();

        let url = store.url("images/a.jpg").await.unwrap();
        assert_eq!(url, "https://cdn.test/images/a.jpg");
        assert_eq!(store.read_url(&url).unwrap(), vec![1, 2, 3]);
        assert_eq!(store.metadata("images/a.jpg").await.unwrap().size, 3);
    }

    #[tokio::test]
    async fn delete_of_missing_object_is_not_found() {
        let store = MemoryBlobStore::default();
        let err = store.delete("images/none.jpg").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn injected_failure_only_hits_that_path() {
        let store = MemoryBlobStore::default();
        store.put("a/1.jpg", vec![1], "image/jpeg").await.unwrap();
        store.put("a/2.jpg", vec![2], "image/jpeg").await.unwrap();
        store.fail_path("a/1.jpg");

        assert!(store.url("a/1.jpg").await.is_err());
        assert!(store.url("a/2.jpg").await.is_ok());
    }
}
