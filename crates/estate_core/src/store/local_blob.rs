//! Directory-backed blob store.
//!
//! # Invariants
//! - Every object lives at `{root}/{path}`; paths never escape `root`.
//! - Content type is derived from the file extension on read.

use super::blob::{folder_prefix, BlobListing, BlobStore, ObjectMetadata};
use super::{StoreError, StoreResult};
use crate::asset::content_type_for;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Blob store writing objects below one root directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            public_base_url: None,
        }
    }

    /// Serves URLs as `{base}/{path}` instead of `file://` URLs.
    pub fn with_public_base_url(mut self, base: impl Into<String>) -> Self {
        self.public_base_url = Some(base.into().trim_end_matches('/').to_string());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, path: &str) -> StoreResult<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)));
        if path.is_empty() || escapes {
            return Err(StoreError::Unavailable(format!(
                "path `{path}` is outside the blob root"
            )));
        }
        Ok(self.root.join(relative))
    }
}

fn not_found_as(path: &str) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |err| {
        if err.kind() == ErrorKind::NotFound {
            StoreError::NotFound(path.to_string())
        } else {
            StoreError::Io(err)
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn path_for_url(&self, url: &str) -> Option<String> {
        let rest = match self.public_base_url.as_ref() {
            Some(base) => url.strip_prefix(base.as_str())?.strip_prefix('/')?,
            None => {
                let root = format!("file://{}/", self.root.display());
                url.strip_prefix(root.as_str())?
            }
        };
        Some(rest.to_string())
    }

    async fn put(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> StoreResult<()> {
        let target = self.object_path(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, bytes).await?;
        Ok(())
    }

    async fn read(&self, path: &str) -> StoreResult<Vec<u8>> {
        let target = self.object_path(path)?;
        fs::read(&target).await.map_err(not_found_as(path))
    }

    async fn url(&self, path: &str) -> StoreResult<String> {
        let target = self.object_path(path)?;
        let meta = fs::metadata(&target).await.map_err(not_found_as(path))?;
        if !meta.is_file() {
            return Err(StoreError::NotFound(path.to_string()));
        }
        match self.public_base_url.as_ref() {
            Some(base) => Ok(format!("{base}/{path}")),
            None => Ok(format!("file://{}", target.display())),
        }
    }

    async fn list(&self, prefix: &str) -> StoreResult<BlobListing> {
        let folder = folder_prefix(prefix);
        let dir = if folder.is_empty() {
            self.root.clone()
        } else {
            self.object_path(folder.trim_end_matches('/'))?
        };

        let mut listing = BlobListing::default();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(listing),
            Err(err) => return Err(err.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                listing.prefixes.push(format!("{folder}{name}/"));
            } else if file_type.is_file() {
                listing.items.push(format!("{folder}{name}"));
            }
        }
        listing.items.sort();
        listing.prefixes.sort();
        Ok(listing)
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        let target = self.object_path(path)?;
        fs::remove_file(&target).await.map_err(not_found_as(path))
    }

    async fn metadata(&self, path: &str) -> StoreResult<ObjectMetadata> {
        let target = self.object_path(path)?;
        let meta = fs::metadata(&target).await.map_err(not_found_as(path))?;
        if !meta.is_file() {
            return Err(StoreError::NotFound(path.to_string()));
        }
        Ok(ObjectMetadata {
            size: meta.len(),
            content_type: content_type_for(path).to_string(),
        })
    }
}
