//! Asset repository over a path-addressed blob store.
//!
//! # Responsibility
//! - Upload, resolve, describe, list, rename and delete assets under
//!   canonical paths.
//! - Apply the configured collision policy before writing.
//! - Look up built-in default assets with soft-fail semantics.
//!
//! # Invariants
//! - Paths are always produced by `asset::resolve_path`.
//! - Image kinds accept only `image/*` content.
//! - Only `default_asset` swallows store errors; every other operation
//!   reports them.
//! - Listings gather paths once; per-item failures surface as per-item
//!   results and never abort the rest of the listing.

use crate::asset::{
    classify_file_name, content_type_for, disambiguated_file_name, file_name_of, parse_path,
    resolve_path, AssetClass, AssetKind, DefaultAsset, PathError,
};
use crate::model::now_epoch_ms;
use crate::store::blob::BlobStore;
use crate::store::StoreError;
use futures::stream::{self, Stream, StreamExt};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

const MAX_DISAMBIGUATION_ATTEMPTS: u32 = 16;

pub type AssetResult<T> = Result<T, AssetError>;

/// What to do when an upload's canonical path is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Replace the existing object.
    Overwrite,
    /// Prefix the file name with a timestamp (and attempt counter).
    #[default]
    Disambiguate,
    /// Fail with `AssetError::AlreadyExists`.
    Reject,
}

impl CollisionPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Some(Self::Overwrite),
            "disambiguate" => Some(Self::Disambiguate),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overwrite => "overwrite",
            Self::Disambiguate => "disambiguate",
            Self::Reject => "reject",
        }
    }
}

/// Asset error for naming, upload and lookup failures.
#[derive(Debug)]
pub enum AssetError {
    Path(PathError),
    NotFound(String),
    AlreadyExists(String),
    InvalidContentType {
        kind: &'static str,
        content_type: String,
    },
    /// The store failed while an upload checked, wrote or resolved its path.
    Upload {
        path: String,
        source: StoreError,
    },
    /// A sub-prefix of a listing could not be read.
    Listing {
        prefix: String,
        message: String,
    },
    Store(StoreError),
}

impl Display for AssetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(err) => write!(f, "{err}"),
            Self::NotFound(path) => write!(f, "asset not found: {path}"),
            Self::AlreadyExists(path) => write!(f, "asset already exists: {path}"),
            Self::InvalidContentType { kind, content_type } => {
                write!(f, "content type `{content_type}` is not accepted for `{kind}` assets")
            }
            Self::Upload { path, source } => write!(f, "upload to `{path}` failed: {source}"),
            Self::Listing { prefix, message } => {
                write!(f, "listing `{prefix}` failed: {message}")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AssetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Path(err) => Some(err),
            Self::Upload { source, .. } => Some(source),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl AssetError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    fn from_store(path: &str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::NotFound(path.to_string()),
            other => Self::Store(other),
        }
    }
}

impl From<PathError> for AssetError {
    fn from(value: PathError) -> Self {
        Self::Path(value)
    }
}

impl From<StoreError> for AssetError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Plain description of a stored asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    pub class: AssetClass,
    /// `None` for paths outside the canonical layout.
    pub kind: Option<AssetKind>,
    pub path: String,
    pub owner: Option<String>,
    pub file_name: String,
    pub size: u64,
    pub content_type: String,
    pub url: String,
}

/// Result of a default-asset lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultAssetLookup {
    Found(String),
    /// The asset is absent or unreachable; callers fall back to a built-in.
    UseDefault,
}

impl DefaultAssetLookup {
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Found(url) => Some(url),
            Self::UseDefault => None,
        }
    }
}

/// Asset operations over one blob store.
pub struct AssetRepository<B> {
    blobs: Arc<B>,
    policy: CollisionPolicy,
}

impl<B> Clone for AssetRepository<B> {
    fn clone(&self) -> Self {
        Self {
            blobs: Arc::clone(&self.blobs),
            policy: self.policy,
        }
    }
}

impl<B: BlobStore> AssetRepository<B> {
    pub fn new(blobs: Arc<B>, policy: CollisionPolicy) -> Self {
        Self { blobs, policy }
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    /// Uploads bytes under the canonical path of `(kind, owner, file_name)`.
    ///
    /// `content_type` defaults to the type implied by the file extension.
    pub async fn upload(
        &self,
        kind: &AssetKind,
        owner: Option<&str>,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> AssetResult<AssetDescriptor> {
        self.upload_with(self.policy, kind, owner, file_name, bytes, content_type)
            .await
    }

    /// Like [`AssetRepository::upload`] but always overwrites the canonical
    /// path, whatever the configured policy.
    pub async fn replace(
        &self,
        kind: &AssetKind,
        owner: Option<&str>,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> AssetResult<AssetDescriptor> {
        self.upload_with(
            CollisionPolicy::Overwrite,
            kind,
            owner,
            file_name,
            bytes,
            content_type,
        )
        .await
    }

    async fn upload_with(
        &self,
        policy: CollisionPolicy,
        kind: &AssetKind,
        owner: Option<&str>,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> AssetResult<AssetDescriptor> {
        let content_type = content_type.unwrap_or_else(|| content_type_for(file_name));
        if kind.requires_image_content() && !content_type.starts_with("image/") {
            return Err(AssetError::InvalidContentType {
                kind: kind.as_str(),
                content_type: content_type.to_string(),
            });
        }

        let path = self.free_path(policy, kind, owner, file_name).await?;
        let size = bytes.len() as u64;
        if let Err(source) = self.blobs.put(&path, bytes, content_type).await {
            return Err(upload_failed(kind, path, source));
        }
        let url = match self.blobs.url(&path).await {
            Ok(url) => url,
            Err(source) => return Err(upload_failed(kind, path, source)),
        };
        info!(
            "event=asset_upload module=asset status=ok kind={} path={path} size={size}",
            kind.as_str()
        );

        let parsed = parse_path(&path);
        Ok(AssetDescriptor {
            class: kind.class(),
            kind: Some(kind.clone()),
            owner: parsed.and_then(|parsed| parsed.owner),
            file_name: file_name_of(&path).to_string(),
            path,
            size,
            content_type: content_type.to_string(),
            url,
        })
    }

    /// Uploads a file whose kind is inferred from its name.
    pub async fn upload_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> AssetResult<AssetDescriptor> {
        let kind = classify_file_name(file_name).asset_kind();
        self.upload(&kind, None, file_name, bytes, content_type).await
    }

    /// Canonical path behind a URL served by this repository's store.
    pub fn path_for_url(&self, url: &str) -> Option<String> {
        self.blobs
            .path_for_url(url)
            .filter(|path| parse_path(path).is_some())
    }

    /// `AssetError::NotFound` when no object exists at `path`.
    pub async fn resolve_url(&self, path: &str) -> AssetResult<String> {
        self.blobs
            .url(path)
            .await
            .map_err(|err| AssetError::from_store(path, err))
    }

    /// Deletes one object. Deleting a missing path is `AssetError::NotFound`.
    pub async fn delete(&self, path: &str) -> AssetResult<()> {
        self.blobs
            .delete(path)
            .await
            .map_err(|err| AssetError::from_store(path, err))?;
        info!("event=asset_delete module=asset status=ok path={path}");
        Ok(())
    }

    pub async fn describe(&self, path: &str) -> AssetResult<AssetDescriptor> {
        let metadata = self
            .blobs
            .metadata(path)
            .await
            .map_err(|err| AssetError::from_store(path, err))?;
        let url = self.resolve_url(path).await?;
        let parsed = parse_path(path);
        let (kind, owner) = match parsed {
            Some(parsed) => (Some(parsed.kind), parsed.owner),
            None => (None, None),
        };
        Ok(AssetDescriptor {
            class: kind.as_ref().map_or(AssetClass::Other, AssetKind::class),
            kind,
            path: path.to_string(),
            owner,
            file_name: file_name_of(path).to_string(),
            size: metadata.size,
            content_type: metadata.content_type,
            url,
        })
    }

    /// Moves the object at `path` to a new file name in the same folder,
    /// keeping its content type.
    ///
    /// # Contract
    /// - `path` must be canonical and its kind must embed the file name.
    /// - An existing object at the target path is never replaced.
    /// - The copy is written before the source is removed; if removal
    ///   fails both objects remain and the error is returned.
    pub async fn rename(&self, path: &str, new_file_name: &str) -> AssetResult<AssetDescriptor> {
        let parsed = parse_path(path).ok_or_else(|| PathError::NonCanonical(path.to_string()))?;
        if !parsed.kind.embeds_file_name() {
            return Err(PathError::FixedFileName(parsed.kind.as_str()).into());
        }
        let target = resolve_path(&parsed.kind, parsed.owner.as_deref(), new_file_name)?;
        if target == path {
            return self.describe(path).await;
        }

        let metadata = self
            .blobs
            .metadata(path)
            .await
            .map_err(|err| AssetError::from_store(path, err))?;
        if self.is_taken(&parsed.kind, &target).await? {
            return Err(AssetError::AlreadyExists(target));
        }
        let bytes = self
            .blobs
            .read(path)
            .await
            .map_err(|err| AssetError::from_store(path, err))?;
        if let Err(source) = self.blobs.put(&target, bytes, &metadata.content_type).await {
            return Err(upload_failed(&parsed.kind, target, source));
        }
        self.blobs
            .delete(path)
            .await
            .map_err(|err| AssetError::from_store(path, err))?;
        info!("event=asset_rename module=asset status=ok from={path} to={target}");
        self.describe(&target).await
    }

    /// Lists `prefix` plus one level of sub-prefixes.
    ///
    /// Fails only when `prefix` itself cannot be listed.
    pub async fn list(&self, prefix: &str) -> AssetResult<AssetListing<B>> {
        let top = self.blobs.list(prefix).await?;
        let mut entries: Vec<ListingEntry> =
            top.items.into_iter().map(ListingEntry::Object).collect();
        for sub_prefix in top.prefixes {
            match self.blobs.list(&sub_prefix).await {
                Ok(sub) => entries.extend(sub.items.into_iter().map(ListingEntry::Object)),
                Err(err) => {
                    warn!(
                        "event=asset_list module=asset status=soft_fail prefix={sub_prefix} error={err}"
                    );
                    entries.push(ListingEntry::Unlisted {
                        prefix: sub_prefix,
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(AssetListing {
            repo: self.clone(),
            prefix: prefix.to_string(),
            entries,
        })
    }

    /// Resolves a default asset, answering `UseDefault` on any failure.
    pub async fn default_asset(&self, asset: DefaultAsset) -> DefaultAssetLookup {
        match self.blobs.url(asset.path()).await {
            Ok(url) => DefaultAssetLookup::Found(url),
            Err(err) => {
                warn!(
                    "event=default_asset module=asset status=soft_fail asset={} path={} error={err}",
                    asset.as_str(),
                    asset.path()
                );
                DefaultAssetLookup::UseDefault
            }
        }
    }

    async fn free_path(
        &self,
        policy: CollisionPolicy,
        kind: &AssetKind,
        owner: Option<&str>,
        file_name: &str,
    ) -> AssetResult<String> {
        let path = resolve_path(kind, owner, file_name)?;
        if !kind.embeds_file_name() || policy == CollisionPolicy::Overwrite {
            return Ok(path);
        }
        if !self.is_taken(kind, &path).await? {
            return Ok(path);
        }
        if policy == CollisionPolicy::Reject {
            return Err(AssetError::AlreadyExists(path));
        }

        let stamp = now_epoch_ms();
        for attempt in 0..MAX_DISAMBIGUATION_ATTEMPTS {
            let candidate = disambiguated_file_name(file_name, stamp, attempt);
            let candidate_path = resolve_path(kind, owner, &candidate)?;
            if !self.is_taken(kind, &candidate_path).await? {
                return Ok(candidate_path);
            }
        }
        Err(AssetError::AlreadyExists(path))
    }

    async fn is_taken(&self, kind: &AssetKind, path: &str) -> AssetResult<bool> {
        self.blobs
            .exists(path)
            .await
            .map_err(|source| upload_failed(kind, path.to_string(), source))
    }
}

fn upload_failed(kind: &AssetKind, path: String, source: StoreError) -> AssetError {
    warn!(
        "event=asset_upload module=asset status=error kind={} path={path} error={source}",
        kind.as_str()
    );
    AssetError::Upload { path, source }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ListingEntry {
    Object(String),
    Unlisted { prefix: String, message: String },
}

impl ListingEntry {
    fn sort_key(&self) -> (u8, &str, &str) {
        match self {
            Self::Object(path) => (0, file_name_of(path), path),
            Self::Unlisted { prefix, .. } => (1, "", prefix),
        }
    }
}

/// Paths gathered by [`AssetRepository::list`].
///
/// Nothing beyond the listing calls is fetched until the stream is polled.
/// Each call to [`AssetListing::stream`] starts over from the first entry.
pub struct AssetListing<B> {
    repo: AssetRepository<B>,
    prefix: String,
    entries: Vec<ListingEntry>,
}

impl<B: BlobStore> AssetListing<B> {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Object paths in listing order.
    pub fn paths(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            ListingEntry::Object(path) => Some(path.as_str()),
            ListingEntry::Unlisted { .. } => None,
        })
    }

    /// Sorts objects by file name (then full path); unreadable sub-prefixes
    /// go last.
    pub fn sort_by_file_name(mut self) -> Self {
        self.entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self
    }

    /// Lazily describes every entry.
    pub fn stream(&self) -> impl Stream<Item = AssetResult<AssetDescriptor>> + '_ {
        let repo = &self.repo;
        stream::iter(self.entries.iter()).then(move |entry| async move {
            match entry {
                ListingEntry::Object(path) => repo.describe(path).await,
                ListingEntry::Unlisted { prefix, message } => Err(AssetError::Listing {
                    prefix: prefix.clone(),
                    message: message.clone(),
                }),
            }
        })
    }

    /// Lazily resolves the URL of every entry.
    pub fn url_stream(&self) -> impl Stream<Item = AssetResult<String>> + '_ {
        let repo = &self.repo;
        stream::iter(self.entries.iter()).then(move |entry| async move {
            match entry {
                ListingEntry::Object(path) => repo.resolve_url(path).await,
                ListingEntry::Unlisted { prefix, message } => Err(AssetError::Listing {
                    prefix: prefix.clone(),
                    message: message.clone(),
                }),
            }
        })
    }

    pub async fn collect(&self) -> Vec<AssetResult<AssetDescriptor>> {
        self.stream().collect().await
    }
}
