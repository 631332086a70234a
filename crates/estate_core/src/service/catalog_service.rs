//! Catalog use-case facade.
//!
//! # Responsibility
//! - Answer cross-entity questions (floor -> apartments, apartment ->
//!   pictures and buyers, buyer -> apartments) without exposing storage
//!   layout to callers.
//! - Tie asset uploads to the documents that reference them.
//! - Remove stored files together with the documents that own them.
//!
//! # Invariants
//! - Repository and asset errors propagate unchanged, with three soft-fail
//!   exceptions: default-asset lookups, floor panorama listings and file
//!   cleanup after a document delete.
//! - Picture sequences are always returned in display order.
//! - Documents are deleted before their files; a failed document delete
//!   leaves every file in place.

use crate::asset::path::{
    is_image_file, validate_segment, APARTMENT_IMAGES_PREFIX, FLOORS_PREFIX,
};
use crate::asset::{parse_path, resolve_path, AssetKind, DefaultAsset, PathError};
use crate::model::apartment::{Apartment, ApartmentRef};
use crate::model::buyer::Buyer;
use crate::model::floor::{Floor, FloorPatch};
use crate::model::hotspot::Hotspot;
use crate::model::picture::{sort_for_display, NewPicture, Picture, PictureType};
use crate::repo::{
    ApartmentFilter, AssetDescriptor, AssetError, AssetRepository, BuyerFilter, CatalogRepository,
    DefaultAssetLookup, NumericRange, PictureFilter, RepoError,
};
use crate::store::blob::BlobStore;
use crate::store::document::DocumentStore;
use futures::StreamExt;
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CatalogServiceResult<T> = Result<T, CatalogServiceError>;

/// Facade error; wraps the layer that failed without reinterpreting it.
#[derive(Debug)]
pub enum CatalogServiceError {
    Repo(RepoError),
    Asset(AssetError),
}

impl CatalogServiceError {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Repo(err) => err.is_not_found(),
            Self::Asset(err) => err.is_not_found(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Repo(err) if err.is_conflict())
    }
}

impl Display for CatalogServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Asset(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CatalogServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Asset(err) => Some(err),
        }
    }
}

impl From<RepoError> for CatalogServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<AssetError> for CatalogServiceError {
    fn from(value: AssetError) -> Self {
        Self::Asset(value)
    }
}

/// Floor together with the apartment count measured right now.
#[derive(Debug, Clone, PartialEq)]
pub struct FloorOverview {
    pub floor: Floor,
    pub live_apartment_count: u64,
}

impl FloorOverview {
    /// Whether the stored `apartmentCount` disagrees with live data.
    pub fn count_drifted(&self) -> bool {
        u64::from(self.floor.apartment_count) != self.live_apartment_count
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApartmentWithPictures {
    pub apartment: Apartment,
    /// Picture URLs in display order.
    pub picture_urls: Vec<String>,
}

/// One panorama image of a floor and the viewing angle it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct PanoramaView {
    pub index: usize,
    pub url: String,
    pub angle: f64,
}

/// Hotspot with the apartment it points at.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedHotspot {
    pub hotspot: Hotspot,
    pub apartment: ApartmentRef,
}

/// Resolved hotspots of one floor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloorHotspots {
    pub top_view: Vec<PlacedHotspot>,
    pub angles: BTreeMap<String, Vec<PlacedHotspot>>,
}

/// Composes the catalog and asset repositories.
pub struct CatalogService<D, B> {
    catalog: CatalogRepository<D>,
    assets: AssetRepository<B>,
}

impl<D: DocumentStore, B: BlobStore> CatalogService<D, B> {
    pub fn new(catalog: CatalogRepository<D>, assets: AssetRepository<B>) -> Self {
        Self { catalog, assets }
    }

    pub fn catalog(&self) -> &CatalogRepository<D> {
        &self.catalog
    }

    pub fn assets(&self) -> &AssetRepository<B> {
        &self.assets
    }

    pub async fn apartments_on_floor(&self, floor_id: &str) -> CatalogServiceResult<Vec<Apartment>> {
        Ok(self
            .catalog
            .list_apartments(&ApartmentFilter::on_floor(floor_id))
            .await?)
    }

    pub async fn buyers_interested_in(&self, apartment_id: &str) -> CatalogServiceResult<Vec<Buyer>> {
        Ok(self
            .catalog
            .list_buyers(&BuyerFilter::interested_in(apartment_id))
            .await?)
    }

    /// Pictures of an apartment by `order`, then creation time, then
    /// insertion order.
    pub async fn pictures_for_apartment(
        &self,
        apartment_id: &str,
    ) -> CatalogServiceResult<Vec<Picture>> {
        let mut pictures = self
            .catalog
            .list_pictures(&PictureFilter::for_apartment(apartment_id))
            .await?;
        sort_for_display(&mut pictures);
        Ok(pictures)
    }

    /// First `MAIN` picture in display order.
    pub async fn main_picture(&self, apartment_id: &str) -> CatalogServiceResult<Option<Picture>> {
        let pictures = self.pictures_for_apartment(apartment_id).await?;
        Ok(pictures
            .into_iter()
            .find(|picture| picture.kind == PictureType::Main))
    }

    pub async fn apartments_with_pictures(
        &self,
        floor_id: &str,
    ) -> CatalogServiceResult<Vec<ApartmentWithPictures>> {
        let apartments = self.apartments_on_floor(floor_id).await?;
        let mut rows = Vec::with_capacity(apartments.len());
        for apartment in apartments {
            let picture_urls = self
                .pictures_for_apartment(&apartment.id)
                .await?
                .into_iter()
                .map(|picture| picture.url)
                .collect();
            rows.push(ApartmentWithPictures {
                apartment,
                picture_urls,
            });
        }
        Ok(rows)
    }

    /// Floor plus its live apartment count, so counter drift is visible.
    pub async fn floor_overview(&self, floor_id: &str) -> CatalogServiceResult<FloorOverview> {
        let floor = self.catalog.get_floor(floor_id).await?;
        let live_apartment_count = self.catalog.live_apartment_count(floor_id).await?;
        let overview = FloorOverview {
            floor,
            live_apartment_count,
        };
        if overview.count_drifted() {
            warn!(
                "event=floor_overview module=service status=soft_fail floor_id={floor_id} stored={} live={live_apartment_count}",
                overview.floor.apartment_count
            );
        }
        Ok(overview)
    }

    /// Resolves every interested-apartment id of a buyer. Dangling ids
    /// become `ApartmentRef::Unknown`.
    pub async fn resolve_interested_apartments(
        &self,
        buyer_id: &str,
    ) -> CatalogServiceResult<Vec<ApartmentRef>> {
        let buyer = self.catalog.get_buyer(buyer_id).await?;
        let mut refs = Vec::with_capacity(buyer.interested_apartment_ids.len());
        for apartment_id in buyer.interested_apartment_ids {
            refs.push(self.resolve_apartment(apartment_id).await?);
        }
        Ok(refs)
    }

    /// Floor hotspots with their apartments resolved. Dangling ids become
    /// `ApartmentRef::Unknown`.
    pub async fn floor_hotspots(&self, floor_id: &str) -> CatalogServiceResult<FloorHotspots> {
        let floor = self.catalog.get_floor(floor_id).await?;
        let mut resolved: HashMap<String, ApartmentRef> = HashMap::new();
        let mut placed = FloorHotspots::default();
        for hotspot in floor.top_view_hotspots {
            placed.top_view.push(self.place(hotspot, &mut resolved).await?);
        }
        for (angle, hotspots) in floor.angle_hotspots {
            let mut row = Vec::with_capacity(hotspots.len());
            for hotspot in hotspots {
                row.push(self.place(hotspot, &mut resolved).await?);
            }
            placed.angles.insert(angle, row);
        }
        Ok(placed)
    }

    async fn place(
        &self,
        hotspot: Hotspot,
        resolved: &mut HashMap<String, ApartmentRef>,
    ) -> CatalogServiceResult<PlacedHotspot> {
        let apartment = match resolved.get(&hotspot.apartment_id) {
            Some(apartment) => apartment.clone(),
            None => {
                let apartment = self.resolve_apartment(hotspot.apartment_id.clone()).await?;
                resolved.insert(hotspot.apartment_id.clone(), apartment.clone());
                apartment
            }
        };
        Ok(PlacedHotspot { hotspot, apartment })
    }

    async fn resolve_apartment(&self, apartment_id: String) -> CatalogServiceResult<ApartmentRef> {
        Ok(match self.catalog.find_apartment(&apartment_id).await? {
            Some(apartment) => ApartmentRef::Known(apartment),
            None => ApartmentRef::Unknown(apartment_id),
        })
    }

    /// Apartments inside both ranges.
    ///
    /// The store evaluates one range; `price` is queried natively when set
    /// and `area` is refined on the returned rows.
    pub async fn apartments_in_ranges(
        &self,
        price: NumericRange,
        area: NumericRange,
    ) -> CatalogServiceResult<Vec<Apartment>> {
        let (native, refined) = if price.is_open() {
            (
                ApartmentFilter {
                    area: Some(area),
                    ..ApartmentFilter::default()
                },
                None,
            )
        } else {
            (
                ApartmentFilter {
                    price: Some(price),
                    ..ApartmentFilter::default()
                },
                Some(area),
            )
        };
        let apartments = self.catalog.list_apartments(&native).await?;
        Ok(match refined {
            Some(area) => apartments
                .into_iter()
                .filter(|apartment| area.contains(apartment.area))
                .collect(),
            None => apartments,
        })
    }

    /// Panorama image URLs of a floor sorted by file name.
    ///
    /// # Contract
    /// - Never fails: an unreadable folder yields an empty list and
    ///   unreadable items are skipped, both logged as `soft_fail`.
    pub async fn floor_panorama_urls(&self, floor_id: &str) -> Vec<String> {
        if let Err(err) = validate_segment(floor_id) {
            warn!(
                "event=floor_panorama module=service status=soft_fail floor_id={floor_id} error={err}"
            );
            return Vec::new();
        }
        let prefix = format!("{FLOORS_PREFIX}/{floor_id}");
        let listing = match self.assets.list(&prefix).await {
            Ok(listing) => listing.sort_by_file_name(),
            Err(err) => {
                warn!(
                    "event=floor_panorama module=service status=soft_fail floor_id={floor_id} error={err}"
                );
                return Vec::new();
            }
        };

        let results: Vec<_> = listing.url_stream().collect().await;
        let mut urls = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(url) => urls.push(url),
                Err(err) => warn!(
                    "event=floor_panorama module=service status=soft_fail floor_id={floor_id} error={err}"
                ),
            }
        }
        urls
    }

    /// Panorama URLs with the angle each covers: `index * 360 / n`.
    pub async fn floor_panorama_views(&self, floor_id: &str) -> Vec<PanoramaView> {
        let urls = self.floor_panorama_urls(floor_id).await;
        let total = urls.len();
        urls.into_iter()
            .enumerate()
            .map(|(index, url)| PanoramaView {
                index,
                url,
                angle: index as f64 * 360.0 / total as f64,
            })
            .collect()
    }

    /// Uploads a floor model to `floors/{id}.glb` and links it on the floor.
    pub async fn upload_floor_model(
        &self,
        floor_id: &str,
        bytes: Vec<u8>,
    ) -> CatalogServiceResult<AssetDescriptor> {
        self.catalog.get_floor(floor_id).await?;
        let descriptor = self
            .assets
            .replace(
                &AssetKind::FloorModel,
                Some(floor_id),
                &format!("{floor_id}.glb"),
                bytes,
                None,
            )
            .await?;
        let patch = FloorPatch {
            model_ref: Some(descriptor.url.clone()),
            ..FloorPatch::default()
        };
        self.catalog.update_floor(floor_id, patch).await?;
        Ok(descriptor)
    }

    /// Stores panorama image `index` of a floor as
    /// `floor-{floor id}-angle-{index}.jpg`, replacing a previous upload.
    pub async fn upload_floor_panorama(
        &self,
        floor_id: &str,
        index: usize,
        bytes: Vec<u8>,
    ) -> CatalogServiceResult<AssetDescriptor> {
        self.catalog.get_floor(floor_id).await?;
        let file_name = format!("floor-{floor_id}-angle-{index}.jpg");
        Ok(self
            .assets
            .replace(
                &AssetKind::FloorPanorama,
                Some(floor_id),
                &file_name,
                bytes,
                Some("image/jpeg"),
            )
            .await?)
    }

    /// Renames one panorama image of a floor, keeping its bytes and
    /// content type.
    ///
    /// # Contract
    /// - The new name must keep an image extension.
    /// - An existing image under the new name is never replaced.
    pub async fn rename_floor_panorama(
        &self,
        floor_id: &str,
        file_name: &str,
        new_file_name: &str,
    ) -> CatalogServiceResult<AssetDescriptor> {
        self.catalog.get_floor(floor_id).await?;
        if !is_image_file(new_file_name) {
            return Err(AssetError::Path(PathError::UnsupportedExtension {
                kind: AssetKind::FloorPanorama.as_str(),
                file_name: new_file_name.to_string(),
            })
            .into());
        }
        let path = resolve_path(&AssetKind::FloorPanorama, Some(floor_id), file_name)
            .map_err(AssetError::Path)?;
        Ok(self.assets.rename(&path, new_file_name).await?)
    }

    /// Uploads an apartment image and registers it as the last picture.
    ///
    /// # Contract
    /// - The apartment must exist before anything is uploaded.
    /// - When the picture document cannot be created, the uploaded object
    ///   is removed again (best effort).
    pub async fn add_apartment_picture(
        &self,
        apartment_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
        kind: PictureType,
    ) -> CatalogServiceResult<Picture> {
        self.catalog.get_apartment(apartment_id).await?;
        let descriptor = self
            .assets
            .upload(
                &AssetKind::ApartmentImage,
                Some(apartment_id),
                file_name,
                bytes,
                content_type,
            )
            .await?;

        let order = self.catalog.next_picture_order(apartment_id).await?;
        let input = NewPicture::new(apartment_id, descriptor.url.clone(), kind, order);
        let id = match self.catalog.create_picture(input).await {
            Ok(id) => id,
            Err(err) => {
                if let Err(cleanup) = self.assets.delete(&descriptor.path).await {
                    warn!(
                        "event=picture_add module=service status=soft_fail path={} error={cleanup}",
                        descriptor.path
                    );
                }
                return Err(err.into());
            }
        };
        info!(
            "event=picture_add module=service status=ok apartment_id={apartment_id} picture_id={id} order={order}"
        );
        Ok(self.catalog.get_picture(&id).await?)
    }

    /// Deletes a picture document, then its stored image when the URL maps
    /// to a canonical path. Blob removal failures are logged only.
    pub async fn remove_picture(&self, picture_id: &str) -> CatalogServiceResult<()> {
        let picture = self.catalog.get_picture(picture_id).await?;
        self.catalog.delete_picture(picture_id).await?;
        if let Some(path) = self.assets.path_for_url(&picture.url) {
            if let Err(err) = self.assets.delete(&path).await {
                warn!(
                    "event=picture_remove module=service status=soft_fail picture_id={picture_id} path={path} error={err}"
                );
            }
        }
        Ok(())
    }

    /// Deletes an apartment with its pictures, then the files they used.
    ///
    /// # Contract
    /// - File removal covers picture images, the apartment's 3D model and
    ///   anything left under `apartment-images/{id}/`.
    /// - File removal failures are logged as `soft_fail` only.
    pub async fn delete_apartment(&self, apartment_id: &str) -> CatalogServiceResult<()> {
        let apartment = self.catalog.get_apartment(apartment_id).await?;
        let pictures = self
            .catalog
            .list_pictures(&PictureFilter::for_apartment(apartment_id))
            .await?;
        self.catalog.delete_apartment(apartment_id).await?;

        let mut paths = BTreeSet::new();
        for picture in &pictures {
            paths.extend(self.stored_path(&picture.url));
        }
        if let Some(model) = apartment.model_ref.as_deref() {
            paths.extend(self.stored_path(model));
        }
        self.gather_folder(
            "apartment_delete",
            &format!("{APARTMENT_IMAGES_PREFIX}/{apartment_id}"),
            &mut paths,
        )
        .await;
        self.remove_files("apartment_delete", apartment_id, paths).await;
        Ok(())
    }

    /// Deletes an empty floor, then its model and panorama images.
    ///
    /// # Contract
    /// - Fails with a conflict while apartments reference the floor; no
    ///   file is touched in that case.
    /// - File removal failures are logged as `soft_fail` only.
    pub async fn delete_floor(&self, floor_id: &str) -> CatalogServiceResult<()> {
        let floor = self.catalog.get_floor(floor_id).await?;
        self.catalog.delete_floor(floor_id).await?;

        let mut paths = BTreeSet::new();
        if let Some(model) = floor.model_ref.as_deref() {
            paths.extend(self.stored_path(model));
        }
        paths.insert(format!("{FLOORS_PREFIX}/{floor_id}.glb"));
        self.gather_folder(
            "floor_delete",
            &format!("{FLOORS_PREFIX}/{floor_id}"),
            &mut paths,
        )
        .await;
        self.remove_files("floor_delete", floor_id, paths).await;
        Ok(())
    }

    /// Canonical path behind a stored reference, which is either a URL of
    /// this store or a canonical path.
    fn stored_path(&self, reference: &str) -> Option<String> {
        self.assets
            .path_for_url(reference)
            .or_else(|| parse_path(reference).map(|_| reference.to_string()))
    }

    async fn gather_folder(&self, event: &str, prefix: &str, paths: &mut BTreeSet<String>) {
        match self.assets.list(prefix).await {
            Ok(listing) => paths.extend(listing.paths().map(str::to_string)),
            Err(err) => warn!(
                "event={event} module=service status=soft_fail prefix={prefix} error={err}"
            ),
        }
    }

    async fn remove_files(&self, event: &str, owner_id: &str, paths: BTreeSet<String>) {
        for path in paths {
            match self.assets.delete(&path).await {
                Ok(()) => {}
                Err(err) if err.is_not_found() => {
                    debug!("event={event} module=service status=ok owner_id={owner_id} path={path} skipped=missing");
                }
                Err(err) => warn!(
                    "event={event} module=service status=soft_fail owner_id={owner_id} path={path} error={err}"
                ),
            }
        }
    }

    pub async fn default_environment(&self) -> DefaultAssetLookup {
        self.assets.default_asset(DefaultAsset::SkyEnvironment).await
    }

    pub async fn default_floor_texture(&self) -> DefaultAssetLookup {
        self.assets.default_asset(DefaultAsset::FloorTexture).await
    }
}
