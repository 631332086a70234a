//! Picture operations of the catalog repository.
//!
//! # Invariants
//! - `apartmentId` resolves to a stored apartment on create.
//! - A second `MAIN` picture for one apartment is accepted but logged.
//! - `reorder_pictures` checks every id before writing any order.

use super::catalog::CatalogRepository;
use super::error::{RepoError, RepoResult};
use crate::model::picture::{
    self, NewPicture, Picture, PictureId, PicturePatch, PictureType, FIELD_APARTMENT_ID,
    FIELD_TYPE,
};
use crate::model::{new_document_id, now_epoch_ms, ValidationError};
use crate::store::document::{Direction, DocumentStore, Query};
use log::{info, warn};

const FIELD_ORDER: &str = "order";

/// Filter for listing pictures. Results come back in insertion order.
#[derive(Debug, Clone, Default)]
pub struct PictureFilter {
    pub apartment_id: Option<String>,
    pub kind: Option<PictureType>,
    pub limit: Option<u32>,
}

impl PictureFilter {
    pub fn for_apartment(apartment_id: impl Into<String>) -> Self {
        Self {
            apartment_id: Some(apartment_id.into()),
            ..Self::default()
        }
    }

    fn to_query(&self) -> Query {
        let mut query = Query::new();
        if let Some(apartment_id) = self.apartment_id.as_deref() {
            query = query.eq(FIELD_APARTMENT_ID, apartment_id);
        }
        if let Some(kind) = self.kind {
            query = query.eq(FIELD_TYPE, kind.as_str());
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        query
    }
}

impl<S: DocumentStore> CatalogRepository<S> {
    pub async fn create_picture(&self, input: NewPicture) -> RepoResult<PictureId> {
        input.validate()?;
        if self.find_apartment(&input.apartment_id).await?.is_none() {
            return Err(ValidationError::DanglingReference {
                field: "apartmentId",
                id: input.apartment_id,
            }
            .into());
        }
        if input.kind == PictureType::Main {
            self.warn_on_extra_main(&input.apartment_id, None).await?;
        }

        let id = new_document_id();
        let picture = input.into_picture(id.clone(), now_epoch_ms());
        self.insert(picture::COLLECTION, &id, &picture).await?;
        Ok(id)
    }

    pub async fn update_picture(&self, id: &str, patch: PicturePatch) -> RepoResult<()> {
        patch.validate()?;
        if patch.kind == Some(PictureType::Main) {
            let current = self.get_picture(id).await?;
            self.warn_on_extra_main(&current.apartment_id, Some(id))
                .await?;
        }
        self.merge(picture::COLLECTION, id, &patch, None).await
    }

    pub async fn delete_picture(&self, id: &str) -> RepoResult<()> {
        self.remove(picture::COLLECTION, id).await
    }

    pub async fn get_picture(&self, id: &str) -> RepoResult<Picture> {
        self.fetch_required(picture::COLLECTION, id).await
    }

    pub async fn find_picture(&self, id: &str) -> RepoResult<Option<Picture>> {
        self.fetch(picture::COLLECTION, id).await
    }

    pub async fn list_pictures(&self, filter: &PictureFilter) -> RepoResult<Vec<Picture>> {
        self.select(picture::COLLECTION, &filter.to_query()).await
    }

    /// Order value placing a new picture after all existing ones.
    pub async fn next_picture_order(&self, apartment_id: &str) -> RepoResult<i64> {
        let query = Query::new()
            .eq(FIELD_APARTMENT_ID, apartment_id)
            .order_by(FIELD_ORDER, Direction::Desc)
            .limit(1);
        let last: Vec<Picture> = self.select(picture::COLLECTION, &query).await?;
        Ok(last.first().map_or(0, |picture| picture.order + 1))
    }

    /// Rewrites `order` to `0..n` following `ordered_ids`.
    ///
    /// Every id must belong to `apartment_id`. Pictures not listed keep
    /// their current order.
    pub async fn reorder_pictures(
        &self,
        apartment_id: &str,
        ordered_ids: &[PictureId],
    ) -> RepoResult<()> {
        for id in ordered_ids {
            let current = self.get_picture(id).await?;
            if current.apartment_id != apartment_id {
                return Err(ValidationError::InvalidValue {
                    field: "pictureIds",
                    reason: format!("picture `{id}` belongs to another apartment"),
                }
                .into());
            }
        }
        for (index, id) in ordered_ids.iter().enumerate() {
            let patch = PicturePatch {
                order: Some(index as i64),
                ..PicturePatch::default()
            };
            self.merge(picture::COLLECTION, id, &patch, None).await?;
        }
        info!(
            "event=picture_reorder module=repo status=ok apartment_id={apartment_id} count={}",
            ordered_ids.len()
        );
        Ok(())
    }

    /// Deletes every picture of an apartment. Returns how many were removed.
    pub async fn delete_pictures_for_apartment(&self, apartment_id: &str) -> RepoResult<usize> {
        let pictures = self
            .list_pictures(&PictureFilter::for_apartment(apartment_id))
            .await?;
        for picture in &pictures {
            match self.remove(picture::COLLECTION, &picture.id).await {
                Ok(()) | Err(RepoError::NotFound { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(pictures.len())
    }

    async fn warn_on_extra_main(&self, apartment_id: &str, except: Option<&str>) -> RepoResult<()> {
        let filter = PictureFilter {
            apartment_id: Some(apartment_id.to_string()),
            kind: Some(PictureType::Main),
            limit: Some(2),
        };
        let mains = self.list_pictures(&filter).await?;
        if mains
            .iter()
            .any(|picture| Some(picture.id.as_str()) != except)
        {
            warn!(
                "event=picture_main module=repo status=soft_fail apartment_id={apartment_id} reason=main_already_present"
            );
        }
        Ok(())
    }
}
