//! Apartment operations of the catalog repository.
//!
//! # Invariants
//! - `floorId` resolves to a stored floor on create and on floor moves.
//! - Lot numbers are unique within one floor.
//! - Every create, delete or floor move recounts the affected floors.
//! - Deleting an apartment deletes its pictures first; a failure there
//!   leaves the apartment in place.

use super::catalog::{CatalogRepository, NumericRange};
use super::error::{RepoError, RepoResult};
use crate::model::apartment::{
    self, Apartment, ApartmentId, ApartmentPatch, ApartmentStatus, NewApartment, FIELD_AREA,
    FIELD_FLOOR_ID, FIELD_LOT_NUMBER, FIELD_PRICE, FIELD_STATUS, FIELD_TYPE,
};
use crate::model::{new_document_id, now_epoch_ms, ValidationError};
use crate::store::document::{Direction, DocumentStore, Query};
use log::info;

/// Filter for listing apartments.
///
/// `price` and `area` cannot both be set: the store evaluates range
/// predicates on one field only. Query one range and refine the other on
/// the returned rows instead.
#[derive(Debug, Clone, Default)]
pub struct ApartmentFilter {
    pub floor_id: Option<String>,
    pub status: Option<ApartmentStatus>,
    pub kind: Option<String>,
    pub price: Option<NumericRange>,
    pub area: Option<NumericRange>,
    pub limit: Option<u32>,
}

impl ApartmentFilter {
    pub fn on_floor(floor_id: impl Into<String>) -> Self {
        Self {
            floor_id: Some(floor_id.into()),
            ..Self::default()
        }
    }

    fn to_query(&self) -> RepoResult<Query> {
        let price = self.price.filter(|range| !range.is_open());
        let area = self.area.filter(|range| !range.is_open());
        if price.is_some() && area.is_some() {
            return Err(RepoError::UnsupportedQuery(
                "price and area ranges cannot be combined; filter one of them client-side"
                    .to_string(),
            ));
        }

        let mut query = Query::new();
        if let Some(floor_id) = self.floor_id.as_deref() {
            query = query.eq(FIELD_FLOOR_ID, floor_id);
        }
        if let Some(status) = self.status {
            query = query.eq(FIELD_STATUS, status.as_str());
        }
        if let Some(kind) = self.kind.as_deref() {
            query = query.eq(FIELD_TYPE, kind);
        }
        if let Some(price) = price {
            query = price.apply(query, FIELD_PRICE).order_by(FIELD_PRICE, Direction::Asc);
        }
        if let Some(area) = area {
            query = area.apply(query, FIELD_AREA).order_by(FIELD_AREA, Direction::Asc);
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        Ok(query)
    }
}

impl<S: DocumentStore> CatalogRepository<S> {
    pub async fn create_apartment(&self, input: NewApartment) -> RepoResult<ApartmentId> {
        input.validate()?;
        self.ensure_floor_exists(&input.floor_id).await?;
        self.ensure_lot_free(&input.floor_id, &input.lot_number, None)
            .await?;

        let id = new_document_id();
        let apartment = input.into_apartment(id.clone(), now_epoch_ms());
        self.insert(apartment::COLLECTION, &id, &apartment).await?;
        self.recount_apartments(&apartment.floor_id).await?;
        info!(
            "event=apartment_create module=repo status=ok apartment_id={id} floor_id={}",
            apartment.floor_id
        );
        Ok(id)
    }

    pub async fn update_apartment(&self, id: &str, patch: ApartmentPatch) -> RepoResult<()> {
        patch.validate()?;
        let current = self.get_apartment(id).await?;

        let target_floor = patch.floor_id.as_deref().unwrap_or(&current.floor_id);
        let moved = target_floor != current.floor_id;
        if moved {
            self.ensure_floor_exists(target_floor).await?;
        }
        let target_lot = patch.lot_number.as_deref().unwrap_or(&current.lot_number);
        if moved || target_lot != current.lot_number {
            self.ensure_lot_free(target_floor, target_lot, Some(id))
                .await?;
        }

        self.merge(apartment::COLLECTION, id, &patch, Some(now_epoch_ms()))
            .await?;
        if moved {
            self.recount_apartments(&current.floor_id).await?;
            self.recount_apartments(target_floor).await?;
        }
        Ok(())
    }

    /// Deletes an apartment together with its pictures.
    pub async fn delete_apartment(&self, id: &str) -> RepoResult<()> {
        let current = self.get_apartment(id).await?;
        let pictures = self.delete_pictures_for_apartment(id).await?;
        self.remove(apartment::COLLECTION, id).await?;
        self.recount_apartments(&current.floor_id).await?;
        info!(
            "event=apartment_delete module=repo status=ok apartment_id={id} floor_id={} pictures_deleted={pictures}",
            current.floor_id
        );
        Ok(())
    }

    pub async fn get_apartment(&self, id: &str) -> RepoResult<Apartment> {
        self.fetch_required(apartment::COLLECTION, id).await
    }

    pub async fn find_apartment(&self, id: &str) -> RepoResult<Option<Apartment>> {
        self.fetch(apartment::COLLECTION, id).await
    }

    pub async fn list_apartments(&self, filter: &ApartmentFilter) -> RepoResult<Vec<Apartment>> {
        let query = filter.to_query()?;
        self.select(apartment::COLLECTION, &query).await
    }

    async fn ensure_floor_exists(&self, floor_id: &str) -> RepoResult<()> {
        if self.find_floor(floor_id).await?.is_none() {
            return Err(ValidationError::DanglingReference {
                field: "floorId",
                id: floor_id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn ensure_lot_free(
        &self,
        floor_id: &str,
        lot_number: &str,
        except: Option<&str>,
    ) -> RepoResult<()> {
        let query = Query::new()
            .eq(FIELD_FLOOR_ID, floor_id)
            .eq(FIELD_LOT_NUMBER, lot_number)
            .limit(2);
        let taken: Vec<Apartment> = self.select(apartment::COLLECTION, &query).await?;
        if taken
            .iter()
            .any(|apartment| Some(apartment.id.as_str()) != except)
        {
            return Err(ValidationError::Duplicate {
                field: "lotNumber",
                value: lot_number.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
