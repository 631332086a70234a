//! Floor operations of the catalog repository.
//!
//! # Invariants
//! - Floor numbers are unique (checked on create and renumbering).
//! - A floor is deleted only while no apartment references it.
//! - `apartmentCount` is written only by `recount_apartments`.
//! - Hotspot updates replace the stored lists; angles left out of a new
//!   `angleHotspots` map are removed.

use super::catalog::{to_document, CatalogRepository};
use super::error::{RepoError, RepoResult};
use crate::model::floor::{
    self, Floor, FloorId, FloorPatch, FloorStatus, NewFloor, FIELD_ANGLE_HOTSPOTS,
    FIELD_APARTMENT_COUNT, FIELD_NUMBER, FIELD_STATUS,
};
use crate::model::hotspot::{AngleHotspots, Hotspot};
use crate::model::{apartment, new_document_id, now_epoch_ms, ValidationError};
use crate::store::document::{Direction, Document, DocumentStore, GuardedDelete, Query};
use log::{debug, info, warn};
use serde_json::Value;

/// Filter for listing floors. Results are ordered by floor number.
#[derive(Debug, Clone, Default)]
pub struct FloorFilter {
    pub status: Option<FloorStatus>,
    pub limit: Option<u32>,
}

impl FloorFilter {
    fn to_query(&self) -> Query {
        let mut query = Query::new();
        if let Some(status) = self.status {
            query = query.eq(FIELD_STATUS, status.as_str());
        }
        query = query.order_by(FIELD_NUMBER, Direction::Asc);
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        query
    }
}

impl<S: DocumentStore> CatalogRepository<S> {
    pub async fn create_floor(&self, input: NewFloor) -> RepoResult<FloorId> {
        input.validate()?;
        self.ensure_floor_number_free(input.number, None).await?;

        let id = new_document_id();
        let number = input.number;
        let floor = input.into_floor(id.clone(), now_epoch_ms());
        self.insert(floor::COLLECTION, &id, &floor).await?;
        info!("event=floor_create module=repo status=ok floor_id={id} number={number}");
        Ok(id)
    }

    pub async fn update_floor(&self, id: &str, patch: FloorPatch) -> RepoResult<()> {
        patch.validate()?;
        if let Some(number) = patch.number {
            self.ensure_floor_number_free(number, Some(id)).await?;
        }
        let mut document = to_document(&patch)?;
        if let Some(angles) = patch.angle_hotspots.as_ref() {
            let current = self.get_floor(id).await?;
            let removed = current
                .angle_hotspots
                .keys()
                .filter(|angle| !angles.contains_key(*angle));
            if let Some(Value::Object(stored)) = document.get_mut(FIELD_ANGLE_HOTSPOTS) {
                for angle in removed {
                    stored.insert(angle.clone(), Value::Null);
                }
            }
        }
        self.merge(floor::COLLECTION, id, &document, Some(now_epoch_ms()))
            .await
    }

    /// Replaces the floor's hotspots. `None` leaves that list untouched.
    pub async fn update_floor_hotspots(
        &self,
        id: &str,
        top_view: Option<Vec<Hotspot>>,
        angles: Option<AngleHotspots>,
    ) -> RepoResult<()> {
        let top_view_count = top_view.as_ref().map(Vec::len);
        let angle_count = angles.as_ref().map(AngleHotspots::len);
        let patch = FloorPatch {
            top_view_hotspots: top_view,
            angle_hotspots: angles,
            ..FloorPatch::default()
        };
        self.update_floor(id, patch).await?;
        info!(
            "event=floor_hotspots module=repo status=ok floor_id={id} top_view={top_view_count:?} angles={angle_count:?}"
        );
        Ok(())
    }

    /// Deletes a floor with no apartments left.
    ///
    /// Fails with `RepoError::Conflict` while apartments reference it.
    pub async fn delete_floor(&self, id: &str) -> RepoResult<()> {
        let outcome = self
            .store()
            .delete_unless_referenced(
                floor::COLLECTION,
                id,
                apartment::COLLECTION,
                apartment::FIELD_FLOOR_ID,
            )
            .await?;
        match outcome {
            GuardedDelete::Deleted => {
                info!("event=floor_delete module=repo status=ok floor_id={id}");
                Ok(())
            }
            GuardedDelete::Missing => Err(RepoError::not_found(floor::COLLECTION, id)),
            GuardedDelete::Referenced(dependents) => {
                warn!(
                    "event=floor_delete module=repo status=error floor_id={id} error_code=conflict dependents={dependents}"
                );
                Err(RepoError::Conflict {
                    collection: floor::COLLECTION,
                    id: id.to_string(),
                    dependents,
                })
            }
        }
    }

    pub async fn get_floor(&self, id: &str) -> RepoResult<Floor> {
        self.fetch_required(floor::COLLECTION, id).await
    }

    pub async fn find_floor(&self, id: &str) -> RepoResult<Option<Floor>> {
        self.fetch(floor::COLLECTION, id).await
    }

    pub async fn find_floor_by_number(&self, number: u32) -> RepoResult<Option<Floor>> {
        let query = Query::new().eq(FIELD_NUMBER, number).limit(1);
        let mut floors: Vec<Floor> = self.select(floor::COLLECTION, &query).await?;
        Ok(floors.pop())
    }

    pub async fn list_floors(&self, filter: &FloorFilter) -> RepoResult<Vec<Floor>> {
        self.select(floor::COLLECTION, &filter.to_query()).await
    }

    /// Number of apartments currently referencing the floor.
    pub async fn live_apartment_count(&self, floor_id: &str) -> RepoResult<u64> {
        let query = Query::new().eq(apartment::FIELD_FLOOR_ID, floor_id);
        self.count_matching(apartment::COLLECTION, &query).await
    }

    /// Recomputes `apartmentCount` from live apartments and stores it.
    ///
    /// A floor that vanished in between is left alone.
    pub async fn recount_apartments(&self, floor_id: &str) -> RepoResult<u64> {
        let count = self.live_apartment_count(floor_id).await?;
        let mut fields = Document::new();
        fields.insert(FIELD_APARTMENT_COUNT.to_string(), Value::from(count));
        let updated = self
            .store()
            .update(floor::COLLECTION, floor_id, fields)
            .await?;
        if updated {
            debug!("event=floor_recount module=repo status=ok floor_id={floor_id} count={count}");
        } else {
            warn!("event=floor_recount module=repo status=soft_fail floor_id={floor_id} reason=floor_missing");
        }
        Ok(count)
    }

    async fn ensure_floor_number_free(&self, number: u32, except: Option<&str>) -> RepoResult<()> {
        let query = Query::new().eq(FIELD_NUMBER, number).limit(2);
        let taken: Vec<Floor> = self.select(floor::COLLECTION, &query).await?;
        if taken.iter().any(|floor| Some(floor.id.as_str()) != except) {
            return Err(ValidationError::Duplicate {
                field: "number",
                value: number.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
