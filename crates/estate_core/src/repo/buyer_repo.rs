//! Buyer operations of the catalog repository.
//!
//! Interested-apartment ids are not checked on write; dangling ids are
//! resolved to placeholders on read by the facade.

use super::catalog::{CatalogRepository, TimeRange};
use super::error::RepoResult;
use crate::model::buyer::{
    self, Buyer, BuyerId, BuyerPatch, BuyerStatus, NewBuyer, FIELD_CREATED_AT,
    FIELD_INTERESTED_APARTMENT_IDS, FIELD_STATUS,
};
use crate::model::{new_document_id, now_epoch_ms};
use crate::store::document::{Direction, DocumentStore, Query};
use log::info;

/// Filter for listing buyers. Results are ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct BuyerFilter {
    pub status: Option<BuyerStatus>,
    /// Buyers whose interested list contains this apartment id.
    pub interested_in: Option<String>,
    pub created: Option<TimeRange>,
    pub limit: Option<u32>,
}

impl BuyerFilter {
    pub fn interested_in(apartment_id: impl Into<String>) -> Self {
        Self {
            interested_in: Some(apartment_id.into()),
            ..Self::default()
        }
    }

    fn to_query(&self) -> Query {
        let mut query = Query::new();
        if let Some(status) = self.status {
            query = query.eq(FIELD_STATUS, status.as_str());
        }
        if let Some(apartment_id) = self.interested_in.as_deref() {
            query = query.array_contains(FIELD_INTERESTED_APARTMENT_IDS, apartment_id);
        }
        if let Some(created) = self.created {
            query = created.apply(query, FIELD_CREATED_AT);
        }
        query = query.order_by(FIELD_CREATED_AT, Direction::Desc);
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        query
    }
}

impl<S: DocumentStore> CatalogRepository<S> {
    pub async fn create_buyer(&self, input: NewBuyer) -> RepoResult<BuyerId> {
        input.validate()?;
        let id = new_document_id();
        let buyer = input.into_buyer(id.clone(), now_epoch_ms());
        self.insert(buyer::COLLECTION, &id, &buyer).await?;
        info!(
            "event=buyer_create module=repo status=ok buyer_id={id} interested={}",
            buyer.interested_apartment_ids.len()
        );
        Ok(id)
    }

    pub async fn update_buyer(&self, id: &str, patch: BuyerPatch) -> RepoResult<()> {
        patch.validate()?;
        self.merge(buyer::COLLECTION, id, &patch, Some(now_epoch_ms()))
            .await
    }

    pub async fn delete_buyer(&self, id: &str) -> RepoResult<()> {
        self.remove(buyer::COLLECTION, id).await
    }

    pub async fn get_buyer(&self, id: &str) -> RepoResult<Buyer> {
        self.fetch_required(buyer::COLLECTION, id).await
    }

    pub async fn find_buyer(&self, id: &str) -> RepoResult<Option<Buyer>> {
        self.fetch(buyer::COLLECTION, id).await
    }

    pub async fn list_buyers(&self, filter: &BuyerFilter) -> RepoResult<Vec<Buyer>> {
        self.select(buyer::COLLECTION, &filter.to_query()).await
    }
}
