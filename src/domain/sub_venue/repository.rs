//! Sub-venue repository interface

use async_trait::async_trait;

use super::model::SubVenue;
use crate::domain::DomainResult;

#[async_trait]
pub trait SubVenueRepository: Send + Sync {
    /// Find sub-venue by ID
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<SubVenue>>;

    /// Insert a sub-venue (seeding and tests; the catalog owns these)
    async fn save(&self, sub_venue: &SubVenue) -> DomainResult<()>;
}
