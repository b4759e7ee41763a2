//! Slot repository interface

use async_trait::async_trait;
use chrono::NaiveDate;

use super::category::Category;
use super::model::{Slot, SlotCollection};
use crate::domain::DomainResult;

#[async_trait]
pub trait SlotRepository: Send + Sync {
    /// Save a new collection with all its slots.
    /// Fails with `Conflict` if the sub-venue already has one for that date.
    async fn save_collection(&self, collection: SlotCollection) -> DomainResult<()>;

    /// Find a collection by ID
    async fn find_collection(&self, id: &str) -> DomainResult<Option<SlotCollection>>;

    /// Find the collection of a sub-venue for a calendar date
    async fn find_collection_for_date(
        &self,
        sub_venue_id: &str,
        date: NaiveDate,
    ) -> DomainResult<Option<SlotCollection>>;

    /// Find a single slot
    async fn find_slot(&self, collection_id: &str, slot_id: &str) -> DomainResult<Option<Slot>>;

    /// Atomically move the slot from `available` to `booked`.
    ///
    /// Must be a single conditional write. Returns `false` when nothing
    /// matched (slot missing or no longer available).
    async fn claim(
        &self,
        collection_id: &str,
        slot_id: &str,
        category: Category,
        holder: &str,
    ) -> DomainResult<bool>;

    /// Unconditionally reset the slot to `available` and clear the claim.
    /// Returns `false` if the slot does not exist.
    async fn release(&self, collection_id: &str, slot_id: &str) -> DomainResult<bool>;

    /// Reset the slot to `available` only while `holder` (or nobody) owns the
    /// claim. Single conditional write; `false` when another holder has it.
    async fn release_held_by(
        &self,
        collection_id: &str,
        slot_id: &str,
        holder: &str,
    ) -> DomainResult<bool>;

    /// Persist timing, prices and status of a slot, but only while it is
    /// still not booked. Returns `false` when a claim got there first.
    async fn update_unbooked(&self, slot: &Slot) -> DomainResult<bool>;
}
