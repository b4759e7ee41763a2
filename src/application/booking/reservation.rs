//! Reservation coordinator: the only writer of slot claim state
//!
//! Exclusivity comes from the store's conditional update, not from any
//! lock held in this process.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::slot::{Category, Slot};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

pub struct ReservationCoordinator {
    repos: Arc<dyn RepositoryProvider>,
}

impl ReservationCoordinator {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Claim a slot for `holder` (a booking id).
    ///
    /// Exactly one of several concurrent claimers wins; the others get
    /// `Conflict`. Losers are not retried here.
    pub async fn claim_slot(
        &self,
        collection_id: &str,
        slot_id: &str,
        category: Category,
        holder: &str,
    ) -> DomainResult<Slot> {
        let slot = self
            .repos
            .slots()
            .find_slot(collection_id, slot_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Slot", "id", slot_id))?;

        slot.check_claimable(category, Utc::now())?;

        let claimed = self
            .repos
            .slots()
            .claim(collection_id, slot_id, category, holder)
            .await?;

        if !claimed {
            metrics::counter!("slot_claims_total", "outcome" => "conflict").increment(1);
            debug!(collection_id, slot_id, holder, "Slot claim lost");
            return Err(DomainError::slot_unavailable());
        }

        metrics::counter!("slot_claims_total", "outcome" => "claimed").increment(1);
        info!(collection_id, slot_id, %category, holder, "Slot claimed");

        self.repos
            .slots()
            .find_slot(collection_id, slot_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Slot", "id", slot_id))
    }

    /// Reset a slot to `available`, whoever holds it.
    ///
    /// Callers must only release a slot they claimed, or one whose payment
    /// has provably failed.
    pub async fn release_slot(&self, collection_id: &str, slot_id: &str) -> DomainResult<()> {
        let existed = self.repos.slots().release(collection_id, slot_id).await?;
        if existed {
            metrics::counter!("slot_releases_total").increment(1);
            info!(collection_id, slot_id, "Slot released");
        } else {
            warn!(collection_id, slot_id, "Release requested for unknown slot");
        }
        Ok(())
    }

    /// Release a slot unless another booking has claimed it since.
    ///
    /// Returns `false` when the claim belongs to someone else (or the slot
    /// is gone) and nothing was changed.
    pub async fn release_slot_held_by(
        &self,
        collection_id: &str,
        slot_id: &str,
        holder: &str,
    ) -> DomainResult<bool> {
        let released = self
            .repos
            .slots()
            .release_held_by(collection_id, slot_id, holder)
            .await?;
        if released {
            metrics::counter!("slot_releases_total").increment(1);
            info!(collection_id, slot_id, holder, "Slot released");
        }
        Ok(released)
    }
}
