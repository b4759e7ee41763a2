//! Booking repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{Booking, BookingStatus};
use crate::domain::DomainResult;

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Save a new booking
    async fn save(&self, booking: &Booking) -> DomainResult<()>;

    /// Find booking by ID
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Booking>>;

    /// Find the booking currently pointing at a gateway session
    async fn find_by_session_id(&self, session_id: &str) -> DomainResult<Option<Booking>>;

    /// All bookings of a payer, newest first
    async fn find_for_payer(&self, payer_id: &str) -> DomainResult<Vec<Booking>>;

    /// Pending or Paid booking attached to a game, if any
    async fn find_active_for_game(&self, game_id: &str) -> DomainResult<Option<Booking>>;

    /// Pending bookings with a session opened before `opened_before`
    async fn find_stale_pending(&self, opened_before: DateTime<Utc>) -> DomainResult<Vec<Booking>>;

    /// Persist status and gateway fields. The snapshot is never rewritten.
    async fn update(&self, booking: &Booking) -> DomainResult<()>;

    /// Like [`update`](Self::update), but only while the stored booking still
    /// has `expected_status` and `expected_session`. Returns `false` when a
    /// concurrent writer moved it first.
    async fn compare_and_update(
        &self,
        booking: &Booking,
        expected_status: BookingStatus,
        expected_session: Option<&str>,
    ) -> DomainResult<bool>;

    /// Delete a booking (checkout rollback only)
    async fn delete(&self, id: &str) -> DomainResult<()>;
}
