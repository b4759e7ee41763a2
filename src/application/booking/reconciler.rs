//! Payment reconciler
//!
//! Applies gateway notifications (already authenticated) to bookings,
//! slots and games. Every transition is idempotent, so redelivered and
//! out-of-order notifications are harmless.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::game_sync::GameSynchronizer;
use super::reservation::ReservationCoordinator;
use crate::application::ports::{GatewayEvent, SessionMetadata, SessionStatus, SharedPaymentGateway};
use crate::domain::booking::{Booking, BookingStatus, SlotRef};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

pub struct PaymentReconciler {
    repos: Arc<dyn RepositoryProvider>,
    gateway: SharedPaymentGateway,
    coordinator: ReservationCoordinator,
    games: GameSynchronizer,
}

impl PaymentReconciler {
    pub fn new(repos: Arc<dyn RepositoryProvider>, gateway: SharedPaymentGateway) -> Self {
        Self {
            coordinator: ReservationCoordinator::new(repos.clone()),
            games: GameSynchronizer::new(repos.clone()),
            repos,
            gateway,
        }
    }

    /// Entry point for webhook notifications.
    pub async fn handle_event(&self, event: GatewayEvent) -> DomainResult<()> {
        metrics::counter!("payment_webhooks_total", "kind" => event.kind().to_string())
            .increment(1);

        match event {
            GatewayEvent::SessionCompleted {
                session_id,
                payment_intent_id,
                metadata,
            } => {
                self.on_session_completed(&session_id, payment_intent_id, &metadata)
                    .await
            }
            GatewayEvent::SessionExpired {
                session_id,
                metadata,
            } => self.on_session_expired(&session_id, &metadata).await,
            GatewayEvent::Other(kind) => {
                debug!(kind = %kind, "Ignoring gateway event");
                Ok(())
            }
        }
    }

    pub async fn on_session_completed(
        &self,
        session_id: &str,
        payment_intent_id: Option<String>,
        metadata: &SessionMetadata,
    ) -> DomainResult<()> {
        let Some(booking) = self.repos.bookings().find_by_session_id(session_id).await? else {
            warn!(
                session_id,
                booking_id = metadata.booking_id(),
                "Completed session has no booking"
            );
            return Ok(());
        };

        self.settle_paid(booking, payment_intent_id).await?;
        Ok(())
    }

    pub async fn on_session_expired(
        &self,
        session_id: &str,
        metadata: &SessionMetadata,
    ) -> DomainResult<()> {
        let booking = match self.repos.bookings().find_by_session_id(session_id).await? {
            Some(booking) => Some(booking),
            None => match metadata.booking_id() {
                Some(booking_id) => match self.repos.bookings().find_by_id(booking_id).await? {
                    Some(booking) if booking.session_id() != Some(session_id) => {
                        info!(
                            session_id,
                            booking_id,
                            current_session = booking.session_id(),
                            "Expired session was superseded by a retry, ignoring"
                        );
                        return Ok(());
                    }
                    other => other,
                },
                None => None,
            },
        };

        if booking.is_none() {
            warn!(session_id, "Expired session has no booking, releasing from metadata");
        }

        self.fail_and_release(booking, metadata).await?;
        Ok(())
    }

    /// Confirm a payer's payment after the gateway redirect.
    ///
    /// Asks the gateway directly when the webhook has not arrived yet.
    pub async fn verify_payment(&self, payer_id: &str, session_id: &str) -> DomainResult<Booking> {
        let booking = self
            .repos
            .bookings()
            .find_by_session_id(session_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", "session_id", session_id))?;

        if !booking.is_owned_by(payer_id) {
            return Err(DomainError::Unauthorized(
                "You can only verify your own bookings".to_string(),
            ));
        }
        if booking.status() != BookingStatus::Pending {
            return Ok(booking);
        }

        let session = self.gateway.retrieve_session(session_id).await?;
        match session.status {
            SessionStatus::Complete => self.settle_paid(booking, session.payment_intent_id).await,
            SessionStatus::Expired => {
                let id = booking.id.clone();
                self.fail_and_release(Some(booking), &session.metadata)
                    .await?
                    .ok_or_else(|| DomainError::not_found("Booking", "id", &id))
            }
            SessionStatus::Open => Ok(booking),
        }
    }

    /// Mark a booking Paid and its game Full. No-op when already Paid.
    pub(crate) async fn settle_paid(
        &self,
        mut booking: Booking,
        payment_intent_id: Option<String>,
    ) -> DomainResult<Booking> {
        let previous = booking.status();
        if previous == BookingStatus::Refunded {
            warn!(booking_id = %booking.id, "Payment completed for a refunded booking, ignoring");
            return Ok(booking);
        }
        if !booking.mark_paid(payment_intent_id)? {
            debug!(booking_id = %booking.id, "Booking already paid");
            return Ok(booking);
        }

        self.ensure_slot_held(&booking, previous).await?;

        self.repos.bookings().update(&booking).await?;
        info!(
            booking_id = %booking.id,
            payment_intent_id = booking.payment_intent_id(),
            "Booking paid"
        );

        if let Some(game_id) = &booking.game_id {
            self.games.mark_full(game_id).await?;
        }
        Ok(booking)
    }

    /// A paid booking must own its slot. After a failure (or a repair that
    /// raced a retry) the slot may have been released; take it back if
    /// nobody else holds it.
    async fn ensure_slot_held(&self, booking: &Booking, previous: BookingStatus) -> DomainResult<()> {
        let snapshot = booking.snapshot();
        let slot = &snapshot.slot;
        let held = self
            .repos
            .slots()
            .find_slot(&slot.collection_id, &slot.slot_id)
            .await?
            .is_some_and(|s| s.is_held_by(&booking.id));
        if held {
            return Ok(());
        }

        let reclaimed = self
            .repos
            .slots()
            .claim(&slot.collection_id, &slot.slot_id, snapshot.category, &booking.id)
            .await?;
        if reclaimed {
            info!(
                booking_id = %booking.id,
                previous = %previous,
                "Slot re-claimed for late payment"
            );
        } else {
            error!(
                booking_id = %booking.id,
                collection_id = %slot.collection_id,
                slot_id = %slot.slot_id,
                "Payment for a slot now held by another booking, refund required"
            );
        }
        Ok(())
    }

    /// Shared repair for a payment that will never complete.
    ///
    /// Marks the booking Failed (when there is one), releases its slot and
    /// reopens its game. Paid and Refunded bookings are left untouched.
    /// Returns the booking as persisted.
    pub(crate) async fn fail_and_release(
        &self,
        booking: Option<Booking>,
        metadata: &SessionMetadata,
    ) -> DomainResult<Option<Booking>> {
        let booking = match booking {
            Some(b) if matches!(b.status(), BookingStatus::Paid | BookingStatus::Refunded) => {
                debug!(booking_id = %b.id, status = %b.status(), "Booking settled, nothing to repair");
                return Ok(Some(b));
            }
            Some(mut b) => {
                if b.mark_failed()? {
                    self.repos.bookings().update(&b).await?;
                    info!(booking_id = %b.id, "Booking payment failed");
                }
                Some(b)
            }
            None => None,
        };

        let holder = booking
            .as_ref()
            .map(|b| b.id.as_str())
            .or(metadata.booking_id());

        match (metadata.slot_ref(), &booking) {
            (Some(slot), _) => self.release_if_not_reclaimed(&slot, holder).await?,
            (None, Some(b)) => self.release_by_window(b).await?,
            (None, None) => warn!("No slot reference in session metadata, nothing to release"),
        }

        let game_id = metadata
            .game_id()
            .map(str::to_string)
            .or_else(|| booking.as_ref().and_then(|b| b.game_id.clone()));
        if let Some(game_id) = game_id {
            self.games.reopen(&game_id).await?;
        }

        Ok(booking)
    }

    /// Release unless another booking has claimed the slot since. The
    /// holder check is part of the store's conditional write.
    async fn release_if_not_reclaimed(
        &self,
        slot: &SlotRef,
        holder: Option<&str>,
    ) -> DomainResult<()> {
        let Some(holder) = holder else {
            warn!(
                collection_id = %slot.collection_id,
                slot_id = %slot.slot_id,
                "No booking id for the session, releasing unconditionally"
            );
            return self
                .coordinator
                .release_slot(&slot.collection_id, &slot.slot_id)
                .await;
        };

        let released = self
            .coordinator
            .release_slot_held_by(&slot.collection_id, &slot.slot_id, holder)
            .await?;
        if !released {
            warn!(
                collection_id = %slot.collection_id,
                slot_id = %slot.slot_id,
                holder,
                "Slot held by another booking or missing, not releasing"
            );
        }
        Ok(())
    }

    /// Fallback when metadata lacks a slot reference: find the element of the
    /// sub-venue's collection whose window matches the booking exactly.
    async fn release_by_window(&self, booking: &Booking) -> DomainResult<()> {
        let snapshot = booking.snapshot();
        let collection = self
            .repos
            .slots()
            .find_collection_for_date(&snapshot.sub_venue_id, snapshot.start_at.date_naive())
            .await?;

        let Some(slot) = collection
            .as_ref()
            .and_then(|c| c.find_by_window(snapshot.start_at, snapshot.end_at))
        else {
            warn!(booking_id = %booking.id, "No slot matches the booking window, nothing to release");
            return Ok(());
        };

        let slot = SlotRef::new(&slot.collection_id, &slot.id);
        self.release_if_not_reclaimed(&slot, Some(&booking.id)).await
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::booking::testing::Fixture;
    use crate::domain::game::GameStatus;
    use crate::domain::slot::{Category, SlotStatus};

    fn completed(session_id: &str, metadata: SessionMetadata) -> GatewayEvent {
        GatewayEvent::SessionCompleted {
            session_id: session_id.into(),
            payment_intent_id: Some("pi_1".into()),
            metadata,
        }
    }

    fn expired(session_id: &str, metadata: SessionMetadata) -> GatewayEvent {
        GatewayEvent::SessionExpired {
            session_id: session_id.into(),
            metadata,
        }
    }

    #[tokio::test]
    async fn duplicate_completion_is_idempotent() {
        let fx = Fixture::new().await;
        let outcome = fx
            .checkout_service(false)
            .checkout_direct(fx.direct("u1", Category::Cricket))
            .await
            .unwrap();
        let session_id = outcome.session_id.unwrap();
        let meta = fx.gateway.last_request().unwrap().metadata;
        let reconciler = fx.reconciler();

        reconciler.handle_event(completed(&session_id, meta.clone())).await.unwrap();
        reconciler.handle_event(completed(&session_id, meta)).await.unwrap();

        let booking = fx.booking(&outcome.booking_id).await;
        assert!(booking.is_paid());
        assert_eq!(booking.payment_intent_id(), Some("pi_1"));
        assert_eq!(fx.repos.bookings().find_for_payer("u1").await.unwrap().len(), 1);
        assert_eq!(fx.current_slot().await.status, SlotStatus::Booked);
    }

    #[tokio::test]
    async fn expiry_fails_booking_and_frees_slot() {
        let fx = Fixture::new().await;
        let outcome = fx
            .checkout_service(false)
            .checkout_direct(fx.direct("u1", Category::Cricket))
            .await
            .unwrap();
        let meta = fx.gateway.last_request().unwrap().metadata;

        fx.reconciler()
            .handle_event(expired(outcome.session_id.as_deref().unwrap(), meta))
            .await
            .unwrap();

        assert_eq!(fx.booking(&outcome.booking_id).await.status(), BookingStatus::Failed);
        let slot = fx.current_slot().await;
        assert_eq!(slot.status, SlotStatus::Available);
        assert!(slot.booked_for.is_none());
    }

    #[tokio::test]
    async fn expiry_without_slot_metadata_matches_by_window() {
        let fx = Fixture::new().await;
        let outcome = fx
            .checkout_service(false)
            .checkout_direct(fx.direct("u1", Category::Cricket))
            .await
            .unwrap();

        let meta = SessionMetadata {
            booking_id: Some(outcome.booking_id.clone()),
            ..SessionMetadata::default()
        };
        fx.reconciler()
            .handle_event(expired(outcome.session_id.as_deref().unwrap(), meta))
            .await
            .unwrap();

        assert_eq!(fx.current_slot().await.status, SlotStatus::Available);
        assert_eq!(fx.booking(&outcome.booking_id).await.status(), BookingStatus::Failed);
    }

    #[tokio::test]
    async fn expiry_without_booking_still_releases() {
        let fx = Fixture::new().await;
        fx.repos
            .slots()
            .claim(&fx.slot.collection_id, &fx.slot.slot_id, Category::Cricket, "ghost")
            .await
            .unwrap();

        let meta = SessionMetadata::for_booking("ghost", &fx.slot, None);
        fx.reconciler().handle_event(expired("cs_unknown", meta)).await.unwrap();

        assert_eq!(fx.current_slot().await.status, SlotStatus::Available);
    }

    #[tokio::test]
    async fn expiry_reopens_game() {
        let fx = Fixture::new().await;
        let game = fx.add_game("host", 10, GameStatus::Open).await;
        let outcome = fx
            .checkout_service(false)
            .checkout_game("host", &game.id)
            .await
            .unwrap();
        assert_eq!(fx.game_status(&game.id).await, GameStatus::Full);
        let meta = fx.gateway.last_request().unwrap().metadata;

        fx.reconciler()
            .handle_event(expired(outcome.session_id.as_deref().unwrap(), meta))
            .await
            .unwrap();

        assert_eq!(fx.game_status(&game.id).await, GameStatus::Open);
        assert_eq!(fx.current_slot().await.status, SlotStatus::Available);
    }

    #[tokio::test]
    async fn superseded_expiry_is_ignored() {
        let fx = Fixture::new().await;
        let outcome = fx
            .checkout_service(false)
            .checkout_direct(fx.direct("u1", Category::Cricket))
            .await
            .unwrap();
        let meta = fx.gateway.last_request().unwrap().metadata;

        // The booking has moved on to a newer session.
        let mut booking = fx.booking(&outcome.booking_id).await;
        booking.restart_payment("cs_newer").unwrap();
        fx.repos.bookings().update(&booking).await.unwrap();

        fx.reconciler()
            .handle_event(expired(outcome.session_id.as_deref().unwrap(), meta))
            .await
            .unwrap();

        assert_eq!(fx.booking(&outcome.booking_id).await.status(), BookingStatus::Pending);
        assert_eq!(fx.current_slot().await.status, SlotStatus::Booked);
    }

    #[tokio::test]
    async fn expiry_after_payment_is_noop() {
        let fx = Fixture::new().await;
        let outcome = fx
            .checkout_service(false)
            .checkout_direct(fx.direct("u1", Category::Cricket))
            .await
            .unwrap();
        let session_id = outcome.session_id.unwrap();
        let meta = fx.gateway.last_request().unwrap().metadata;
        let reconciler = fx.reconciler();

        reconciler.handle_event(completed(&session_id, meta.clone())).await.unwrap();
        reconciler.handle_event(expired(&session_id, meta)).await.unwrap();

        assert!(fx.booking(&outcome.booking_id).await.is_paid());
        assert_eq!(fx.current_slot().await.status, SlotStatus::Booked);
    }

    #[tokio::test]
    async fn late_payment_reclaims_free_slot() {
        let fx = Fixture::new().await;
        let outcome = fx
            .checkout_service(false)
            .checkout_direct(fx.direct("u1", Category::Cricket))
            .await
            .unwrap();
        let session_id = outcome.session_id.unwrap();
        let meta = fx.gateway.last_request().unwrap().metadata;
        let reconciler = fx.reconciler();

        reconciler.handle_event(expired(&session_id, meta.clone())).await.unwrap();
        assert_eq!(fx.current_slot().await.status, SlotStatus::Available);

        reconciler.handle_event(completed(&session_id, meta)).await.unwrap();

        assert!(fx.booking(&outcome.booking_id).await.is_paid());
        let slot = fx.current_slot().await;
        assert!(slot.is_held_by(&outcome.booking_id));
        assert_eq!(slot.booked_for, Some(Category::Cricket));
    }

    #[tokio::test]
    async fn late_payment_leaves_new_holder_alone() {
        let fx = Fixture::new().await;
        let checkout = fx.checkout_service(false);
        let first = checkout.checkout_direct(fx.direct("u1", Category::Cricket)).await.unwrap();
        let session_id = first.session_id.unwrap();
        let meta = fx.gateway.last_request().unwrap().metadata;
        let reconciler = fx.reconciler();

        reconciler.handle_event(expired(&session_id, meta.clone())).await.unwrap();
        let second = checkout.checkout_direct(fx.direct("u2", Category::Cricket)).await.unwrap();

        reconciler.handle_event(completed(&session_id, meta)).await.unwrap();

        assert!(fx.booking(&first.booking_id).await.is_paid());
        assert_eq!(fx.booking(&second.booking_id).await.status(), BookingStatus::Pending);
        assert!(fx.current_slot().await.is_held_by(&second.booking_id));
    }

    #[tokio::test]
    async fn duplicate_expiry_keeps_foreign_claim() {
        let fx = Fixture::new().await;
        let checkout = fx.checkout_service(false);
        let first = checkout.checkout_direct(fx.direct("u1", Category::Cricket)).await.unwrap();
        let session_id = first.session_id.unwrap();
        let meta = fx.gateway.last_request().unwrap().metadata;
        let reconciler = fx.reconciler();

        reconciler.handle_event(expired(&session_id, meta.clone())).await.unwrap();
        let second = checkout.checkout_direct(fx.direct("u2", Category::Cricket)).await.unwrap();

        // Redelivery of the first expiry must not free the second claim.
        reconciler.handle_event(expired(&session_id, meta)).await.unwrap();

        let slot = fx.current_slot().await;
        assert_eq!(slot.status, SlotStatus::Booked);
        assert!(slot.is_held_by(&second.booking_id));
    }

    #[tokio::test]
    async fn unknown_event_kind_is_accepted() {
        let fx = Fixture::new().await;
        fx.reconciler()
            .handle_event(GatewayEvent::Other("charge.refunded".into()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn verify_asks_gateway_when_webhook_is_late() {
        let fx = Fixture::new().await;
        let outcome = fx
            .checkout_service(false)
            .checkout_direct(fx.direct("u1", Category::Cricket))
            .await
            .unwrap();
        let session_id = outcome.session_id.unwrap();
        let reconciler = fx.reconciler();

        let booking = reconciler.verify_payment("u1", &session_id).await.unwrap();
        assert_eq!(booking.status(), BookingStatus::Pending);

        fx.gateway.complete(&session_id, "pi_9");
        let booking = reconciler.verify_payment("u1", &session_id).await.unwrap();
        assert!(booking.is_paid());
        assert_eq!(booking.payment_intent_id(), Some("pi_9"));

        let err = reconciler.verify_payment("u2", &session_id).await.unwrap_err();
        assert_eq!(err.kind(), "unauthorized");
    }
}
