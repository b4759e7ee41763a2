//! Payment retry for an existing booking
//!
//! Keeps the booking id and snapshot, opens a fresh gateway session and
//! points the booking at it.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::checkout::{session_label, CheckoutConfig, CheckoutOutcome};
use super::game_sync::GameSynchronizer;
use super::reservation::ReservationCoordinator;
use crate::application::ports::{CreateSessionRequest, SessionMetadata, SharedPaymentGateway};
use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

pub struct RetryService {
    repos: Arc<dyn RepositoryProvider>,
    gateway: SharedPaymentGateway,
    coordinator: ReservationCoordinator,
    games: GameSynchronizer,
    config: CheckoutConfig,
}

impl RetryService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        gateway: SharedPaymentGateway,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            coordinator: ReservationCoordinator::new(repos.clone()),
            games: GameSynchronizer::new(repos.clone()),
            repos,
            gateway,
            config,
        }
    }

    pub async fn retry_payment(&self, payer_id: &str, booking_id: &str) -> DomainResult<CheckoutOutcome> {
        let mut booking = self
            .repos
            .bookings()
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", "id", booking_id))?;

        if !booking.is_owned_by(payer_id) {
            return Err(DomainError::Unauthorized(
                "You can only retry your own bookings".to_string(),
            ));
        }

        let previous_session = booking.session_id().map(str::to_string);
        let freshly_claimed = match booking.status() {
            BookingStatus::Paid => {
                return Err(DomainError::Conflict("Booking is already paid".to_string()))
            }
            BookingStatus::Refunded => {
                return Err(DomainError::Validation(
                    "Invalid status for retry: Refunded".to_string(),
                ))
            }
            BookingStatus::Failed => {
                self.claim_for(&booking).await.map_err(|e| {
                    if e.is_conflict() {
                        DomainError::Conflict("Slot is no longer available".to_string())
                    } else {
                        e
                    }
                })?;
                true
            }
            BookingStatus::Pending => match self.claim_for(&booking).await {
                Ok(()) => true,
                Err(e) if e.is_conflict() => {
                    let slot = &booking.snapshot().slot;
                    let still_ours = self
                        .repos
                        .slots()
                        .find_slot(&slot.collection_id, &slot.slot_id)
                        .await?
                        .is_some_and(|s| s.is_held_by(&booking.id));
                    if !still_ours {
                        return Err(DomainError::Conflict(
                            "Slot is not available for retry".to_string(),
                        ));
                    }
                    false
                }
                Err(e) => return Err(e),
            },
        };

        let outcome = match self.reopen_payment(&mut booking).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if freshly_claimed {
                    self.release_own_claim(&booking).await;
                }
                return Err(e);
            }
        };

        if let Some(session_id) = outcome.session_id.as_deref() {
            self.confirm_claim(&booking, session_id).await?;
        }

        // Expire the old session only after the booking points at the new
        // one, so its expiry notification is seen as superseded.
        let superseded = previous_session
            .filter(|old| Some(old.as_str()) != outcome.session_id.as_deref());
        if let Some(old) = superseded {
            if let Err(e) = self.gateway.expire_session(&old).await {
                warn!(booking_id, session_id = %old, error = %e, "Could not expire previous session");
            }
        }
        if let Some(game_id) = &booking.game_id {
            if let Err(e) = self.games.mark_full(game_id).await {
                warn!(game_id = %game_id, error = %e, "Failed to mark game full after retry");
            }
        }
        Ok(outcome)
    }

    /// The booking now points at `session_id`, so notifications for older
    /// sessions are ignored from here on. A repair that ran before that
    /// point may still have released the slot: take it back, or fail the
    /// booking and kill the new session if someone else got it.
    async fn confirm_claim(&self, booking: &Booking, session_id: &str) -> DomainResult<()> {
        let slot = &booking.snapshot().slot;
        let held = self
            .repos
            .slots()
            .find_slot(&slot.collection_id, &slot.slot_id)
            .await?
            .is_some_and(|s| s.is_held_by(&booking.id));
        if held {
            return Ok(());
        }

        match self.claim_for(booking).await {
            Ok(()) => {
                info!(booking_id = %booking.id, "Slot re-claimed after concurrent repair");
                return Ok(());
            }
            Err(e) if e.is_conflict() => {}
            Err(e) => return Err(e),
        }

        warn!(booking_id = %booking.id, session_id, "Slot lost during retry, failing booking");
        self.expire_quietly(session_id).await;
        let mut failed = booking.clone();
        if failed.mark_failed()? {
            self.repos
                .bookings()
                .compare_and_update(&failed, BookingStatus::Pending, Some(session_id))
                .await?;
        }
        Err(DomainError::Conflict(
            "Slot is no longer available".to_string(),
        ))
    }

    /// Undo a claim this retry made. A late payment may settle the booking
    /// while the rollback runs; a paid booking gets its slot back.
    async fn release_own_claim(&self, booking: &Booking) {
        let slot = &booking.snapshot().slot;
        if let Err(e) = self
            .coordinator
            .release_slot_held_by(&slot.collection_id, &slot.slot_id, &booking.id)
            .await
        {
            error!(booking_id = %booking.id, error = %e, "Retry rollback failed to release slot");
            return;
        }

        match self.repos.bookings().find_by_id(&booking.id).await {
            Ok(Some(current)) if current.is_paid() => {
                if let Err(e) = self.claim_for(&current).await {
                    error!(
                        booking_id = %booking.id,
                        error = %e,
                        "Paid booking lost its slot during retry rollback, refund required"
                    );
                }
            }
            Ok(_) => {}
            Err(e) => warn!(booking_id = %booking.id, error = %e, "Could not re-read booking after rollback"),
        }
    }

    async fn expire_quietly(&self, session_id: &str) {
        if let Err(e) = self.gateway.expire_session(session_id).await {
            warn!(session_id, error = %e, "Could not expire orphaned session");
        }
    }

    async fn claim_for(&self, booking: &Booking) -> DomainResult<()> {
        let snapshot = booking.snapshot();
        self.coordinator
            .claim_slot(
                &snapshot.slot.collection_id,
                &snapshot.slot.slot_id,
                snapshot.category,
                &booking.id,
            )
            .await
            .map(|_| ())
    }

    /// Open a new session and point the booking at it. The write only lands
    /// if nobody changed the booking while the gateway call was in flight.
    async fn reopen_payment(&self, booking: &mut Booking) -> DomainResult<CheckoutOutcome> {
        let snapshot = booking.snapshot().clone();
        let expected_status = booking.status();
        let expected_session = booking.session_id().map(str::to_string);

        if self.config.payment_bypass {
            booking.mark_paid(None)?;
            if !self
                .repos
                .bookings()
                .compare_and_update(booking, expected_status, expected_session.as_deref())
                .await?
            {
                return Err(booking_changed());
            }
            info!(booking_id = %booking.id, "Retry paid via payment bypass");
            return Ok(CheckoutOutcome {
                booking_id: booking.id.clone(),
                session_id: None,
                redirect_url: self.config.success_url.clone(),
                status: BookingStatus::Paid,
            });
        }

        let place = self
            .repos
            .sub_venues()
            .find_by_id(&snapshot.sub_venue_id)
            .await?
            .map(|s| s.name)
            .unwrap_or_else(|| snapshot.sub_venue_id.clone());

        let session = self
            .gateway
            .create_session(CreateSessionRequest {
                amount: snapshot.amount,
                currency: snapshot.currency.clone(),
                label: session_label(&place, snapshot.category, snapshot.start_at, snapshot.end_at),
                client_reference_id: booking.id.clone(),
                metadata: SessionMetadata::for_booking(
                    &booking.id,
                    &snapshot.slot,
                    booking.game_id.as_deref(),
                ),
                success_url: self.config.success_url.clone(),
                cancel_url: self.config.cancel_url.clone(),
            })
            .await?;

        let mut reopened = booking.clone();
        reopened.restart_payment(&session.id)?;
        let written = self
            .repos
            .bookings()
            .compare_and_update(&reopened, expected_status, expected_session.as_deref())
            .await;
        match written {
            Ok(true) => {}
            Ok(false) => {
                warn!(booking_id = %booking.id, "Booking changed during retry, discarding new session");
                self.expire_quietly(&session.id).await;
                return Err(booking_changed());
            }
            Err(e) => {
                self.expire_quietly(&session.id).await;
                return Err(e);
            }
        }
        *booking = reopened;

        info!(booking_id = %booking.id, session_id = %session.id, "Payment retry opened");
        Ok(CheckoutOutcome {
            booking_id: booking.id.clone(),
            session_id: Some(session.id),
            redirect_url: session.url,
            status: BookingStatus::Pending,
        })
    }
}

fn booking_changed() -> DomainError {
    DomainError::Conflict("Booking changed during retry, please try again".to_string())
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::application::booking::reconciler::PaymentReconciler;
    use crate::application::booking::testing::{FakeGateway, Fixture};
    use crate::application::ports::{
        CheckoutSession, GatewayError, GatewayEvent, PaymentGateway, SessionSnapshot,
    };
    use crate::domain::game::GameStatus;
    use crate::domain::slot::{Category, SlotStatus};

    fn retry_service(fx: &Fixture) -> RetryService {
        RetryService::new(fx.repos.clone(), fx.gateway.clone(), CheckoutConfig::default())
    }

    /// Delivers the expiry of the previous session while the new one is
    /// being created.
    struct ExpiryDuringCreate {
        inner: Arc<FakeGateway>,
        reconciler: PaymentReconciler,
        old_session: String,
        metadata: SessionMetadata,
    }

    #[async_trait]
    impl PaymentGateway for ExpiryDuringCreate {
        async fn create_session(
            &self,
            request: CreateSessionRequest,
        ) -> Result<CheckoutSession, GatewayError> {
            // Already expired on redelivery; only the notification matters.
            let _ = self.inner.expire_session(&self.old_session).await;
            self.reconciler
                .on_session_expired(&self.old_session, &self.metadata)
                .await
                .map_err(|e| GatewayError::Transport(e.to_string()))?;
            self.inner.create_session(request).await
        }

        async fn retrieve_session(&self, session_id: &str) -> Result<SessionSnapshot, GatewayError> {
            self.inner.retrieve_session(session_id).await
        }

        async fn expire_session(&self, session_id: &str) -> Result<(), GatewayError> {
            self.inner.expire_session(session_id).await
        }
    }

    fn racing_retry(fx: &Fixture, booking_id: &str, old_session: &str) -> RetryService {
        let gateway = Arc::new(ExpiryDuringCreate {
            inner: fx.gateway.clone(),
            reconciler: fx.reconciler(),
            old_session: old_session.to_string(),
            metadata: SessionMetadata::for_booking(booking_id, &fx.slot, None),
        });
        RetryService::new(fx.repos.clone(), gateway, CheckoutConfig::default())
    }

    async fn checkout_then_expire(fx: &Fixture) -> String {
        let outcome = fx
            .checkout_service(false)
            .checkout_direct(fx.direct("u1", Category::Cricket))
            .await
            .unwrap();
        let meta = fx.gateway.last_request().unwrap().metadata;
        fx.reconciler()
            .handle_event(GatewayEvent::SessionExpired {
                session_id: outcome.session_id.unwrap(),
                metadata: meta,
            })
            .await
            .unwrap();
        outcome.booking_id
    }

    #[tokio::test]
    async fn failed_booking_reclaims_slot() {
        let fx = Fixture::new().await;
        let booking_id = checkout_then_expire(&fx).await;

        let outcome = retry_service(&fx).retry_payment("u1", &booking_id).await.unwrap();

        assert_eq!(outcome.booking_id, booking_id);
        let booking = fx.booking(&booking_id).await;
        assert_eq!(booking.status(), BookingStatus::Pending);
        assert_eq!(booking.session_id(), outcome.session_id.as_deref());
        assert_eq!(booking.snapshot().amount, 100_000);

        let slot = fx.current_slot().await;
        assert!(slot.is_held_by(&booking_id));
    }

    #[tokio::test]
    async fn failed_booking_cannot_retry_taken_slot() {
        let fx = Fixture::new().await;
        let booking_id = checkout_then_expire(&fx).await;
        fx.checkout_service(false)
            .checkout_direct(fx.direct("u2", Category::Cricket))
            .await
            .unwrap();

        let err = retry_service(&fx).retry_payment("u1", &booking_id).await.unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(fx.booking(&booking_id).await.status(), BookingStatus::Failed);
    }

    #[tokio::test]
    async fn pending_retry_keeps_own_claim_and_expires_old_session() {
        let fx = Fixture::new().await;
        let first = fx
            .checkout_service(false)
            .checkout_direct(fx.direct("u1", Category::Cricket))
            .await
            .unwrap();
        let old_session = first.session_id.clone().unwrap();

        let outcome = retry_service(&fx).retry_payment("u1", &first.booking_id).await.unwrap();

        assert_ne!(outcome.session_id.as_deref(), Some(old_session.as_str()));
        assert_eq!(fx.gateway.expired_ids(), vec![old_session.clone()]);
        assert!(fx.current_slot().await.is_held_by(&first.booking_id));

        // The old session's expiry must not undo the retry.
        fx.reconciler()
            .handle_event(GatewayEvent::SessionExpired {
                session_id: old_session,
                metadata: SessionMetadata::for_booking(&first.booking_id, &fx.slot, None),
            })
            .await
            .unwrap();
        assert_eq!(fx.booking(&first.booking_id).await.status(), BookingStatus::Pending);
        assert_eq!(fx.current_slot().await.status, SlotStatus::Booked);
    }

    #[tokio::test]
    async fn pending_retry_rejects_foreign_claim() {
        let fx = Fixture::new().await;
        let first = fx
            .checkout_service(false)
            .checkout_direct(fx.direct("u1", Category::Cricket))
            .await
            .unwrap();

        // Another booking ends up holding the slot.
        let coordinator = ReservationCoordinator::new(fx.repos.clone());
        coordinator
            .release_slot(&fx.slot.collection_id, &fx.slot.slot_id)
            .await
            .unwrap();
        coordinator
            .claim_slot(&fx.slot.collection_id, &fx.slot.slot_id, Category::Cricket, "other")
            .await
            .unwrap();

        let err = retry_service(&fx).retry_payment("u1", &first.booking_id).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(fx.current_slot().await.is_held_by("other"));
    }

    #[tokio::test]
    async fn paid_and_foreign_bookings_are_rejected() {
        let fx = Fixture::new().await;
        let outcome = fx
            .checkout_service(true)
            .checkout_direct(fx.direct("u1", Category::Cricket))
            .await
            .unwrap();
        let service = retry_service(&fx);

        let err = service.retry_payment("u1", &outcome.booking_id).await.unwrap_err();
        assert!(err.is_conflict());

        let err = service.retry_payment("u2", &outcome.booking_id).await.unwrap_err();
        assert_eq!(err.kind(), "unauthorized");

        let err = service.retry_payment("u1", "missing").await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn gateway_failure_releases_fresh_claim_only() {
        let fx = Fixture::new().await;
        let booking_id = checkout_then_expire(&fx).await;
        fx.gateway.fail_next_create();

        let err = retry_service(&fx).retry_payment("u1", &booking_id).await.unwrap_err();

        assert_eq!(err.kind(), "upstream_failure");
        assert_eq!(fx.current_slot().await.status, SlotStatus::Available);
        assert_eq!(fx.booking(&booking_id).await.status(), BookingStatus::Failed);
    }

    #[tokio::test]
    async fn pending_retry_gateway_failure_keeps_existing_claim() {
        let fx = Fixture::new().await;
        let first = fx
            .checkout_service(false)
            .checkout_direct(fx.direct("u1", Category::Cricket))
            .await
            .unwrap();
        fx.gateway.fail_next_create();

        let err = retry_service(&fx).retry_payment("u1", &first.booking_id).await.unwrap_err();

        assert_eq!(err.kind(), "upstream_failure");
        let slot = fx.current_slot().await;
        assert_eq!(slot.status, SlotStatus::Booked);
        assert_eq!(slot.held_by.as_deref(), Some(first.booking_id.as_str()));
        let booking = fx.booking(&first.booking_id).await;
        assert_eq!(booking.status(), BookingStatus::Pending);
        assert_eq!(booking.session_id(), first.session_id.as_deref());
    }

    #[tokio::test]
    async fn expiry_during_pending_retry_cannot_double_sell() {
        let fx = Fixture::new().await;
        let checkout = fx.checkout_service(false);
        let first = checkout.checkout_direct(fx.direct("u1", Category::Cricket)).await.unwrap();
        let old_session = first.session_id.clone().unwrap();

        let err = racing_retry(&fx, &first.booking_id, &old_session)
            .retry_payment("u1", &first.booking_id)
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        let booking = fx.booking(&first.booking_id).await;
        assert_eq!(booking.status(), BookingStatus::Failed);
        assert_eq!(booking.session_id(), Some(old_session.as_str()));

        // The session opened by the losing retry can never be paid.
        assert_eq!(fx.gateway.created_count(), 2);
        let new_session = fx.gateway.expired_ids().into_iter().find(|id| *id != old_session);
        assert!(new_session.is_some());

        let second = checkout.checkout_direct(fx.direct("u2", Category::Cricket)).await.unwrap();
        assert!(fx.current_slot().await.is_held_by(&second.booking_id));
    }

    #[tokio::test]
    async fn redelivered_expiry_during_failed_retry_keeps_claim() {
        let fx = Fixture::new().await;
        let booking_id = checkout_then_expire(&fx).await;
        let old_session = fx.booking(&booking_id).await.session_id().unwrap().to_string();

        let outcome = racing_retry(&fx, &booking_id, &old_session)
            .retry_payment("u1", &booking_id)
            .await
            .unwrap();

        let booking = fx.booking(&booking_id).await;
        assert_eq!(booking.status(), BookingStatus::Pending);
        assert_eq!(booking.session_id(), outcome.session_id.as_deref());
        assert!(fx.current_slot().await.is_held_by(&booking_id));
    }

    #[tokio::test]
    async fn game_retry_marks_game_full() {
        let fx = Fixture::new().await;
        let game = fx.add_game("host", 10, GameStatus::Open).await;
        let first = fx
            .checkout_service(false)
            .checkout_game("host", &game.id)
            .await
            .unwrap();
        let meta = fx.gateway.last_request().unwrap().metadata;
        fx.reconciler()
            .handle_event(GatewayEvent::SessionExpired {
                session_id: first.session_id.unwrap(),
                metadata: meta,
            })
            .await
            .unwrap();
        assert_eq!(fx.game_status(&game.id).await, GameStatus::Open);

        retry_service(&fx).retry_payment("host", &first.booking_id).await.unwrap();

        assert_eq!(fx.game_status(&game.id).await, GameStatus::Full);
        let meta = fx.gateway.last_request().unwrap().metadata;
        assert_eq!(meta.game_id(), Some(game.id.as_str()));
    }
}
