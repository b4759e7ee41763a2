//! Checkout: claim a slot, open a payment session, record a Pending booking.
//!
//! Both booking origins (direct and game) share [`CheckoutService::open`].
//! Any failure after the claim releases exactly the slot that was claimed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::game_sync::GameSynchronizer;
use super::reservation::ReservationCoordinator;
use crate::application::ports::{CreateSessionRequest, SessionMetadata, SharedPaymentGateway};
use crate::domain::booking::{Booking, BookingSnapshot, BookingStatus, SlotRef};
use crate::domain::slot::{Category, Slot};
use crate::domain::sub_venue::SubVenue;
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

/// Checkout settings
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// ISO 4217 currency code sent to the gateway
    pub currency: String,
    /// Subunits per major unit (100 for paise/cents)
    pub subunit_factor: u32,
    /// Redirect after successful payment
    pub success_url: String,
    /// Redirect after an abandoned payment
    pub cancel_url: String,
    /// Skip the gateway and mark bookings Paid immediately (demos only)
    pub payment_bypass: bool,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            currency: "inr".to_string(),
            subunit_factor: 100,
            success_url: "http://localhost:3000/bookings/success?session_id={CHECKOUT_SESSION_ID}"
                .to_string(),
            cancel_url: "http://localhost:3000/bookings/cancelled".to_string(),
            payment_bypass: false,
        }
    }
}

/// Direct booking request from a single payer
#[derive(Debug, Clone)]
pub struct DirectCheckout {
    pub payer_id: String,
    pub sub_venue_id: String,
    pub collection_id: String,
    pub slot_id: String,
    pub category: Category,
}

/// Result of a checkout or retry
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub booking_id: String,
    pub session_id: Option<String>,
    /// Where to send the payer next
    pub redirect_url: String,
    pub status: BookingStatus,
}

struct CheckoutRequest<'a> {
    payer_id: &'a str,
    game_id: Option<&'a str>,
    sub_venue: &'a SubVenue,
    slot: SlotRef,
    category: Category,
}

pub struct CheckoutService {
    repos: Arc<dyn RepositoryProvider>,
    gateway: SharedPaymentGateway,
    coordinator: ReservationCoordinator,
    games: GameSynchronizer,
    config: CheckoutConfig,
}

impl CheckoutService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        gateway: SharedPaymentGateway,
        config: CheckoutConfig,
    ) -> Self {
        if config.payment_bypass {
            warn!("Payment bypass is enabled: bookings are marked Paid without a gateway");
        }
        Self {
            coordinator: ReservationCoordinator::new(repos.clone()),
            games: GameSynchronizer::new(repos.clone()),
            repos,
            gateway,
            config,
        }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Book a slot for a single payer.
    pub async fn checkout_direct(&self, request: DirectCheckout) -> DomainResult<CheckoutOutcome> {
        let sub_venue = self
            .repos
            .sub_venues()
            .find_by_id(&request.sub_venue_id)
            .await?
            .ok_or_else(|| DomainError::not_found("SubVenue", "id", &request.sub_venue_id))?;

        if !sub_venue.supports(request.category) {
            return Err(DomainError::Validation(format!(
                "{} is not offered at {}",
                request.category, sub_venue.name
            )));
        }

        let collection = self
            .repos
            .slots()
            .find_collection(&request.collection_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found("SlotCollection", "id", &request.collection_id)
            })?;

        if collection.sub_venue_id != sub_venue.id {
            return Err(DomainError::Validation(
                "Slot does not belong to this sub-venue".to_string(),
            ));
        }

        let slot = collection
            .find_slot(&request.slot_id)
            .ok_or_else(|| DomainError::not_found("Slot", "id", &request.slot_id))?;

        if !slot.prices.contains(request.category) {
            return Err(DomainError::Validation(format!(
                "Slot has no price for {}",
                request.category
            )));
        }

        self.open(CheckoutRequest {
            payer_id: &request.payer_id,
            game_id: None,
            sub_venue: &sub_venue,
            slot: SlotRef::new(&request.collection_id, &request.slot_id),
            category: request.category,
        })
        .await
    }

    /// Book the slot of a hosted game. Only the host may do this.
    pub async fn checkout_game(&self, payer_id: &str, game_id: &str) -> DomainResult<CheckoutOutcome> {
        let game = self
            .repos
            .games()
            .find_by_id(game_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Game", "id", game_id))?;

        if !game.is_hosted_by(payer_id) {
            return Err(DomainError::Unauthorized(
                "Only the host can book this game".to_string(),
            ));
        }
        if game.status.is_terminal() {
            return Err(DomainError::Conflict(format!(
                "Game is already {}",
                game.status
            )));
        }
        if !game.has_min_players() {
            return Err(DomainError::Validation(format!(
                "Game needs at least {} players, has {}",
                game.min_players, game.player_count
            )));
        }
        if self
            .repos
            .bookings()
            .find_active_for_game(game_id)
            .await?
            .is_some()
        {
            return Err(DomainError::Conflict("Game is already booked".to_string()));
        }

        let sub_venue = self
            .repos
            .sub_venues()
            .find_by_id(&game.sub_venue_id)
            .await?
            .ok_or_else(|| DomainError::not_found("SubVenue", "id", &game.sub_venue_id))?;

        let outcome = self
            .open(CheckoutRequest {
                payer_id,
                game_id: Some(game_id),
                sub_venue: &sub_venue,
                slot: game.slot.clone(),
                category: game.category,
            })
            .await?;

        if let Err(e) = self.games.mark_full(game_id).await {
            warn!(game_id, error = %e, "Failed to mark game full after checkout");
        }
        Ok(outcome)
    }

    async fn open(&self, request: CheckoutRequest<'_>) -> DomainResult<CheckoutOutcome> {
        let booking_id = Uuid::new_v4().to_string();

        let slot = self
            .coordinator
            .claim_slot(
                &request.slot.collection_id,
                &request.slot.slot_id,
                request.category,
                &booking_id,
            )
            .await?;

        match self.open_claimed(&request, &booking_id, &slot).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.rollback_claim(&request.slot, &booking_id).await;
                Err(e)
            }
        }
    }

    /// Everything after a successful claim. Errors here trigger rollback.
    async fn open_claimed(
        &self,
        request: &CheckoutRequest<'_>,
        booking_id: &str,
        slot: &Slot,
    ) -> DomainResult<CheckoutOutcome> {
        let amount = slot
            .prices
            .amount_in_subunits(request.category, self.config.subunit_factor)
            .ok_or_else(|| {
                DomainError::Validation(format!("Slot has no price for {}", request.category))
            })?;

        let snapshot = BookingSnapshot {
            venue_id: request.sub_venue.venue_id.clone(),
            sub_venue_id: request.sub_venue.id.clone(),
            slot: request.slot.clone(),
            category: request.category,
            latitude: request.sub_venue.latitude,
            longitude: request.sub_venue.longitude,
            start_at: slot.start_at,
            end_at: slot.end_at,
            amount,
            currency: self.config.currency.clone(),
        };

        if self.config.payment_bypass {
            let booking = Booking::new_paid_without_gateway(
                booking_id,
                request.payer_id,
                request.game_id.map(str::to_string),
                snapshot,
            );
            self.repos.bookings().save(&booking).await?;
            info!(booking_id, amount, "Booking paid via payment bypass");
            return Ok(CheckoutOutcome {
                booking_id: booking_id.to_string(),
                session_id: None,
                redirect_url: self.config.success_url.clone(),
                status: BookingStatus::Paid,
            });
        }

        let session = self
            .gateway
            .create_session(CreateSessionRequest {
                amount,
                currency: self.config.currency.clone(),
                label: line_item_label(request.sub_venue, request.category, slot),
                client_reference_id: booking_id.to_string(),
                metadata: SessionMetadata::for_booking(booking_id, &request.slot, request.game_id),
                success_url: self.config.success_url.clone(),
                cancel_url: self.config.cancel_url.clone(),
            })
            .await
            .map_err(|e| {
                warn!(booking_id, error = %e, "Payment session creation failed");
                DomainError::from(e)
            })?;

        let booking = Booking::new_pending(
            booking_id,
            request.payer_id,
            request.game_id.map(str::to_string),
            snapshot,
            &session.id,
        );

        if let Err(e) = self.repos.bookings().save(&booking).await {
            error!(booking_id, session_id = %session.id, error = %e, "Failed to persist booking");
            if let Err(expire_err) = self.gateway.expire_session(&session.id).await {
                warn!(session_id = %session.id, error = %expire_err, "Could not expire orphaned session");
            }
            return Err(e);
        }

        info!(
            booking_id,
            session_id = %session.id,
            payer_id = request.payer_id,
            game_id = request.game_id,
            amount,
            "Checkout opened"
        );

        Ok(CheckoutOutcome {
            booking_id: booking_id.to_string(),
            session_id: Some(session.id),
            redirect_url: session.url,
            status: BookingStatus::Pending,
        })
    }

    async fn rollback_claim(&self, slot: &SlotRef, booking_id: &str) {
        if let Err(e) = self
            .coordinator
            .release_slot(&slot.collection_id, &slot.slot_id)
            .await
        {
            error!(booking_id, error = %e, "Rollback failed to release slot");
        }
        // A save may have committed before reporting failure.
        if let Err(e) = self.repos.bookings().delete(booking_id).await {
            error!(booking_id, error = %e, "Rollback failed to delete booking");
        }
    }
}

fn line_item_label(sub_venue: &SubVenue, category: Category, slot: &Slot) -> String {
    session_label(&sub_venue.name, category, slot.start_at, slot.end_at)
}

pub(crate) fn session_label(
    place: &str,
    category: Category,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
) -> String {
    format!(
        "{} at {}, {} {}-{} UTC",
        category,
        place,
        start_at.format("%Y-%m-%d"),
        start_at.format("%H:%M"),
        end_at.format("%H:%M"),
    )
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::booking::testing::Fixture;
    use crate::domain::game::GameStatus;
    use crate::domain::slot::SlotStatus;

    #[tokio::test]
    async fn direct_checkout_claims_and_records_pending() {
        let fx = Fixture::new().await;
        let checkout = fx.checkout_service(false);

        let outcome = checkout.checkout_direct(fx.direct("u1", Category::Cricket)).await.unwrap();

        assert_eq!(outcome.status, BookingStatus::Pending);
        assert!(outcome.redirect_url.starts_with("https://pay.test/"));

        let booking = fx.booking(&outcome.booking_id).await;
        assert_eq!(booking.status(), BookingStatus::Pending);
        assert_eq!(booking.snapshot().amount, 100_000);
        assert_eq!(booking.session_id(), outcome.session_id.as_deref());

        let slot = fx.current_slot().await;
        assert_eq!(slot.status, SlotStatus::Booked);
        assert_eq!(slot.booked_for, Some(Category::Cricket));
        assert_eq!(slot.held_by.as_deref(), Some(outcome.booking_id.as_str()));

        let request = fx.gateway.last_request().unwrap();
        assert_eq!(request.amount, 100_000);
        assert_eq!(request.metadata.booking_id(), Some(outcome.booking_id.as_str()));
        assert_eq!(request.metadata.slot_ref(), Some(fx.slot.clone()));
    }

    #[tokio::test]
    async fn gateway_failure_rolls_back_claim() {
        let fx = Fixture::new().await;
        let checkout = fx.checkout_service(false);
        fx.gateway.fail_next_create();

        let err = checkout
            .checkout_direct(fx.direct("u1", Category::Cricket))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "upstream_failure");

        let slot = fx.current_slot().await;
        assert_eq!(slot.status, SlotStatus::Available);
        assert!(slot.booked_for.is_none());
        assert!(fx.repos.bookings().find_for_payer("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn persist_failure_expires_session_and_releases_claim() {
        let fx = Fixture::new().await;
        let checkout = CheckoutService::new(
            fx.lost_ack_repos(),
            fx.gateway.clone(),
            CheckoutConfig::default(),
        );

        let err = checkout
            .checkout_direct(fx.direct("u1", Category::Cricket))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "storage");

        let slot = fx.current_slot().await;
        assert_eq!(slot.status, SlotStatus::Available);
        assert!(slot.booked_for.is_none());
        assert!(slot.held_by.is_none());

        assert_eq!(fx.gateway.created_count(), 1);
        assert_eq!(fx.gateway.expired_ids(), vec!["cs_test_1".to_string()]);
        // The save committed before failing; rollback removed it.
        assert!(fx.repos.bookings().find_for_payer("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lost_race_creates_no_session() {
        let fx = Fixture::new().await;
        let checkout = fx.checkout_service(false);

        checkout.checkout_direct(fx.direct("u1", Category::Cricket)).await.unwrap();
        let err = checkout
            .checkout_direct(fx.direct("u2", Category::Cricket))
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(fx.gateway.created_count(), 1);
        assert!(fx.repos.bookings().find_for_payer("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsupported_category_is_rejected() {
        let fx = Fixture::new().await;
        let checkout = fx.checkout_service(false);

        let err = checkout
            .checkout_direct(fx.direct("u1", Category::Tennis))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(fx.current_slot().await.status, SlotStatus::Available);
    }

    #[tokio::test]
    async fn game_checkout_requires_host() {
        let fx = Fixture::new().await;
        let game = fx.add_game("host", 10, GameStatus::Open).await;
        let checkout = fx.checkout_service(false);

        let err = checkout.checkout_game("someone-else", &game.id).await.unwrap_err();
        assert_eq!(err.kind(), "unauthorized");
    }

    #[tokio::test]
    async fn game_checkout_requires_min_players() {
        let fx = Fixture::new().await;
        let game = fx.add_game("host", 2, GameStatus::Open).await;
        let checkout = fx.checkout_service(false);

        let err = checkout.checkout_game("host", &game.id).await.unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(fx.current_slot().await.status, SlotStatus::Available);
    }

    #[tokio::test]
    async fn game_checkout_carries_game_id_and_fills_game() {
        let fx = Fixture::new().await;
        let game = fx.add_game("host", 10, GameStatus::Open).await;
        let checkout = fx.checkout_service(false);

        let outcome = checkout.checkout_game("host", &game.id).await.unwrap();

        let request = fx.gateway.last_request().unwrap();
        assert_eq!(request.metadata.game_id(), Some(game.id.as_str()));
        assert_eq!(fx.game_status(&game.id).await, GameStatus::Full);

        let booking = fx.booking(&outcome.booking_id).await;
        assert_eq!(booking.game_id.as_deref(), Some(game.id.as_str()));

        let err = checkout.checkout_game("host", &game.id).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn bypass_marks_paid_without_gateway() {
        let fx = Fixture::new().await;
        let game = fx.add_game("host", 10, GameStatus::Open).await;
        let checkout = fx.checkout_service(true);

        let outcome = checkout.checkout_game("host", &game.id).await.unwrap();

        assert_eq!(outcome.status, BookingStatus::Paid);
        assert_eq!(fx.gateway.created_count(), 0);
        assert!(fx.booking(&outcome.booking_id).await.is_paid());
        assert_eq!(fx.current_slot().await.status, SlotStatus::Booked);
        assert_eq!(fx.game_status(&game.id).await, GameStatus::Full);
    }
}
