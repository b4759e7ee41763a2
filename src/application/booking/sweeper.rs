//! Background sweeper for stale Pending bookings.
//!
//! Covers lost webhooks: every `interval_secs` it asks the gateway about
//! sessions opened more than `stale_after_secs` ago and drives them to a
//! final state.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::reconciler::PaymentReconciler;
use crate::application::ports::{SessionStatus, SharedPaymentGateway};
use crate::domain::booking::Booking;
use crate::domain::{DomainResult, RepositoryProvider};
use crate::shared::shutdown::ShutdownSignal;

#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub interval_secs: u64,
    pub stale_after_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            stale_after_secs: 600,
        }
    }
}

/// Outcome counters of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    /// Open sessions told to expire; their webhook finishes the repair
    pub expired_at_gateway: usize,
    /// Already-expired sessions repaired inline
    pub repaired: usize,
    /// Completed sessions whose webhook was lost
    pub completed: usize,
    pub errors: usize,
}

enum SweepAction {
    ExpiredAtGateway,
    Repaired,
    Completed,
}

pub struct PendingSweeper {
    repos: Arc<dyn RepositoryProvider>,
    gateway: SharedPaymentGateway,
    reconciler: Arc<PaymentReconciler>,
    config: SweeperConfig,
}

impl PendingSweeper {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        gateway: SharedPaymentGateway,
        reconciler: Arc<PaymentReconciler>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            repos,
            gateway,
            reconciler,
            config,
        }
    }

    /// Spawn the sweep loop. It stops when `shutdown` is triggered.
    pub fn start(self: Arc<Self>, shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                interval = self.config.interval_secs,
                stale_after = self.config.stale_after_secs,
                "🧹 Pending booking sweeper started"
            );

            let mut interval = tokio::time::interval(Duration::from_secs(self.config.interval_secs));

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match self.sweep_once().await {
                            Ok(report) if report.examined > 0 => {
                                info!(?report, "Pending booking sweep finished");
                            }
                            Ok(_) => {}
                            Err(e) => warn!(error = %e, "Pending booking sweep error"),
                        }
                    }
                    _ = shutdown.notified().wait() => {
                        info!("🧹 Pending booking sweeper shutting down");
                        break;
                    }
                }
            }

            info!("🧹 Pending booking sweeper stopped");
        })
    }

    /// One pass over stale Pending bookings. Per-booking failures are
    /// counted and skipped.
    pub async fn sweep_once(&self) -> DomainResult<SweepReport> {
        metrics::counter!("pending_sweep_runs_total").increment(1);

        let cutoff = Utc::now() - chrono::Duration::seconds(self.config.stale_after_secs as i64);
        let stale = self.repos.bookings().find_stale_pending(cutoff).await?;

        let mut report = SweepReport {
            examined: stale.len(),
            ..SweepReport::default()
        };

        for booking in stale {
            let booking_id = booking.id.clone();
            match self.sweep_booking(booking).await {
                Ok(Some(SweepAction::ExpiredAtGateway)) => report.expired_at_gateway += 1,
                Ok(Some(SweepAction::Repaired)) => report.repaired += 1,
                Ok(Some(SweepAction::Completed)) => report.completed += 1,
                Ok(None) => {}
                Err(e) => {
                    report.errors += 1;
                    warn!(booking_id = %booking_id, error = %e, "Failed to sweep booking");
                }
            }
        }

        Ok(report)
    }

    async fn sweep_booking(&self, booking: Booking) -> DomainResult<Option<SweepAction>> {
        let Some(session_id) = booking.session_id().map(str::to_string) else {
            return Ok(None);
        };

        let session = self.gateway.retrieve_session(&session_id).await?;
        match session.status {
            SessionStatus::Open => {
                self.gateway.expire_session(&session_id).await?;
                debug!(booking_id = %booking.id, session_id = %session_id, "Expired stale session");
                Ok(Some(SweepAction::ExpiredAtGateway))
            }
            SessionStatus::Expired => {
                self.reconciler
                    .fail_and_release(Some(booking), &session.metadata)
                    .await?;
                Ok(Some(SweepAction::Repaired))
            }
            SessionStatus::Complete => {
                self.reconciler
                    .settle_paid(booking, session.payment_intent_id)
                    .await?;
                Ok(Some(SweepAction::Completed))
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::booking::checkout::DirectCheckout;
    use crate::application::booking::testing::Fixture;
    use crate::domain::booking::BookingStatus;
    use crate::domain::game::GameStatus;
    use crate::domain::slot::{Category, SlotStatus};

    fn sweeper(fx: &Fixture) -> PendingSweeper {
        PendingSweeper::new(
            fx.repos.clone(),
            fx.gateway.clone(),
            Arc::new(fx.reconciler()),
            SweeperConfig {
                interval_secs: 1,
                stale_after_secs: 0,
            },
        )
    }

    #[tokio::test]
    async fn expired_session_converges_to_failed() {
        let fx = Fixture::new().await;
        let game = fx.add_game("host", 10, GameStatus::Open).await;
        let outcome = fx
            .checkout_service(false)
            .checkout_game("host", &game.id)
            .await
            .unwrap();
        fx.gateway
            .set_status(outcome.session_id.as_deref().unwrap(), SessionStatus::Expired);

        let report = sweeper(&fx).sweep_once().await.unwrap();

        assert_eq!(report.examined, 1);
        assert_eq!(report.repaired, 1);
        assert_eq!(fx.booking(&outcome.booking_id).await.status(), BookingStatus::Failed);
        assert_eq!(fx.current_slot().await.status, SlotStatus::Available);
        assert_eq!(fx.game_status(&game.id).await, GameStatus::Open);

        let report = sweeper(&fx).sweep_once().await.unwrap();
        assert_eq!(report.examined, 0);
    }

    #[tokio::test]
    async fn open_session_is_expired_at_gateway() {
        let fx = Fixture::new().await;
        let outcome = fx
            .checkout_service(false)
            .checkout_direct(fx.direct("u1", Category::Cricket))
            .await
            .unwrap();

        let report = sweeper(&fx).sweep_once().await.unwrap();

        assert_eq!(report.expired_at_gateway, 1);
        assert_eq!(fx.gateway.expired_ids(), vec![outcome.session_id.unwrap()]);
        // The repair waits for the expired notification.
        assert_eq!(fx.booking(&outcome.booking_id).await.status(), BookingStatus::Pending);
    }

    #[tokio::test]
    async fn lost_success_webhook_is_recovered() {
        let fx = Fixture::new().await;
        let outcome = fx
            .checkout_service(false)
            .checkout_direct(fx.direct("u1", Category::Cricket))
            .await
            .unwrap();
        fx.gateway.complete(outcome.session_id.as_deref().unwrap(), "pi_late");

        let report = sweeper(&fx).sweep_once().await.unwrap();

        assert_eq!(report.completed, 1);
        let booking = fx.booking(&outcome.booking_id).await;
        assert!(booking.is_paid());
        assert_eq!(booking.payment_intent_id(), Some("pi_late"));
    }

    #[tokio::test]
    async fn gateway_errors_are_counted_not_fatal() {
        let fx = Fixture::new().await;
        fx.checkout_service(false)
            .checkout_direct(fx.direct("u1", Category::Cricket))
            .await
            .unwrap();
        fx.gateway.fail_retrieve(true);

        let report = sweeper(&fx).sweep_once().await.unwrap();
        assert_eq!(report.errors, 1);
    }

    #[tokio::test]
    async fn one_failing_booking_does_not_block_the_rest() {
        let fx = Fixture::new().await;
        let checkout = fx.checkout_service(false);
        let stuck = checkout
            .checkout_direct(fx.direct("u1", Category::Cricket))
            .await
            .unwrap();

        let other_slot = fx.add_slot(3).await;
        let lapsed = checkout
            .checkout_direct(DirectCheckout {
                collection_id: other_slot.collection_id.clone(),
                slot_id: other_slot.slot_id.clone(),
                ..fx.direct("u2", Category::Cricket)
            })
            .await
            .unwrap();

        fx.gateway.fail_retrieve_of(stuck.session_id.as_deref().unwrap());
        fx.gateway
            .set_status(lapsed.session_id.as_deref().unwrap(), SessionStatus::Expired);

        let report = sweeper(&fx).sweep_once().await.unwrap();

        assert_eq!(report.examined, 2);
        assert_eq!(report.errors, 1);
        assert_eq!(report.repaired, 1);
        assert_eq!(fx.booking(&stuck.booking_id).await.status(), BookingStatus::Pending);
        assert_eq!(fx.booking(&lapsed.booking_id).await.status(), BookingStatus::Failed);

        let freed = fx
            .repos
            .slots()
            .find_slot(&other_slot.collection_id, &other_slot.slot_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(freed.status, SlotStatus::Available);
        assert!(freed.held_by.is_none());
        assert_eq!(fx.current_slot().await.status, SlotStatus::Booked);
    }

    #[tokio::test]
    async fn loop_stops_on_shutdown() {
        let fx = Fixture::new().await;
        let shutdown = ShutdownSignal::new();
        let handle = Arc::new(sweeper(&fx)).start(shutdown.clone());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
