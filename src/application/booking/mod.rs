//! Slot booking services
//!
//! Checkout, payment reconciliation, retry and the pending sweeper all go
//! through [`ReservationCoordinator`] for slot claims and releases.

pub mod checkout;
pub mod game_sync;
pub mod queries;
pub mod reconciler;
pub mod reservation;
pub mod retry;
pub mod slots;
pub mod sweeper;

#[cfg(test)]
pub(crate) mod testing;

pub use checkout::{CheckoutConfig, CheckoutOutcome, CheckoutService, DirectCheckout};
pub use game_sync::GameSynchronizer;
pub use queries::BookingQueries;
pub use reconciler::PaymentReconciler;
pub use reservation::ReservationCoordinator;
pub use retry::RetryService;
pub use slots::SlotCatalogService;
pub use sweeper::{PendingSweeper, SweepReport, SweeperConfig};
