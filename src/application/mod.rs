pub mod booking;
pub mod ports;

// Re-export key types for convenience
pub use booking::{
    BookingQueries, CheckoutConfig, CheckoutOutcome, CheckoutService, DirectCheckout,
    PaymentReconciler, PendingSweeper, RetryService, SlotCatalogService, SweepReport,
    SweeperConfig,
};
pub use ports::{GatewayEvent, PaymentGateway, SharedPaymentGateway};
