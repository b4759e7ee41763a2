//! Application ports (hexagonal architecture boundaries)
//!
//! Outbound ports implemented by infrastructure adapters live here.

pub mod outbound;

pub use outbound::{
    CheckoutSession, CreateSessionRequest, GatewayError, GatewayEvent, PaymentGateway,
    SessionMetadata, SessionSnapshot, SessionStatus, SharedPaymentGateway,
};
