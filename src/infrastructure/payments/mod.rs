//! Payment gateway adapter: HTTP client, webhook parsing, signatures

pub mod events;
pub mod http_gateway;
pub mod signature;

pub use events::parse_event;
pub use http_gateway::{HttpGatewayConfig, HttpPaymentGateway};
pub use signature::{SignatureError, WebhookVerifier, SIGNATURE_HEADER};
