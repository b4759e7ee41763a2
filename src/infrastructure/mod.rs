//! Infrastructure layer - external concerns

pub mod crypto;
pub mod database;
pub mod payments;
pub mod storage;

pub use database::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};
pub use payments::{HttpGatewayConfig, HttpPaymentGateway, WebhookVerifier};
pub use storage::InMemoryRepositoryProvider;
