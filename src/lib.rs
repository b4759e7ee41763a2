//! # Slot Booking Service
//!
//! Venue slot reservation with hosted-checkout payments.
//!
//! ## Architecture
//!
//! - **domain**: slots, bookings, games and sub-venues with their repository traits
//! - **application**: checkout, payment reconciliation, retry, the pending sweeper,
//!   slot catalog and booking queries
//! - **infrastructure**: SeaORM and in-memory storage, the payment gateway client,
//!   webhook signatures, JWT
//! - **interfaces**: REST API with Swagger documentation
//! - **server**: process lifecycle shared by the CLI

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};
pub use infrastructure::database::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};
pub use interfaces::http::create_api_router;
