//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod booking_repository;
pub mod game_repository;
pub mod repository_provider;
pub mod slot_repository;
pub mod sub_venue_repository;

pub use repository_provider::SeaOrmRepositoryProvider;
