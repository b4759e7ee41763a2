//! Game aggregate
//!
//! Host-created group bookings. Owned by the games component; this crate
//! reads them and writes only their status.

pub mod model;
pub mod repository;

pub use model::{Game, GameStatus};
pub use repository::GameRepository;
