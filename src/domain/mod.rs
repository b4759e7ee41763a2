//! Domain layer: aggregates, value types and repository interfaces.

pub mod booking;
pub mod game;
pub mod repositories;
pub mod slot;
pub mod sub_venue;

pub use booking::{Booking, BookingRepository, BookingStatus, SlotRef};
pub use game::{Game, GameRepository, GameStatus};
pub use repositories::{DomainResult, RepositoryProvider};
pub use slot::{Category, PriceMap, Slot, SlotCollection, SlotRepository, SlotStatus};
pub use sub_venue::{SubVenue, SubVenueRepository};

pub use crate::shared::errors::DomainError;
