//! Database entities module

pub mod booking;
pub mod game;
pub mod slot;
pub mod slot_collection;
pub mod sub_venue;

pub use booking::Entity as Booking;
pub use game::Entity as Game;
pub use slot::Entity as Slot;
pub use slot_collection::Entity as SlotCollection;
pub use sub_venue::Entity as SubVenue;
