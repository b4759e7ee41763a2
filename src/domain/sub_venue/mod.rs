//! Sub-venue catalog entries (read-only for this crate)

pub mod model;
pub mod repository;

pub use model::SubVenue;
pub use repository::SubVenueRepository;
