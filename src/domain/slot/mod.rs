//! Slot aggregate
//!
//! Per sub-venue, per-day collections of bookable time windows.

pub mod category;
pub mod model;
pub mod repository;

pub use category::{Category, PriceMap};
pub use model::{Slot, SlotCollection, SlotStatus, SlotUpdate, SlotWindow};
pub use repository::SlotRepository;
