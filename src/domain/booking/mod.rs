//! Booking aggregate
//!
//! The financial record of one payer's attempt to pay for one claimed slot.

pub mod model;
pub mod repository;

pub use model::{Booking, BookingParts, BookingSnapshot, BookingStatus, SlotRef};
pub use repository::BookingRepository;
