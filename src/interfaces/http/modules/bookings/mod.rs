//! Booking checkout, retry, verification and lookup endpoints

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
