//! Payment gateway webhook endpoint

pub mod handlers;

pub use handlers::*;
