//! Feature modules: one directory per API area with its DTOs and handlers

pub mod bookings;
pub mod health;
pub mod metrics;
pub mod request_id;
pub mod slots;
pub mod webhooks;
