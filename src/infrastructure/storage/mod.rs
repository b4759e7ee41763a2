//! In-process storage, for tests and demo runs without a database

mod memory;

pub use memory::InMemoryRepositoryProvider;
