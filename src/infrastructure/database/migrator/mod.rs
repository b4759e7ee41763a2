//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20260101_000001_create_sub_venues;
mod m20260101_000002_create_slot_collections;
mod m20260101_000003_create_slots;
mod m20260101_000004_create_games;
mod m20260101_000005_create_bookings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_sub_venues::Migration),
            Box::new(m20260101_000002_create_slot_collections::Migration),
            Box::new(m20260101_000003_create_slots::Migration),
            Box::new(m20260101_000004_create_games::Migration),
            Box::new(m20260101_000005_create_bookings::Migration),
        ]
    }
}
