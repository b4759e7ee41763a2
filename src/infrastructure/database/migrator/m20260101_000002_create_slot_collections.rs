//! Create slot_collections table
//!
//! One row per sub-venue and calendar date.

use sea_orm_migration::prelude::*;

use super::m20260101_000001_create_sub_venues::SubVenues;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SlotCollections::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SlotCollections::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SlotCollections::SubVenueId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SlotCollections::Date).date().not_null())
                    .col(
                        ColumnDef::new(SlotCollections::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_slot_collections_sub_venue")
                            .from(SlotCollections::Table, SlotCollections::SubVenueId)
                            .to(SubVenues::Table, SubVenues::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_slot_collections_sub_venue_date")
                    .table(SlotCollections::Table)
                    .col(SlotCollections::SubVenueId)
                    .col(SlotCollections::Date)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SlotCollections::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum SlotCollections {
    Table,
    Id,
    SubVenueId,
    Date,
    CreatedAt,
}
