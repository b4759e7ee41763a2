//! Create slots table
//!
//! Element rows of a slot collection. Claims are conditional updates on
//! `status`, so it is indexed together with the primary key lookup.

use sea_orm_migration::prelude::*;

use super::m20260101_000002_create_slot_collections::SlotCollections;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Slots::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Slots::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Slots::CollectionId).string().not_null())
                    .col(
                        ColumnDef::new(Slots::StartAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Slots::EndAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Slots::Status)
                            .string()
                            .not_null()
                            .default("blocked"),
                    )
                    .col(
                        ColumnDef::new(Slots::Prices)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(ColumnDef::new(Slots::BookedFor).string())
                    .col(ColumnDef::new(Slots::HeldBy).string())
                    .col(
                        ColumnDef::new(Slots::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_slots_collection")
                            .from(Slots::Table, Slots::CollectionId)
                            .to(SlotCollections::Table, SlotCollections::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_slots_collection_start")
                    .table(Slots::Table)
                    .col(Slots::CollectionId)
                    .col(Slots::StartAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Slots::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Slots {
    Table,
    Id,
    CollectionId,
    StartAt,
    EndAt,
    Status,
    Prices,
    BookedFor,
    HeldBy,
    UpdatedAt,
}
