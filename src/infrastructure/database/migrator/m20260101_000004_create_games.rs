//! Create games table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Games::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Games::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Games::HostId).string().not_null())
                    .col(ColumnDef::new(Games::SubVenueId).string().not_null())
                    .col(ColumnDef::new(Games::CollectionId).string().not_null())
                    .col(ColumnDef::new(Games::SlotId).string().not_null())
                    .col(ColumnDef::new(Games::Category).string().not_null())
                    .col(
                        ColumnDef::new(Games::MinPlayers)
                            .integer()
                            .not_null()
                            .default(2),
                    )
                    .col(ColumnDef::new(Games::MaxPlayers).integer().not_null())
                    .col(
                        ColumnDef::new(Games::PlayerCount)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Games::Status)
                            .string()
                            .not_null()
                            .default("Open"),
                    )
                    .col(
                        ColumnDef::new(Games::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_games_host")
                    .table(Games::Table)
                    .col(Games::HostId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Games::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Games {
    Table,
    Id,
    HostId,
    SubVenueId,
    CollectionId,
    SlotId,
    Category,
    MinPlayers,
    MaxPlayers,
    PlayerCount,
    Status,
    CreatedAt,
}
