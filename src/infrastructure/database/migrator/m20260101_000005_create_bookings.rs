//! Create bookings table
//!
//! A session id identifies at most one booking, enforced by a unique index.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Bookings::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Bookings::PayerId).string().not_null())
                    .col(ColumnDef::new(Bookings::GameId).string())
                    .col(ColumnDef::new(Bookings::VenueId).string().not_null())
                    .col(ColumnDef::new(Bookings::SubVenueId).string().not_null())
                    .col(ColumnDef::new(Bookings::CollectionId).string().not_null())
                    .col(ColumnDef::new(Bookings::SlotId).string().not_null())
                    .col(ColumnDef::new(Bookings::Category).string().not_null())
                    .col(ColumnDef::new(Bookings::Latitude).double().not_null())
                    .col(ColumnDef::new(Bookings::Longitude).double().not_null())
                    .col(
                        ColumnDef::new(Bookings::StartAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::EndAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Bookings::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Bookings::Currency).string().not_null())
                    .col(
                        ColumnDef::new(Bookings::Status)
                            .string()
                            .not_null()
                            .default("Pending"),
                    )
                    .col(ColumnDef::new(Bookings::SessionId).string())
                    .col(ColumnDef::new(Bookings::PaymentIntentId).string())
                    .col(
                        ColumnDef::new(Bookings::SessionOpenedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_session_id")
                    .table(Bookings::Table)
                    .col(Bookings::SessionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_payer")
                    .table(Bookings::Table)
                    .col(Bookings::PayerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_status_opened")
                    .table(Bookings::Table)
                    .col(Bookings::Status)
                    .col(Bookings::SessionOpenedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Bookings {
    Table,
    Id,
    PayerId,
    GameId,
    VenueId,
    SubVenueId,
    CollectionId,
    SlotId,
    Category,
    Latitude,
    Longitude,
    StartAt,
    EndAt,
    Amount,
    Currency,
    Status,
    SessionId,
    PaymentIntentId,
    SessionOpenedAt,
    CreatedAt,
    UpdatedAt,
}
