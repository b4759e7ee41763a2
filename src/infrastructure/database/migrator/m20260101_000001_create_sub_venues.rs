//! Create sub_venues table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SubVenues::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SubVenues::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SubVenues::VenueId).string().not_null())
                    .col(ColumnDef::new(SubVenues::Name).string().not_null())
                    .col(ColumnDef::new(SubVenues::Latitude).double().not_null())
                    .col(ColumnDef::new(SubVenues::Longitude).double().not_null())
                    .col(
                        ColumnDef::new(SubVenues::Categories)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(SubVenues::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SubVenues::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum SubVenues {
    Table,
    Id,
    VenueId,
    Name,
    Latitude,
    Longitude,
    Categories,
    CreatedAt,
}
