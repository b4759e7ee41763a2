//! Slot collection entity: one sub-venue, one calendar date

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "slot_collections")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub sub_venue_id: String,
    pub date: Date,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sub_venue::Entity",
        from = "Column::SubVenueId",
        to = "super::sub_venue::Column::Id"
    )]
    SubVenue,
    #[sea_orm(has_many = "super::slot::Entity")]
    Slots,
}

impl Related<super::sub_venue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubVenue.def()
    }
}

impl Related<super::slot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Slots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
