//! Slot entity: one element of a slot collection

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "slots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub collection_id: String,
    pub start_at: DateTimeUtc,
    pub end_at: DateTimeUtc,

    /// blocked, available, booked
    pub status: String,

    /// JSON object of category -> price
    pub prices: String,

    #[sea_orm(nullable)]
    pub booked_for: Option<String>,

    /// Booking id owning the claim
    #[sea_orm(nullable)]
    pub held_by: Option<String>,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::slot_collection::Entity",
        from = "Column::CollectionId",
        to = "super::slot_collection::Column::Id"
    )]
    SlotCollection,
}

impl Related<super::slot_collection::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SlotCollection.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
