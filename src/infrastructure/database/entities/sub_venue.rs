//! Sub-venue entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sub_venues")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub venue_id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,

    /// JSON array of category names
    pub categories: String,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::slot_collection::Entity")]
    SlotCollections,
}

impl Related<super::slot_collection::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SlotCollections.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
