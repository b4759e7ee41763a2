//! Booking entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub payer_id: String,

    #[sea_orm(nullable)]
    pub game_id: Option<String>,

    // Snapshot, written once at checkout
    pub venue_id: String,
    pub sub_venue_id: String,
    pub collection_id: String,
    pub slot_id: String,
    pub category: String,
    pub latitude: f64,
    pub longitude: f64,
    pub start_at: DateTimeUtc,
    pub end_at: DateTimeUtc,
    /// Currency subunits
    pub amount: i64,
    pub currency: String,

    /// Pending, Paid, Failed, Refunded
    pub status: String,

    #[sea_orm(nullable, unique)]
    pub session_id: Option<String>,

    #[sea_orm(nullable)]
    pub payment_intent_id: Option<String>,

    pub session_opened_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
