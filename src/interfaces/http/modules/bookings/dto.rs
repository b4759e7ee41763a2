//! Booking DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::application::CheckoutOutcome;
use crate::domain::booking::Booking;
use crate::domain::slot::Category;

/// Book a single slot directly
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DirectCheckoutRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub sub_venue_id: String,
    #[validate(length(min = 1, message = "is required"))]
    pub collection_id: String,
    #[validate(length(min = 1, message = "is required"))]
    pub slot_id: String,
    pub category: Category,
}

/// Where to send the payer after checkout or retry
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub booking_id: String,
    /// Gateway session id; absent when payments are bypassed
    pub session_id: Option<String>,
    pub redirect_url: String,
    pub status: String,
}

impl From<CheckoutOutcome> for CheckoutResponse {
    fn from(outcome: CheckoutOutcome) -> Self {
        Self {
            booking_id: outcome.booking_id,
            session_id: outcome.session_id,
            redirect_url: outcome.redirect_url,
            status: outcome.status.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyQuery {
    /// Checkout session id from the success redirect
    pub session_id: String,
}

/// Booking details in API responses
#[derive(Debug, Serialize, ToSchema)]
pub struct BookingDto {
    pub id: String,
    pub payer_id: String,
    pub game_id: Option<String>,
    pub status: String,
    pub venue_id: String,
    pub sub_venue_id: String,
    pub collection_id: String,
    pub slot_id: String,
    pub category: Category,
    pub latitude: f64,
    pub longitude: f64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// Amount in currency subunits
    pub amount: i64,
    pub currency: String,
    pub session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Booking> for BookingDto {
    fn from(b: &Booking) -> Self {
        let s = b.snapshot();
        Self {
            id: b.id.clone(),
            payer_id: b.payer_id.clone(),
            game_id: b.game_id.clone(),
            status: b.status().to_string(),
            venue_id: s.venue_id.clone(),
            sub_venue_id: s.sub_venue_id.clone(),
            collection_id: s.slot.collection_id.clone(),
            slot_id: s.slot.slot_id.clone(),
            category: s.category,
            latitude: s.latitude,
            longitude: s.longitude,
            start_at: s.start_at,
            end_at: s.end_at,
            amount: s.amount,
            currency: s.currency.clone(),
            session_id: b.session_id().map(String::from),
            payment_intent_id: b.payment_intent_id().map(String::from),
            created_at: b.created_at,
            updated_at: b.updated_at(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CalendarLinkResponse {
    pub url: String,
}
