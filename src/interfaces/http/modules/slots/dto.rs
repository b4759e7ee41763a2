//! Slot catalog DTOs

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::slot::{Category, PriceMap, Slot, SlotCollection, SlotStatus, SlotUpdate, SlotWindow};
use crate::shared::errors::DomainError;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SlotDayQuery {
    /// Calendar date (YYYY-MM-DD)
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SlotWindowDto {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

/// Create one day of slots for a sub-venue. All slots start blocked.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSlotDayRequest {
    pub date: NaiveDate,
    #[validate(length(min = 1, max = 96, message = "must contain between 1 and 96 windows"))]
    pub slots: Vec<SlotWindowDto>,
}

impl CreateSlotDayRequest {
    pub fn windows(&self) -> Vec<SlotWindow> {
        self.slots
            .iter()
            .map(|w| SlotWindow {
                start_at: w.start_at,
                end_at: w.end_at,
            })
            .collect()
    }
}

/// Partial edit of one slot. Omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSlotRequest {
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    /// Price per category in major currency units, e.g. `{"Cricket": 1000}`
    #[schema(value_type = Option<Object>)]
    pub prices: Option<BTreeMap<Category, Decimal>>,
    /// `blocked` or `available`
    pub status: Option<String>,
}

impl UpdateSlotRequest {
    pub fn into_update(self) -> Result<SlotUpdate, DomainError> {
        let status = match self.status.as_deref() {
            None => None,
            Some("blocked") => Some(SlotStatus::Blocked),
            Some("available") => Some(SlotStatus::Available),
            Some("booked") => Some(SlotStatus::Booked),
            Some(other) => {
                return Err(DomainError::Validation(format!(
                    "Unknown slot status: {}",
                    other
                )))
            }
        };
        let prices = self.prices.map(PriceMap::try_from_iter).transpose()?;

        Ok(SlotUpdate {
            start_at: self.start_at,
            end_at: self.end_at,
            prices,
            status,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SlotDto {
    pub id: String,
    pub collection_id: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: String,
    #[schema(value_type = Object)]
    pub prices: PriceMap,
    /// Category of the current claim, if booked
    pub booked_for: Option<Category>,
}

impl From<&Slot> for SlotDto {
    fn from(s: &Slot) -> Self {
        Self {
            id: s.id.clone(),
            collection_id: s.collection_id.clone(),
            start_at: s.start_at,
            end_at: s.end_at,
            status: s.status.to_string(),
            prices: s.prices.clone(),
            booked_for: s.booked_for,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SlotCollectionDto {
    pub id: String,
    pub sub_venue_id: String,
    pub date: NaiveDate,
    pub slots: Vec<SlotDto>,
}

impl From<&SlotCollection> for SlotCollectionDto {
    fn from(c: &SlotCollection) -> Self {
        Self {
            id: c.id.clone(),
            sub_venue_id: c.sub_venue_id.clone(),
            date: c.date,
            slots: c.slots.iter().map(SlotDto::from).collect(),
        }
    }
}
