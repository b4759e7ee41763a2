//! Slot domain entities

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::category::{Category, PriceMap};
use crate::shared::errors::DomainError;

/// Slot status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    /// Created but not yet offered (unpriced or withheld by the venue)
    Blocked,
    /// Open for claims
    Available,
    /// Claimed by a booking
    Booked,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocked => "blocked",
            Self::Available => "available",
            Self::Booked => "booked",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "available" => Self::Available,
            "booked" => Self::Booked,
            _ => Self::Blocked,
        }
    }
}

impl std::fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A requested time window when creating a day of slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotWindow {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

/// Catalog-side edit of a single slot. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct SlotUpdate {
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub prices: Option<PriceMap>,
    pub status: Option<SlotStatus>,
}

impl SlotUpdate {
    pub fn is_empty(&self) -> bool {
        self.start_at.is_none()
            && self.end_at.is_none()
            && self.prices.is_none()
            && self.status.is_none()
    }
}

/// One bookable time window inside a [`SlotCollection`]
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub id: String,
    pub collection_id: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: SlotStatus,
    pub prices: PriceMap,
    /// Category the current claim was made for
    pub booked_for: Option<Category>,
    /// Booking id owning the current claim
    pub held_by: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Slot {
    pub fn new_blocked(collection_id: impl Into<String>, window: SlotWindow) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            collection_id: collection_id.into(),
            start_at: window.start_at,
            end_at: window.end_at,
            status: SlotStatus::Blocked,
            prices: PriceMap::new(),
            booked_for: None,
            held_by: None,
            updated_at: Utc::now(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == SlotStatus::Available
    }

    pub fn is_held_by(&self, holder: &str) -> bool {
        self.status == SlotStatus::Booked && self.held_by.as_deref() == Some(holder)
    }

    /// Preconditions for a claim: starts in the future and is priced for `category`.
    ///
    /// Status is deliberately not checked here; that is the store's
    /// conditional update.
    pub fn check_claimable(&self, category: Category, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.start_at <= now {
            return Err(DomainError::Validation(
                "Slot has already started or is in the past".to_string(),
            ));
        }
        if !self.prices.contains(category) {
            return Err(DomainError::Validation(format!(
                "Slot has no price for {}",
                category
            )));
        }
        Ok(())
    }

    /// Apply a catalog edit, enforcing the slot invariants.
    pub fn apply_update(&mut self, update: SlotUpdate) -> Result<(), DomainError> {
        if self.status == SlotStatus::Booked {
            if update.start_at.is_some() || update.end_at.is_some() {
                return Err(DomainError::InvariantViolation(
                    "Start and end of a booked slot cannot be modified".to_string(),
                ));
            }
            if !update.is_empty() {
                return Err(DomainError::InvariantViolation(
                    "A booked slot can only be changed by payment reconciliation".to_string(),
                ));
            }
            return Ok(());
        }

        if update.status == Some(SlotStatus::Booked) {
            return Err(DomainError::InvariantViolation(
                "Slots can only become booked through a claim".to_string(),
            ));
        }

        let start_at = update.start_at.unwrap_or(self.start_at);
        let end_at = update.end_at.unwrap_or(self.end_at);
        if start_at >= end_at {
            return Err(DomainError::Validation(
                "Slot start must be before its end".to_string(),
            ));
        }

        let prices = update.prices.unwrap_or_else(|| self.prices.clone());
        let status = update.status.unwrap_or(self.status);
        if status == SlotStatus::Available && prices.is_empty() {
            return Err(DomainError::Validation(
                "A slot needs at least one price before it can be made available".to_string(),
            ));
        }

        self.start_at = start_at;
        self.end_at = end_at;
        self.prices = prices;
        self.status = status;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// All slots of one sub-venue on one calendar date
#[derive(Debug, Clone)]
pub struct SlotCollection {
    pub id: String,
    pub sub_venue_id: String,
    pub date: NaiveDate,
    pub slots: Vec<Slot>,
    pub created_at: DateTime<Utc>,
}

impl SlotCollection {
    /// Create a day's worth of slots, all `blocked`.
    ///
    /// Windows must lie on `date`, have `start < end`, and not overlap.
    pub fn new_blocked_day(
        sub_venue_id: impl Into<String>,
        date: NaiveDate,
        mut windows: Vec<SlotWindow>,
    ) -> Result<Self, DomainError> {
        if windows.is_empty() {
            return Err(DomainError::Validation(
                "At least one slot window is required".to_string(),
            ));
        }

        windows.sort_by_key(|w| w.start_at);
        for w in &windows {
            if w.start_at >= w.end_at {
                return Err(DomainError::Validation(format!(
                    "Slot window {} - {} has start after end",
                    w.start_at, w.end_at
                )));
            }
            if w.start_at.date_naive() != date {
                return Err(DomainError::Validation(format!(
                    "Slot window starting {} is not on {}",
                    w.start_at, date
                )));
            }
        }
        if let Some(pair) = windows.windows(2).find(|p| p[1].start_at < p[0].end_at) {
            return Err(DomainError::Validation(format!(
                "Slot windows overlap at {}",
                pair[1].start_at
            )));
        }

        let id = Uuid::new_v4().to_string();
        let slots = windows
            .into_iter()
            .map(|w| Slot::new_blocked(id.clone(), w))
            .collect();

        Ok(Self {
            id,
            sub_venue_id: sub_venue_id.into(),
            date,
            slots,
            created_at: Utc::now(),
        })
    }

    pub fn find_slot(&self, slot_id: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == slot_id)
    }

    /// Find the element whose window matches exactly.
    pub fn find_by_window(&self, start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Option<&Slot> {
        self.slots
            .iter()
            .find(|s| s.start_at == start_at && s.end_at == end_at)
    }
}

// ── Tests ──────────────────────────────────────────────────────
