//! Booking domain entity

use chrono::{DateTime, Utc};

use crate::domain::slot::Category;
use crate::shared::errors::DomainError;

/// Booking financial status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    /// Payment session open, slot claimed
    Pending,
    /// Payment confirmed by the gateway
    Paid,
    /// Payment session expired or declined
    Failed,
    /// Refunded out of band
    Refunded,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
            Self::Failed => "Failed",
            Self::Refunded => "Refunded",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Paid" => Self::Paid,
            "Failed" => Self::Failed,
            "Refunded" => Self::Refunded,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to one slot element: collection id + element id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRef {
    pub collection_id: String,
    pub slot_id: String,
}

impl SlotRef {
    pub fn new(collection_id: impl Into<String>, slot_id: impl Into<String>) -> Self {
        Self {
            collection_id: collection_id.into(),
            slot_id: slot_id.into(),
        }
    }
}

/// What was booked, captured at checkout and never revised.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingSnapshot {
    pub venue_id: String,
    pub sub_venue_id: String,
    pub slot: SlotRef,
    pub category: Category,
    pub latitude: f64,
    pub longitude: f64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// Amount in currency subunits
    pub amount: i64,
    /// ISO 4217 code, lower case
    pub currency: String,
}

/// Raw persisted state, used by repositories to rebuild a [`Booking`].
#[derive(Debug, Clone)]
pub struct BookingParts {
    pub id: String,
    pub payer_id: String,
    pub game_id: Option<String>,
    pub snapshot: BookingSnapshot,
    pub status: BookingStatus,
    pub session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub session_opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A payer's booking of one slot.
///
/// The snapshot is only reachable by shared reference. Status and gateway
/// ids change only through the transition methods.
#[derive(Debug, Clone)]
pub struct Booking {
    pub id: String,
    pub payer_id: String,
    pub game_id: Option<String>,
    pub created_at: DateTime<Utc>,
    snapshot: BookingSnapshot,
    status: BookingStatus,
    session_id: Option<String>,
    payment_intent_id: Option<String>,
    session_opened_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Booking {
    /// A booking waiting on gateway session `session_id`.
    pub fn new_pending(
        id: impl Into<String>,
        payer_id: impl Into<String>,
        game_id: Option<String>,
        snapshot: BookingSnapshot,
        session_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            payer_id: payer_id.into(),
            game_id,
            created_at: now,
            snapshot,
            status: BookingStatus::Pending,
            session_id: Some(session_id.into()),
            payment_intent_id: None,
            session_opened_at: now,
            updated_at: now,
        }
    }

    /// A booking settled without a gateway (payment bypass mode).
    pub fn new_paid_without_gateway(
        id: impl Into<String>,
        payer_id: impl Into<String>,
        game_id: Option<String>,
        snapshot: BookingSnapshot,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            payer_id: payer_id.into(),
            game_id,
            created_at: now,
            snapshot,
            status: BookingStatus::Paid,
            session_id: None,
            payment_intent_id: None,
            session_opened_at: now,
            updated_at: now,
        }
    }

    pub fn restore(parts: BookingParts) -> Self {
        Self {
            id: parts.id,
            payer_id: parts.payer_id,
            game_id: parts.game_id,
            created_at: parts.created_at,
            snapshot: parts.snapshot,
            status: parts.status,
            session_id: parts.session_id,
            payment_intent_id: parts.payment_intent_id,
            session_opened_at: parts.session_opened_at,
            updated_at: parts.updated_at,
        }
    }

    pub fn snapshot(&self) -> &BookingSnapshot {
        &self.snapshot
    }

    pub fn status(&self) -> BookingStatus {
        self.status
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn payment_intent_id(&self) -> Option<&str> {
        self.payment_intent_id.as_deref()
    }

    pub fn session_opened_at(&self) -> DateTime<Utc> {
        self.session_opened_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_owned_by(&self, payer_id: &str) -> bool {
        self.payer_id == payer_id
    }

    pub fn is_paid(&self) -> bool {
        self.status == BookingStatus::Paid
    }

    /// Whether the payer may re-attempt payment.
    pub fn is_retryable(&self) -> bool {
        matches!(self.status, BookingStatus::Pending | BookingStatus::Failed)
    }

    /// Record a confirmed payment. Returns `false` if already paid.
    pub fn mark_paid(&mut self, payment_intent_id: Option<String>) -> Result<bool, DomainError> {
        match self.status {
            BookingStatus::Paid => Ok(false),
            BookingStatus::Refunded => Err(DomainError::InvariantViolation(format!(
                "Booking {} was refunded and cannot be paid again",
                self.id
            ))),
            BookingStatus::Pending | BookingStatus::Failed => {
                self.status = BookingStatus::Paid;
                if payment_intent_id.is_some() {
                    self.payment_intent_id = payment_intent_id;
                }
                self.updated_at = Utc::now();
                Ok(true)
            }
        }
    }

    /// Record an expired or declined payment. Returns `false` if already failed.
    pub fn mark_failed(&mut self) -> Result<bool, DomainError> {
        match self.status {
            BookingStatus::Failed => Ok(false),
            BookingStatus::Pending => {
                self.status = BookingStatus::Failed;
                self.updated_at = Utc::now();
                Ok(true)
            }
            BookingStatus::Paid | BookingStatus::Refunded => {
                Err(DomainError::InvariantViolation(format!(
                    "Booking {} is {} and cannot fail",
                    self.id, self.status
                )))
            }
        }
    }

    /// Point the booking at a fresh gateway session and make it Pending again.
    pub fn restart_payment(&mut self, session_id: impl Into<String>) -> Result<(), DomainError> {
        if !self.is_retryable() {
            return Err(DomainError::Validation(format!(
                "Invalid status for retry: {}",
                self.status
            )));
        }
        let now = Utc::now();
        self.session_id = Some(session_id.into());
        self.status = BookingStatus::Pending;
        self.session_opened_at = now;
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_refunded(&mut self) -> Result<(), DomainError> {
        if self.status != BookingStatus::Paid {
            return Err(DomainError::InvariantViolation(format!(
                "Only paid bookings can be refunded (booking {} is {})",
                self.id, self.status
            )));
        }
        self.status = BookingStatus::Refunded;
        self.updated_at = Utc::now();
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────
