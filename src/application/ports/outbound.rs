//! Outbound ports: the external payment gateway
//!
//! [`PaymentGateway`] is the contract the booking services need from a
//! hosted-checkout provider. The production implementation is
//! [`HttpPaymentGateway`](crate::infrastructure::payments::HttpPaymentGateway).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::booking::SlotRef;
use crate::shared::errors::DomainError;

// ── Metadata ───────────────────────────────────────────────────

const META_BOOKING_ID: &str = "booking_id";
const META_COLLECTION_ID: &str = "collection_id";
const META_SLOT_ID: &str = "slot_id";
const META_GAME_ID: &str = "game_id";

/// Recovery context echoed back by the gateway on every session and event.
///
/// Lets the reconciler find the slot and game even when the booking row
/// is missing or not yet committed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMetadata {
    pub booking_id: Option<String>,
    pub collection_id: Option<String>,
    pub slot_id: Option<String>,
    pub game_id: Option<String>,
}

impl SessionMetadata {
    pub fn for_booking(booking_id: &str, slot: &SlotRef, game_id: Option<&str>) -> Self {
        Self {
            booking_id: Some(booking_id.to_string()),
            collection_id: Some(slot.collection_id.clone()),
            slot_id: Some(slot.slot_id.clone()),
            game_id: game_id.map(str::to_string),
        }
    }

    /// Slot reference, only when both parts are present.
    pub fn slot_ref(&self) -> Option<SlotRef> {
        match (non_empty(&self.collection_id), non_empty(&self.slot_id)) {
            (Some(c), Some(s)) => Some(SlotRef::new(c, s)),
            _ => None,
        }
    }

    pub fn game_id(&self) -> Option<&str> {
        non_empty(&self.game_id)
    }

    pub fn booking_id(&self) -> Option<&str> {
        non_empty(&self.booking_id)
    }

    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        [
            (META_BOOKING_ID, &self.booking_id),
            (META_COLLECTION_ID, &self.collection_id),
            (META_SLOT_ID, &self.slot_id),
            (META_GAME_ID, &self.game_id),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.clone().map(|v| (k, v)))
        .collect()
    }

    pub fn from_map(map: &HashMap<String, String>) -> Self {
        Self {
            booking_id: map.get(META_BOOKING_ID).cloned(),
            collection_id: map.get(META_COLLECTION_ID).cloned(),
            slot_id: map.get(META_SLOT_ID).cloned(),
            game_id: map.get(META_GAME_ID).cloned(),
        }
    }
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty())
}

// ── Sessions ───────────────────────────────────────────────────

/// Request to open a hosted payment session
#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    /// Amount in currency subunits
    pub amount: i64,
    pub currency: String,
    /// Line-item label shown on the payment page
    pub label: String,
    /// Our booking id, echoed by the gateway as client reference
    pub client_reference_id: String,
    pub metadata: SessionMetadata,
    pub success_url: String,
    pub cancel_url: String,
}

/// A freshly created payment session
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    /// Where to redirect the payer
    pub url: String,
}

/// Gateway-side session status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Open,
    Complete,
    Expired,
}

impl SessionStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "complete" => Some(Self::Complete),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

/// Current state of a session as reported by the gateway
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub id: String,
    pub status: SessionStatus,
    pub payment_intent_id: Option<String>,
    pub metadata: SessionMetadata,
}

/// Asynchronous notification from the gateway (already authenticated)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    SessionCompleted {
        session_id: String,
        payment_intent_id: Option<String>,
        metadata: SessionMetadata,
    },
    SessionExpired {
        session_id: String,
        metadata: SessionMetadata,
    },
    /// Any other event kind; accepted and ignored
    Other(String),
}

impl GatewayEvent {
    pub fn kind(&self) -> &str {
        match self {
            Self::SessionCompleted { .. } => "session_completed",
            Self::SessionExpired { .. } => "session_expired",
            Self::Other(kind) => kind,
        }
    }
}

// ── Errors ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gateway unreachable: {0}")]
    Transport(String),

    #[error("Gateway rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected gateway response: {0}")]
    InvalidResponse(String),
}

impl From<GatewayError> for DomainError {
    fn from(e: GatewayError) -> Self {
        DomainError::Upstream(e.to_string())
    }
}

// ── PaymentGateway ─────────────────────────────────────────────

/// Port to an external hosted-checkout payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a redirectable payment session
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CheckoutSession, GatewayError>;

    /// Fetch the session's current status
    async fn retrieve_session(&self, session_id: &str) -> Result<SessionSnapshot, GatewayError>;

    /// Force an open session to expire. The gateway answers with a
    /// session-expired notification.
    async fn expire_session(&self, session_id: &str) -> Result<(), GatewayError>;
}

pub type SharedPaymentGateway = Arc<dyn PaymentGateway>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_ref_requires_both_parts() {
        let mut meta = SessionMetadata::for_booking("b1", &SlotRef::new("c1", "s1"), None);
        assert_eq!(meta.slot_ref(), Some(SlotRef::new("c1", "s1")));

        meta.slot_id = Some(String::new());
        assert_eq!(meta.slot_ref(), None);

        meta.slot_id = None;
        assert_eq!(meta.slot_ref(), None);
    }

    #[test]
    fn metadata_survives_gateway_echo() {
        let meta = SessionMetadata::for_booking("b1", &SlotRef::new("c1", "s1"), Some("g1"));
        let echoed: HashMap<String, String> = meta
            .to_pairs()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(SessionMetadata::from_map(&echoed), meta);
    }

    #[test]
    fn gateway_errors_become_upstream() {
        let err: DomainError = GatewayError::Transport("timeout".into()).into();
        assert_eq!(err.kind(), "upstream_failure");
    }
}
