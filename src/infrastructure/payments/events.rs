//! Gateway JSON payloads: checkout sessions and webhook events

use std::collections::HashMap;

use serde::Deserialize;

use crate::application::ports::{
    GatewayError, GatewayEvent, SessionMetadata, SessionSnapshot, SessionStatus,
};

const SESSION_COMPLETED: &str = "checkout.session.completed";
const SESSION_EXPIRED: &str = "checkout.session.expired";

/// Checkout session object as returned by the gateway API
#[derive(Debug, Deserialize)]
pub(crate) struct RawSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl RawSession {
    pub fn into_snapshot(self) -> Result<SessionSnapshot, GatewayError> {
        let status = self
            .status
            .as_deref()
            .and_then(SessionStatus::from_str)
            .ok_or_else(|| {
                GatewayError::InvalidResponse(format!(
                    "Session {} has unknown status {:?}",
                    self.id, self.status
                ))
            })?;

        Ok(SessionSnapshot {
            status,
            payment_intent_id: self.payment_intent,
            metadata: SessionMetadata::from_map(&self.metadata),
            id: self.id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

/// Parse an authenticated webhook body into a [`GatewayEvent`].
pub fn parse_event(payload: &[u8]) -> Result<GatewayEvent, GatewayError> {
    let event: RawEvent = serde_json::from_slice(payload)
        .map_err(|e| GatewayError::InvalidResponse(format!("Invalid event payload: {}", e)))?;

    if event.kind != SESSION_COMPLETED && event.kind != SESSION_EXPIRED {
        return Ok(GatewayEvent::Other(event.kind));
    }

    let session: RawSession = serde_json::from_value(event.data.object)
        .map_err(|e| GatewayError::InvalidResponse(format!("Invalid session object: {}", e)))?;
    let metadata = SessionMetadata::from_map(&session.metadata);

    Ok(if event.kind == SESSION_COMPLETED {
        GatewayEvent::SessionCompleted {
            session_id: session.id,
            payment_intent_id: session.payment_intent,
            metadata,
        }
    } else {
        GatewayEvent::SessionExpired {
            session_id: session.id,
            metadata,
        }
    })
}
