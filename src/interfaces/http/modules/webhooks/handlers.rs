//! Payment webhook handler
//!
//! Unauthenticated by JWT. The body is trusted only after its
//! `Payment-Signature` header verifies against the webhook secret.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tracing::{error, warn};

use crate::application::PaymentReconciler;
use crate::infrastructure::payments::{parse_event, WebhookVerifier, SIGNATURE_HEADER};
use crate::interfaces::http::common::ApiResponse;

#[derive(Clone)]
pub struct WebhookAppState {
    pub verifier: WebhookVerifier,
    pub reconciler: Arc<PaymentReconciler>,
}

type WebhookReply = (StatusCode, Json<ApiResponse<String>>);

fn reply(status: StatusCode, body: ApiResponse<String>) -> WebhookReply {
    (status, Json(body))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    tag = "Payments",
    request_body(content = String, description = "Raw gateway event JSON", content_type = "application/json"),
    responses(
        (status = 200, description = "Event accepted", body = ApiResponse<String>),
        (status = 400, description = "Signature or payload rejected"),
        (status = 500, description = "Event could not be applied; the gateway should redeliver")
    )
)]
pub async fn payment_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookReply {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    if let Err(e) = state.verifier.verify(&body, signature) {
        warn!(error = %e, "Rejected payment webhook");
        return reply(
            StatusCode::BAD_REQUEST,
            ApiResponse::error(format!("Webhook Error: {}", e)).with_code("invalid_signature"),
        );
    }

    let event = match parse_event(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Unreadable payment webhook");
            return reply(
                StatusCode::BAD_REQUEST,
                ApiResponse::error("Webhook Error: invalid payload").with_code("invalid_payload"),
            );
        }
    };

    let kind = event.kind().to_string();
    match state.reconciler.handle_event(event).await {
        Ok(()) => reply(StatusCode::OK, ApiResponse::success(kind)),
        Err(e) => {
            error!(kind = %kind, error = %e, "Failed to apply payment webhook");
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiResponse::error("Event could not be processed").with_code(e.kind()),
            )
        }
    }
}
