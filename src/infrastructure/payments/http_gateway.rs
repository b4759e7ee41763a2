//! Hosted-checkout gateway client over HTTP
//!
//! Talks to a Stripe-compatible checkout sessions API: bearer secret key,
//! form-encoded request bodies, JSON responses.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use tracing::debug;

use super::events::RawSession;
use crate::application::ports::{
    CheckoutSession, CreateSessionRequest, GatewayError, PaymentGateway, SessionSnapshot,
};

/// Connection settings for [`HttpPaymentGateway`]
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// e.g. "https://api.stripe.com"
    pub api_base: String,
    pub secret_key: String,
    pub timeout_secs: u64,
}

pub struct HttpPaymentGateway {
    client: Client,
    sessions_url: Url,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl HttpPaymentGateway {
    pub fn new(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let api_base = config.api_base.trim_end_matches('/');
        let sessions_url = Url::parse(&format!("{}/v1/checkout/sessions", api_base))
            .map_err(|e| GatewayError::Transport(format!("Invalid api_base {}: {}", api_base, e)))?;
        if sessions_url.cannot_be_a_base() {
            return Err(GatewayError::Transport(format!(
                "Invalid api_base {}: not a hierarchical url",
                api_base
            )));
        }

        Ok(Self {
            client,
            sessions_url,
            secret_key: config.secret_key,
        })
    }

    /// Session resource url. Segments are percent-encoded, so an id cannot
    /// reach another path or add a query.
    fn session_url(&self, segments: &[&str]) -> Url {
        let mut url = self.sessions_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    async fn read_session(response: Response) -> Result<RawSession, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or(text);
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<RawSession>()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}

fn transport(e: reqwest::Error) -> GatewayError {
    GatewayError::Transport(e.to_string())
}

/// Form fields for a one-line-item payment session.
fn session_form(request: &CreateSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        (
            "client_reference_id".to_string(),
            request.client_reference_id.clone(),
        ),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        (
            "line_items[0][price_data][currency]".to_string(),
            request.currency.clone(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            request.amount.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            request.label.clone(),
        ),
    ];
    form.extend(
        request
            .metadata
            .to_pairs()
            .into_iter()
            .map(|(k, v)| (format!("metadata[{}]", k), v)),
    );
    form
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        debug!(
            reference = %request.client_reference_id,
            amount = request.amount,
            currency = %request.currency,
            "Creating checkout session"
        );

        let response = self
            .client
            .post(self.sessions_url.clone())
            .bearer_auth(&self.secret_key)
            .form(&session_form(&request))
            .send()
            .await
            .map_err(transport)?;

        let session = Self::read_session(response).await?;
        let url = session.url.ok_or_else(|| {
            GatewayError::InvalidResponse(format!("Session {} has no redirect url", session.id))
        })?;

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionSnapshot, GatewayError> {
        let response = self
            .client
            .get(self.session_url(&[session_id]))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(transport)?;

        Self::read_session(response).await?.into_snapshot()
    }

    async fn expire_session(&self, session_id: &str) -> Result<(), GatewayError> {
        debug!(session_id, "Expiring checkout session");

        let response = self
            .client
            .post(self.session_url(&[session_id, "expire"]))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(transport)?;

        Self::read_session(response).await?;
        Ok(())
    }
}
