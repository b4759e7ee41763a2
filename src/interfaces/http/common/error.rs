//! Mapping of [`DomainError`] onto HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, warn};

use super::ApiResponse;
use crate::shared::errors::DomainError;

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Handler error wrapping a domain failure
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            DomainError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
            DomainError::Conflict(_) | DomainError::InvariantViolation(_) => StatusCode::CONFLICT,
            DomainError::Unauthorized(_) => StatusCode::FORBIDDEN,
            DomainError::Upstream(_) => StatusCode::BAD_GATEWAY,
            DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Upstream and storage text stays in the logs.
    pub fn message(&self) -> String {
        match &self.0 {
            DomainError::Validation(m)
            | DomainError::Conflict(m)
            | DomainError::Unauthorized(m)
            | DomainError::InvariantViolation(m) => m.clone(),
            DomainError::NotFound { entity, .. } => format!("{} not found", entity),
            DomainError::Upstream(_) => {
                "Payment provider is unavailable, please try again".to_string()
            }
            DomainError::Storage(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self.0 {
            DomainError::Storage(detail) => error!(detail = %detail, "Storage failure"),
            DomainError::Upstream(detail) => warn!(detail = %detail, "Payment provider failure"),
            _ => {}
        }

        let body = ApiResponse::<()>::error(self.message()).with_code(self.0.kind());
        (status, Json(body)).into_response()
    }
}
