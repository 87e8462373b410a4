use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use notewall_catalog::CatalogError;
use notewall_state::Decision;
use serde_json::json;
use thiserror::Error;

use crate::message::ValidationError;
use crate::store::StoreError;

pub const CATALOG_FAILED_MESSAGE: &str = "Music catalog request failed. Check server logs for details.";

pub const RATE_LIMITED_MESSAGE: &str =
    "You're posting too fast, please wait a bit before sending another note.";

/// Every failure a handler can report. Internal details are logged, never
/// sent to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("No valid session. Cannot delete messages.")]
    NoSession,

    #[error("You can only delete your own messages")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("rate limited")]
    RateLimited(Decision),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("catalog failure: {0}")]
    Catalog(#[from] CatalogError),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NoSession => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::RateLimited(decision) => {
                let body = json!({
                    "error": RATE_LIMITED_MESSAGE,
                    "retryAfterMs": decision.retry_after_ms,
                    "remaining": decision.remaining,
                });
                let retry_after = decision.retry_after_secs().to_string();
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, retry_after)],
                    Json(body),
                )
                    .into_response();
            }
            ApiError::Storage(e) => {
                tracing::error!(error = %e, "Message storage failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage request failed".to_string())
            }
            ApiError::Catalog(e) => {
                tracing::error!(error = %e, "Catalog request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    CATALOG_FAILED_MESSAGE.to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
