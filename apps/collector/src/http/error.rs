//! # API Error Types
//!
//! Every failure leaves the API as structured JSON with an `error` key;
//! internal error text is summarized, never dumped raw.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use mesh_db::DbError;

/// HTTP API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed request input; nothing was mutated.
    #[error("{0}")]
    InvalidRequest(String),

    /// The store failed underneath the handler.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Db(e) if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
