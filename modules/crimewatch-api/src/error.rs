use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crimewatch_common::CrimewatchError;

/// Every error leaves the API as `{"detail": "..."}` with an appropriate
/// status: 404 for unknown regions/jobs, 422 for malformed requests, 500 for
/// everything unexpected.
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }

    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: detail.into(),
        }
    }
}

impl From<CrimewatchError> for ApiError {
    fn from(err: CrimewatchError) -> Self {
        let status = match &err {
            CrimewatchError::NoActiveSources(_) | CrimewatchError::JobNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            CrimewatchError::InvalidJobTransition { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(detail = %self.detail, "Request failed");
        }
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}
