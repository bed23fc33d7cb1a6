use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("window record already exists")]
    AlreadyExists,
    // unreachable, timed out, or an unexpected reply
    #[error("store unavailable: {0}")]
    Unavailable(String),
    // only raised while building a store
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

// a denied request is not an error, see Decision::Denied
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuotaError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    // never turned into an allow or a deny
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for QuotaError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(reason) | StoreError::InvalidConfig(reason) => {
                QuotaError::StoreUnavailable(reason)
            }
            // only reachable if a store reports a conflict outside create_if_absent
            StoreError::AlreadyExists => {
                QuotaError::StoreUnavailable("unexpected record conflict".to_string())
            }
        }
    }
}

// HTTP-facing error, one variant per non-success outcome of the api
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal,
}

impl From<QuotaError> for ApiError {
    fn from(err: QuotaError) -> Self {
        match err {
            QuotaError::InvalidInput(reason) => ApiError::BadRequest(reason),
            QuotaError::StoreUnavailable(_) => ApiError::Internal,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
            }
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Internal server error" })),
            )
                .into_response(),
        }
    }
}
