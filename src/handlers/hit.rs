use axum::body::Bytes;
use axum::http::StatusCode;
use axum::{Json, extract::State};
use std::sync::Arc;

use crate::error::ApiError;
use crate::limiter::Decision;
use crate::models::{HitRequest, HitResponse};
use crate::state::AppState;

pub async fn hit_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<HitResponse>), ApiError> {
    // read the raw body so a missing or odd payload still gets the json 400
    let user_id = HitRequest::from_body(&body).user_id();

    match state.limiter.try_consume(&user_id).await? {
        Decision::Allowed { count } => Ok((
            StatusCode::OK,
            Json(HitResponse {
                message: "Request allowed".to_string(),
                count: Some(count),
            }),
        )),
        Decision::Denied => Ok((
            StatusCode::TOO_MANY_REQUESTS,
            Json(HitResponse {
                message: "Rate limit exceeded".to_string(),
                count: None,
            }),
        )),
    }
}
