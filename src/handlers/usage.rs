use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::limiter::UsageInfo;
use crate::state::AppState;

pub async fn usage_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UsageInfo>, ApiError> {
    let usage = state.limiter.usage(&user_id).await?;
    Ok(Json(usage))
}

// GET /api/usage/ with no id, answered like an empty id
pub async fn usage_missing_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UsageInfo>, ApiError> {
    let usage = state.limiter.usage("").await?;
    Ok(Json(usage))
}
