use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::handlers::{
    health_handler, hit_handler, metrics_handler, usage_handler, usage_missing_handler,
};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/hit", post(hit_handler))
        .route("/api/usage/", get(usage_missing_handler))
        .route("/api/usage/{user_id}", get(usage_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}
