use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use minute_quota::app::build_router;
use minute_quota::error::StoreError;
use minute_quota::limiter::{Limit, RateLimiter};
use minute_quota::state::AppState;
use minute_quota::store::{MemoryWindowStore, WindowStore};
use minute_quota::window::{EpochMinute, ManualClock, UserId};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::util::ServiceExt;

// 2023-11-14T22:14:00Z
const WINDOW_START: i64 = 1_700_000_040;

struct DownStore;

#[async_trait]
impl WindowStore for DownStore {
    async fn conditional_increment(
        &self,
        _: &UserId,
        _: EpochMinute,
        _: u64,
    ) -> Result<Option<u64>, StoreError> {
        Err(StoreError::Unavailable("down".to_string()))
    }

    async fn create_if_absent(&self, _: &UserId, _: EpochMinute, _: u64) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("down".to_string()))
    }

    async fn get(&self, _: &UserId, _: EpochMinute) -> Result<Option<u64>, StoreError> {
        Err(StoreError::Unavailable("down".to_string()))
    }
}

fn app_with(store: Arc<dyn WindowStore>, limit: u64) -> Router {
    let limiter = RateLimiter::new(
        store,
        Arc::new(ManualClock::at(WINDOW_START)),
        Limit::try_from(limit).unwrap(),
    );
    build_router(Arc::new(AppState { limiter }))
}

fn hit(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/hit")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn hit_allows_until_limit_then_throttles() {
    let app = app_with(Arc::new(MemoryWindowStore::new()), 2);

    for expected in 1..=2 {
        let res = app.clone().oneshot(hit(json!({"userId": "u1"}))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            json_body(res).await,
            json!({"message": "Request allowed", "count": expected})
        );
    }

    let res = app.clone().oneshot(hit(json!({"userId": "u1"}))).await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json_body(res).await, json!({"message": "Rate limit exceeded"}));
}

#[tokio::test]
async fn hit_without_user_is_a_client_error() {
    let app = app_with(Arc::new(MemoryWindowStore::new()), 2);

    for body in [json!({}), json!({"userId": ""})] {
        let res = app.clone().oneshot(hit(body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(res).await, json!({"message": "userId is required"}));
    }
}

#[tokio::test]
async fn hit_body_without_json_content_type_is_still_read() {
    let app = app_with(Arc::new(MemoryWindowStore::new()), 2);

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/hit")
                .body(Body::from(json!({"userId": "plain"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["count"], json!(1));

    // no body at all
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/hit")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await, json!({"message": "userId is required"}));
}

#[tokio::test]
async fn hit_accepts_numeric_user_ids() {
    let app = app_with(Arc::new(MemoryWindowStore::new()), 2);

    let res = app.clone().oneshot(hit(json!({"userId": 42}))).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // same quota as the string form
    let res = app.clone().oneshot(hit(json!({"userId": "42"}))).await.unwrap();
    assert_eq!(json_body(res).await["count"], json!(2));
}

#[tokio::test]
async fn hit_with_unusable_body_is_a_client_error() {
    let app = app_with(Arc::new(MemoryWindowStore::new()), 2);

    for body in [json!({"userId": null}), json!({"userId": ["a"]}), json!("u1")] {
        let res = app.clone().oneshot(hit(body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(res).await, json!({"message": "userId is required"}));
    }

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/hit")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn usage_without_user_is_a_client_error() {
    let app = app_with(Arc::new(MemoryWindowStore::new()), 3);

    let res = app.clone().oneshot(get("/api/usage/")).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await, json!({"message": "userId is required"}));
}

#[tokio::test]
async fn usage_reports_window_count_and_limit() {
    let app = app_with(Arc::new(MemoryWindowStore::new()), 3);

    let res = app.clone().oneshot(get("/api/usage/u9")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        json_body(res).await,
        json!({"userId": "u9", "minute": "2023-11-14T22:14", "count": 0, "limit": 3})
    );

    app.clone().oneshot(hit(json!({"userId": "u9"}))).await.unwrap();

    let res = app.clone().oneshot(get("/api/usage/u9")).await.unwrap();
    assert_eq!(json_body(res).await["count"], json!(1));
}

#[tokio::test]
async fn store_outage_is_a_server_error() {
    let app = app_with(Arc::new(DownStore), 3);

    let res = app.clone().oneshot(hit(json!({"userId": "u1"}))).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(res).await, json!({"message": "Internal server error"}));

    let res = app.clone().oneshot(get("/api/usage/u1")).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn health_and_metrics_are_served() {
    let app = app_with(Arc::new(MemoryWindowStore::new()), 3);

    let res = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["status"], json!("healthy"));

    app.clone().oneshot(hit(json!({"userId": "m"}))).await.unwrap();
    let res = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("quota_requests_total"));
}
