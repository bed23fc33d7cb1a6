use clap::Parser;
use minute_quota::app::build_router;
use minute_quota::config::{Args, StoreKind};
use minute_quota::limiter::{Limit, RateLimiter};
use minute_quota::state::AppState;
use minute_quota::store::{MemoryWindowStore, TimeoutStore, WindowStore, retention_sweeper};
use minute_quota::window::{Clock, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // parse cli arguments
    let args = Args::parse();
    let limit = Limit::try_from(args.rate_limit_per_minute)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store_timeout = Duration::from_millis(args.store_timeout_ms);

    let store = build_store(&args, clock.clone(), store_timeout).await?;

    let limiter = RateLimiter::new(store, clock, limit)
        .with_create_conflict_policy(args.on_create_conflict);
    let state = Arc::new(AppState { limiter });

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(port = args.port, "quota service listening");
    tracing::info!(
        limit = limit.get(),
        store = ?args.store,
        on_create_conflict = ?args.on_create_conflict,
        "rate limit: {} requests per minute",
        limit.get()
    );

    axum::serve(listener, app).await?;
    Ok(())
}

async fn build_store(
    args: &Args,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
) -> Result<Arc<dyn WindowStore>, Box<dyn std::error::Error>> {
    match args.store {
        StoreKind::Memory => {
            let store = Arc::new(MemoryWindowStore::new());

            // spawn the background retention sweep
            let sweeper_store = store.clone();
            let retention = args.retention_minutes;
            tokio::spawn(async move {
                retention_sweeper(sweeper_store, clock, retention, Duration::from_secs(60)).await;
            });

            Ok(Arc::new(TimeoutStore::new(store, store_timeout)))
        }
        #[cfg(feature = "redis")]
        StoreKind::Redis => {
            use minute_quota::store::{RedisWindowStore, RedisWindowStoreOptions};

            let retention_seconds = args
                .retention_minutes
                .checked_mul(60)
                .ok_or("retention is too large")?;
            let store = RedisWindowStore::connect(
                &args.redis_url,
                RedisWindowStoreOptions {
                    prefix: args.redis_prefix.clone(),
                    retention_seconds,
                },
            )
            .await?;
            tracing::info!(url = %args.redis_url, prefix = %args.redis_prefix, "connected to redis");

            Ok(Arc::new(TimeoutStore::new(store, store_timeout)))
        }
        #[cfg(not(feature = "redis"))]
        StoreKind::Redis => Err("this build has no redis support, rebuild with --features redis".into()),
    }
}
