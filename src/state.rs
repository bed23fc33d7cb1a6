use crate::limiter::RateLimiter;

// app's shared state

pub struct AppState {
    pub limiter: RateLimiter,
}
