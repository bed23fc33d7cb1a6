mod health;
mod metrics;
mod hit;
mod usage;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use hit::hit_handler;
pub use usage::{usage_handler, usage_missing_handler};
