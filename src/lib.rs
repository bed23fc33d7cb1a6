pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod models;
pub mod state;
pub mod store;
pub mod window;
