use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("quota_requests_total", "Total number of quota checks").unwrap();
    pub static ref ALLOWED_TOTAL: Counter =
        register_counter!("quota_allowed_total", "Requests admitted within the window").unwrap();
    pub static ref DENIED_TOTAL: Counter =
        register_counter!("quota_denied_total", "Requests rejected as over the limit").unwrap();
    pub static ref STORE_ERRORS: Counter =
        register_counter!("quota_store_errors_total", "Window store calls that failed").unwrap();
    pub static ref DECISION_LATENCY: Histogram = register_histogram!(
        "quota_decision_latency_seconds",
        "Time spent deciding a request, store round-trips included"
    )
    .unwrap();
    pub static ref MEMORY_RECORDS: Gauge =
        register_gauge!("quota_memory_records", "Window records held by the in-memory store").unwrap();
}
