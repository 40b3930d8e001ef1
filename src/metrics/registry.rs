use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};

lazy_static! {
    // Overpass API Metrics
    pub static ref OVERPASS_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "overpass_requests_total",
        "Total requests sent to the Overpass API",
        &["method"]
    )
    .unwrap();

    pub static ref OVERPASS_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "overpass_errors_total",
        "Total failed Overpass requests",
        &["kind"]  // kind: unsupported_format, transport, http, decode
    )
    .unwrap();

    pub static ref OVERPASS_REQUEST_DURATION_SECONDS: Histogram = register_histogram!(
        "overpass_request_duration_seconds",
        "Overpass request duration in seconds",
        vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 180.0]
    )
    .unwrap();

    pub static ref OVERPASS_RATE_LIMIT_WAITS_TOTAL: IntCounter = register_int_counter!(
        "overpass_rate_limit_waits_total",
        "Total times the client-side rate limit caused a wait"
    )
    .unwrap();

    // Canvas Metrics
    pub static ref CANVAS_LISTINGS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "canvas_listings_total",
        "Total storage listings issued by the canvas index",
        &["level"]  // level: bucket, zone, quadkey
    )
    .unwrap();
}

/// Initialize all metrics (called on startup)
pub fn init_metrics() {
    // Force lazy_static initialization
    lazy_static::initialize(&OVERPASS_REQUESTS_TOTAL);
    lazy_static::initialize(&OVERPASS_ERRORS_TOTAL);
    lazy_static::initialize(&OVERPASS_REQUEST_DURATION_SECONDS);
    lazy_static::initialize(&OVERPASS_RATE_LIMIT_WAITS_TOTAL);
    lazy_static::initialize(&CANVAS_LISTINGS_TOTAL);
}
