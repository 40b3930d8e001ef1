pub mod registry;

use anyhow::{Context, Result};
use prometheus::{Encoder, TextEncoder};

/// Metrics in Prometheus exposition format
pub fn render() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .context("Failed to encode metrics")?;

    String::from_utf8(buffer).context("Metrics output is not UTF-8")
}

// Re-export commonly used metrics for convenience
pub use registry::{
    CANVAS_LISTINGS_TOTAL, OVERPASS_ERRORS_TOTAL, OVERPASS_RATE_LIMIT_WAITS_TOTAL,
    OVERPASS_REQUESTS_TOTAL, OVERPASS_REQUEST_DURATION_SECONDS,
};
