// Prometheus metrics
//
// One process-wide registry (the prometheus default) holding:
// - HTTP request counters and latency, by route and status
// - Transform outcomes and per-stage pipeline latency
// - Object store operation counters and latency

use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::sync::OnceLock;
use std::time::Instant;

pub struct Metrics {
    /// Requests by method, route template and status code
    pub http_requests: IntCounterVec,

    /// Request latency by route template (seconds)
    pub http_request_duration: HistogramVec,

    /// Transform attempts by outcome (success, validation, not_found, unauthorized, ...)
    pub transforms: IntCounterVec,

    /// Pipeline stage latency by stage name (seconds)
    pub stage_duration: HistogramVec,

    /// Object store calls by operation and outcome
    pub storage_operations: IntCounterVec,

    /// Object store latency by operation (seconds)
    pub storage_duration: HistogramVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

impl Metrics {
    /// Register (first call) and return the global metrics instance
    pub fn global() -> &'static Self {
        METRICS.get_or_init(|| {
            let http_requests = register_int_counter_vec!(
                "vixel_http_requests_total",
                "Total HTTP requests by method, route and status",
                &["method", "route", "status"]
            )
            .expect("Failed to register http_requests_total metric");

            let http_request_duration = register_histogram_vec!(
                "vixel_http_request_duration_seconds",
                "HTTP request latency in seconds",
                &["route"],
                vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
            )
            .expect("Failed to register http_request_duration_seconds metric");

            let transforms = register_int_counter_vec!(
                "vixel_transforms_total",
                "Image transform requests by outcome",
                &["outcome"]
            )
            .expect("Failed to register transforms_total metric");

            let stage_duration = register_histogram_vec!(
                "vixel_pipeline_stage_duration_seconds",
                "Duration of each pipeline stage in seconds",
                &["stage"], // decode, resize, ..., encode
                vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
            )
            .expect("Failed to register pipeline_stage_duration_seconds metric");

            let storage_operations = register_int_counter_vec!(
                "vixel_storage_operations_total",
                "Object store operations by type and outcome",
                &["operation", "outcome"]
            )
            .expect("Failed to register storage_operations_total metric");

            let storage_duration = register_histogram_vec!(
                "vixel_storage_operation_duration_seconds",
                "Object store operation latency in seconds",
                &["operation"], // fetch, store, delete
                vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 20.0]
            )
            .expect("Failed to register storage_operation_duration_seconds metric");

            Metrics {
                http_requests,
                http_request_duration,
                transforms,
                stage_duration,
                storage_operations,
                storage_duration,
            }
        })
    }

    pub fn record_http(&self, method: &str, route: &str, status: u16, started: Instant) {
        self.http_requests
            .with_label_values(&[method, route, &status.to_string()])
            .inc();
        self.http_request_duration
            .with_label_values(&[route])
            .observe(started.elapsed().as_secs_f64());
    }

    pub fn record_transform(&self, outcome: &str) {
        self.transforms.with_label_values(&[outcome]).inc();
    }

    pub fn observe_stage(&self, stage: &str, started: Instant) {
        self.stage_duration
            .with_label_values(&[stage])
            .observe(started.elapsed().as_secs_f64());
    }

    pub fn record_storage(&self, operation: &str, success: bool, started: Instant) {
        let outcome = if success { "success" } else { "error" };
        self.storage_operations
            .with_label_values(&[operation, outcome])
            .inc();
        self.storage_duration
            .with_label_values(&[operation])
            .observe(started.elapsed().as_secs_f64());
    }
}

/// Render every registered metric in the Prometheus text format
pub fn render() -> Result<(String, String), prometheus::Error> {
    // Make sure our families exist even before the first request
    let _ = Metrics::global();

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    let body = String::from_utf8_lossy(&buffer).into_owned();
    Ok((encoder.format_type().to_string(), body))
}
