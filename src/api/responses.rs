//! Response values produced by the API handlers.
//!
//! Handlers return an `ApiResponse` instead of writing to the connection,
//! which keeps them testable without a socket. The server adapter turns it
//! into an `http::Response`.

use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

use crate::error::ServiceError;
use crate::metrics;

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    /// Extra header, e.g. `Allow` on a 405
    pub allow: Option<&'static str>,
}

impl ApiResponse {
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                content_type: "application/json",
                body,
                allow: None,
            },
            Err(e) => Self::error(500, "internal server error", &e.to_string()),
        }
    }

    /// JSON error body: `{"status", "error", "timestamp"}`
    pub fn error(status: u16, label: &str, message: &str) -> Self {
        let body = serde_json::json!({
            "status": label,
            "error": message,
            "timestamp": Utc::now().to_rfc3339(),
        });
        Self {
            status,
            content_type: "application/json",
            body: body.to_string().into_bytes(),
            allow: None,
        }
    }

    pub fn from_service_error(err: &ServiceError) -> Self {
        Self::error(err.to_http_status(), err.label(), &err.to_string())
    }

    pub fn method_not_allowed(allowed: &'static str) -> Self {
        let mut response = Self::error(
            405,
            "method not allowed",
            &format!("allowed methods: {}", allowed),
        );
        response.allow = Some(allowed);
        response
    }

    pub fn prometheus(content_type: &'static str, body: String) -> Self {
        Self {
            status: 200,
            content_type,
            body: body.into_bytes(),
            allow: None,
        }
    }

    pub fn body_json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

pub fn handle_health(start_time: Instant) -> ApiResponse {
    ApiResponse::json(
        200,
        &serde_json::json!({
            "status": "ok",
            "uptime_seconds": start_time.elapsed().as_secs(),
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

pub fn handle_metrics() -> ApiResponse {
    match metrics::render() {
        Ok((_, body)) => ApiResponse::prometheus("text/plain; version=0.0.4", body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            ApiResponse::error(500, "internal server error", "failed to encode metrics")
        }
    }
}
