//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use regex::Regex;

use super::config::MetricsConfig;

static UUID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .unwrap_or_else(|e| panic!("invalid uuid pattern: {}", e))
});

static FINGERPRINT_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[0-9a-f]{16}(/|$)").unwrap_or_else(|e| panic!("invalid fingerprint pattern: {}", e))
});

static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/\d+(/|$)").unwrap_or_else(|e| panic!("invalid numeric pattern: {}", e))
});

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            register_default_metrics();

            tracing::info!(path = %config.path, "Prometheus metrics initialized");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

fn register_default_metrics() {
    gauge!("geo_search_cache_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
    gauge!("search_cache_entries").set(0.0);
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Record a cache lookup outcome
pub fn record_cache_lookup(hit: bool) {
    if hit {
        counter!("search_cache_hits_total").increment(1);
    } else {
        counter!("search_cache_misses_total").increment(1);
    }
}

/// Record a request rejected by the admission gate
pub fn record_rate_limited() {
    counter!("search_rate_limited_total").increment(1);
}

/// Record a data store fetch
pub fn record_fetch(duration: Duration, success: bool) {
    let status = if success { "success" } else { "error" };

    histogram!("search_fetch_duration_seconds", "status" => status).record(duration.as_secs_f64());

    if !success {
        counter!("search_fetch_failures_total").increment(1);
    }
}

pub fn set_cache_entries(entries: usize) {
    gauge!("search_cache_entries").set(entries as f64);
}

const MAX_PATH_LABEL_CHARS: usize = 50;

/// Sanitize URL path for metric labels (remove IDs, limit cardinality)
fn sanitize_path(path: &str) -> String {
    let path = UUID_SEGMENT.replace_all(path, "{id}");
    let path = FINGERPRINT_SEGMENT.replace_all(&path, "/{fingerprint}$1");
    let path = NUMERIC_SEGMENT.replace_all(&path, "/{id}$1");

    // Truncate long paths on a char boundary
    match path.char_indices().nth(MAX_PATH_LABEL_CHARS) {
        Some((end, _)) => path[..end].to_string(),
        None => path.to_string(),
    }
}
