//! Observability infrastructure - Prometheus metrics

mod config;
mod metrics;

pub use config::{MetricsConfig, ObservabilityConfig};
pub use metrics::{
    create_metrics_router, init_metrics, record_cache_lookup, record_fetch, record_http_request,
    record_rate_limited, set_cache_entries, PrometheusMetrics,
};
