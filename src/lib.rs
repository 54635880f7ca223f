//! Geo search cache
//!
//! A location-aware search API that keeps recent result sets in a bounded,
//! time-limited cache and rate-limits callers before the data store is hit:
//! - Canonical cache keys with bucketed coordinates
//! - Exact LRU eviction with per-entry TTL
//! - Fixed and sliding window admission per caller
//! - Great-circle distance annotation and ordering

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::middleware::CallerPolicy;
use api::state::AppState;
use config::StoreBackend;
use domain::search::CandidateSource;
use domain::DomainError;
use infrastructure::services::SearchService;
use infrastructure::source::{
    InMemoryCandidateSource, PostgresCandidateSource, PostgresSourceConfig,
};
use tracing::info;

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let source = create_candidate_source(config).await?;
    let search_service = SearchService::init(config.search_service_config(), source)?;

    let caller_policy = CallerPolicy {
        trust_proxy_headers: config.rate_limit.trust_proxy_headers,
        trust_account_header: config.rate_limit.trust_account_header,
    };

    if caller_policy.trust_proxy_headers || caller_policy.trust_account_header {
        info!(
            trust_proxy_headers = caller_policy.trust_proxy_headers,
            trust_account_header = caller_policy.trust_account_header,
            "Caller identity taken from request headers"
        );
    }

    Ok(AppState::new(search_service).with_caller_policy(caller_policy))
}

async fn create_candidate_source(
    config: &AppConfig,
) -> Result<Arc<dyn CandidateSource>, DomainError> {
    let store = &config.store;

    match store.backend {
        StoreBackend::Memory => {
            let source = match &store.seed_path {
                Some(path) => InMemoryCandidateSource::from_json_file(path).await?,
                None => {
                    info!("No seed file configured, using sample listings");
                    InMemoryCandidateSource::sample()
                }
            };

            info!(listings = source.len(), "Using in-memory candidate source");
            Ok(Arc::new(source.with_max_results(store.max_results)))
        }
        StoreBackend::Postgres => {
            let url = store.database_url.as_deref().ok_or_else(|| {
                DomainError::configuration("store.database_url is required for the postgres backend")
            })?;

            info!("Connecting to PostgreSQL...");
            let source = PostgresCandidateSource::connect(
                &PostgresSourceConfig::new(url)
                    .with_max_connections(store.max_connections)
                    .with_max_results(store.max_results),
            )
            .await?;
            source.ensure_table().await?;
            info!("PostgreSQL connection established");

            Ok(Arc::new(source))
        }
    }
}
