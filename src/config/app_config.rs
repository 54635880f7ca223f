use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::geo::DistanceUnit;
use crate::domain::rate_limit::{RateLimitConfig, RateLimitStrategy};
use crate::domain::DomainError;
use crate::infrastructure::observability::ObservabilityConfig;
use crate::infrastructure::services::SearchServiceConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Result cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub max_entries: usize,
    /// Decimal places kept when bucketing coordinates (2 is roughly 1.1 km)
    pub coordinate_precision: u32,
}

/// Admission gate settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub max_requests: u32,
    pub window_secs: u64,
    pub strategy: RateLimitStrategy,
    pub retention_secs: u64,
    pub cleanup_interval_secs: u64,
    /// Identify callers by `X-Forwarded-For` / `X-Real-IP` instead of the peer address
    pub trust_proxy_headers: bool,
    /// Identify callers by `X-Account-Id`, as set by an upstream auth layer
    pub trust_account_header: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub distance_unit: DistanceUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

/// Data store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// JSON array of listings loaded by the memory backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_path: Option<String>,
    pub max_results: usize,
    pub max_connections: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_entries: 1_000,
            coordinate_precision: 2,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 10,
            window_secs: 60,
            strategy: RateLimitStrategy::FixedWindow,
            retention_secs: 600,
            cleanup_interval_secs: 60,
            trust_proxy_headers: false,
            trust_account_header: false,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            database_url: None,
            seed_path: None,
            max_results: 200,
            max_connections: 10,
        }
    }
}

impl RateLimitSettings {
    pub fn to_rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            enabled: self.enabled,
            max_requests: self.max_requests,
            window: Duration::from_secs(self.window_secs),
            strategy: self.strategy,
            retention: Duration::from_secs(self.retention_secs),
            cleanup_interval: Duration::from_secs(self.cleanup_interval_secs),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn search_service_config(&self) -> SearchServiceConfig {
        SearchServiceConfig::default()
            .with_cache_ttl(Duration::from_secs(self.cache.ttl_secs))
            .with_max_entries(self.cache.max_entries)
            .with_coordinate_precision(self.cache.coordinate_precision)
            .with_distance_unit(self.search.distance_unit)
            .with_rate_limit(self.rate_limit.to_rate_limit_config())
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        self.search_service_config().validate()?;

        if self.store.backend == StoreBackend::Postgres
            && self
                .store
                .database_url
                .as_deref()
                .is_none_or(|url| url.trim().is_empty())
        {
            return Err(DomainError::configuration(
                "store.database_url is required for the postgres backend",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_json(json: &str) -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(json, config::FileFormat::Json))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.cache.coordinate_precision, 2);
        assert_eq!(config.rate_limit.max_requests, 10);
        assert!(!config.rate_limit.trust_proxy_headers);
        assert!(!config.rate_limit.trust_account_header);
        assert_eq!(config.search.distance_unit, DistanceUnit::Kilometers);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sources_fill_defaults() {
        let config = from_json(
            r#"{
                "cache": { "ttl_secs": 60 },
                "rate_limit": {
                    "strategy": "sliding_window",
                    "max_requests": 5,
                    "trust_proxy_headers": true
                },
                "search": { "distance_unit": "miles" },
                "logging": { "format": "json" }
            }"#,
        );

        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.cache.max_entries, 1_000);
        assert_eq!(config.rate_limit.strategy, RateLimitStrategy::SlidingWindow);
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert!(config.rate_limit.trust_proxy_headers);
        assert!(!config.rate_limit.trust_account_header);
        assert_eq!(config.search.distance_unit, DistanceUnit::Miles);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_search_service_config_conversion() {
        let mut config = AppConfig::default();
        config.cache.ttl_secs = 30;
        config.rate_limit.window_secs = 10;

        let service = config.search_service_config();

        assert_eq!(service.cache_ttl, Duration::from_secs(30));
        assert_eq!(service.rate_limit.window, Duration::from_secs(10));
        assert_eq!(service.rate_limit.retention, Duration::from_secs(600));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut zero_ttl = AppConfig::default();
        zero_ttl.cache.ttl_secs = 0;
        assert!(zero_ttl.validate().is_err());

        let mut zero_capacity = AppConfig::default();
        zero_capacity.cache.max_entries = 0;
        assert!(zero_capacity.validate().is_err());

        let mut fine_grid = AppConfig::default();
        fine_grid.cache.coordinate_precision = 7;
        assert!(fine_grid.validate().is_err());

        let mut zero_requests = AppConfig::default();
        zero_requests.rate_limit.max_requests = 0;
        assert!(zero_requests.validate().is_err());

        let mut zero_window = AppConfig::default();
        zero_window.rate_limit.window_secs = 0;
        assert!(zero_window.validate().is_err());
    }

    #[test]
    fn test_postgres_backend_requires_url() {
        let mut config = AppConfig::default();
        config.store.backend = StoreBackend::Postgres;
        assert!(matches!(
            config.validate(),
            Err(DomainError::Configuration { .. })
        ));

        config.store.database_url = Some("postgres://localhost/listings".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serializes_for_display() {
        let json = serde_json::to_value(AppConfig::default()).unwrap();

        assert_eq!(json["rate_limit"]["strategy"], "fixed_window");
        assert_eq!(json["store"]["backend"], "memory");
        assert!(json["store"].get("database_url").is_none());
    }
}
