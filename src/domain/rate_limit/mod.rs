//! Admission gate domain - per-caller request accounting

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Window accounting algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitStrategy {
    /// Counter reset when the window that began with the first request elapses
    #[default]
    FixedWindow,
    /// Admitted-request timestamps over the trailing window
    SlidingWindow,
}

impl std::fmt::Display for RateLimitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FixedWindow => write!(f, "fixed_window"),
            Self::SlidingWindow => write!(f, "sliding_window"),
        }
    }
}

/// Admission limits: at most `max_requests` per `window`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_requests: u32,
    pub window: Duration,
    pub strategy: RateLimitStrategy,
    /// Idle time after which a caller's window is discarded
    pub retention: Duration,
    /// Minimum spacing between sweeps of idle windows
    pub cleanup_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 10,
            window: Duration::from_secs(60),
            strategy: RateLimitStrategy::FixedWindow,
            retention: Duration::from_secs(600),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    /// Create an enabled configuration allowing `max_requests` per `window`
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            ..Default::default()
        }
    }

    pub fn with_strategy(mut self, strategy: RateLimitStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Disable rate limiting
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.enabled {
            return Ok(());
        }

        if self.max_requests == 0 {
            return Err(DomainError::configuration(
                "rate_limit.max_requests must be at least 1",
            ));
        }

        if self.window.is_zero() {
            return Err(DomainError::configuration(
                "rate_limit.window_secs must be greater than zero",
            ));
        }

        if self.retention < self.window {
            return Err(DomainError::configuration(
                "rate_limit.retention_secs must not be shorter than the window",
            ));
        }

        Ok(())
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed {
        /// Requests left in the current window
        remaining: u32,
    },
    Denied {
        /// Time until the caller may try again; always positive
        retry_after: Duration,
    },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Snapshot of gate state for introspection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateStats {
    pub enabled: bool,
    pub strategy: RateLimitStrategy,
    pub max_requests: u32,
    pub window_secs: u64,
    pub tracked_identities: usize,
    pub denied: u64,
}

/// Decides whether a caller may proceed to the expensive search path
#[async_trait]
pub trait AdmissionGate: Send + Sync + std::fmt::Debug {
    /// Checks and, when allowed, records a request from `identity`
    async fn check(&self, identity: &str) -> Admission;

    /// Forgets all accounting for `identity`
    async fn reset(&self, identity: &str);

    /// Forgets all accounting
    async fn clear(&self);

    /// Number of identities currently holding a window
    async fn tracked_identities(&self) -> usize;

    async fn stats(&self) -> GateStats;
}
