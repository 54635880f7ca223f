//! Rate limiter implementation
//!
//! Provides fixed and sliding window rate limiting per caller identity.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::rate_limit::{
    Admission, AdmissionGate, GateStats, RateLimitConfig, RateLimitStrategy,
};

/// Smallest retry hint handed to a denied caller
const MIN_RETRY_AFTER: Duration = Duration::from_millis(1);

/// Per-identity counter state
#[derive(Debug, Clone)]
enum RateWindow {
    Fixed { started_at: Instant, count: u32 },
    Sliding { admitted: VecDeque<Instant> },
}

#[derive(Debug, Clone)]
struct WindowRecord {
    window: RateWindow,
    last_seen: Instant,
}

impl WindowRecord {
    fn new(strategy: RateLimitStrategy, now: Instant) -> Self {
        let window = match strategy {
            RateLimitStrategy::FixedWindow => RateWindow::Fixed {
                started_at: now,
                count: 0,
            },
            RateLimitStrategy::SlidingWindow => RateWindow::Sliding {
                admitted: VecDeque::new(),
            },
        };

        Self {
            window,
            last_seen: now,
        }
    }

    fn admit(&mut self, config: &RateLimitConfig, now: Instant) -> Admission {
        self.last_seen = now;
        let limit = config.max_requests;

        match &mut self.window {
            RateWindow::Fixed { started_at, count } => {
                let elapsed = now.saturating_duration_since(*started_at);

                if elapsed >= config.window {
                    *started_at = now;
                    *count = 0;
                }

                if *count < limit {
                    *count += 1;
                    return Admission::Allowed {
                        remaining: limit - *count,
                    };
                }

                let elapsed = now.saturating_duration_since(*started_at);
                Admission::Denied {
                    retry_after: config.window.saturating_sub(elapsed).max(MIN_RETRY_AFTER),
                }
            }
            RateWindow::Sliding { admitted } => {
                while let Some(oldest) = admitted.front() {
                    if now.saturating_duration_since(*oldest) >= config.window {
                        admitted.pop_front();
                    } else {
                        break;
                    }
                }

                let in_window = admitted.len() as u32;

                if in_window < limit {
                    admitted.push_back(now);
                    return Admission::Allowed {
                        remaining: limit - in_window - 1,
                    };
                }

                let retry_after = admitted
                    .front()
                    .map(|oldest| config.window.saturating_sub(now.saturating_duration_since(*oldest)))
                    .unwrap_or(config.window);

                Admission::Denied {
                    retry_after: retry_after.max(MIN_RETRY_AFTER),
                }
            }
        }
    }
}

/// Rate limiter keyed by caller identity
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    /// Per-identity windows
    windows: Arc<RwLock<HashMap<String, WindowRecord>>>,
    /// Last cleanup time
    last_cleanup: Arc<RwLock<Instant>>,
    denied: AtomicU64,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(RwLock::new(HashMap::new())),
            last_cleanup: Arc::new(RwLock::new(Instant::now())),
            denied: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check and record in one operation
    pub(crate) async fn check_at(&self, identity: &str, now: Instant) -> Admission {
        if !self.config.enabled {
            return Admission::Allowed {
                remaining: self.config.max_requests,
            };
        }

        self.maybe_cleanup(now).await;

        let admission = {
            let mut windows = self.windows.write().await;
            windows
                .entry(identity.to_string())
                .or_insert_with(|| WindowRecord::new(self.config.strategy, now))
                .admit(&self.config, now)
        };

        if let Admission::Denied { retry_after } = admission {
            self.denied.fetch_add(1, Ordering::Relaxed);
            debug!(
                identity = %identity,
                retry_after_ms = retry_after.as_millis() as u64,
                "Request denied by rate limiter"
            );
        }

        admission
    }

    /// Drops windows idle beyond the retention horizon, at most once per interval
    async fn maybe_cleanup(&self, now: Instant) {
        let should_cleanup = {
            let last = self.last_cleanup.read().await;
            now.saturating_duration_since(*last) >= self.config.cleanup_interval
        };

        if should_cleanup {
            let mut last = self.last_cleanup.write().await;
            *last = now;

            let retention = self.config.retention;
            let mut windows = self.windows.write().await;
            let before = windows.len();

            windows.retain(|_, record| now.saturating_duration_since(record.last_seen) < retention);

            let removed = before - windows.len();
            if removed > 0 {
                debug!(removed = removed, "Discarded idle rate limit windows");
            }
        }
    }
}

#[async_trait]
impl AdmissionGate for RateLimiter {
    async fn check(&self, identity: &str) -> Admission {
        self.check_at(identity, Instant::now()).await
    }

    async fn reset(&self, identity: &str) {
        let mut windows = self.windows.write().await;
        windows.remove(identity);
    }

    async fn clear(&self) {
        self.windows.write().await.clear();
        self.denied.store(0, Ordering::Relaxed);
    }

    async fn tracked_identities(&self) -> usize {
        self.windows.read().await.len()
    }

    async fn stats(&self) -> GateStats {
        GateStats {
            enabled: self.config.enabled,
            strategy: self.config.strategy,
            max_requests: self.config.max_requests,
            window_secs: self.config.window.as_secs(),
            tracked_identities: self.tracked_identities().await,
            denied: self.denied.load(Ordering::Relaxed),
        }
    }
}
