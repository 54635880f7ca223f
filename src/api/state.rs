//! Application state for shared services

use std::sync::Arc;

use crate::api::middleware::CallerPolicy;
use crate::infrastructure::services::SearchService;

/// Application state shared by all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub search_service: Arc<SearchService>,
    pub caller_policy: CallerPolicy,
}

impl AppState {
    /// Create new application state; caller identity comes from the peer address
    pub fn new(search_service: Arc<SearchService>) -> Self {
        Self {
            search_service,
            caller_policy: CallerPolicy::default(),
        }
    }

    pub fn with_caller_policy(mut self, policy: CallerPolicy) -> Self {
        self.caller_policy = policy;
        self
    }
}
