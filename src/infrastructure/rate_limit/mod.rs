//! Rate limiting infrastructure - Per-caller admission accounting

mod rate_limiter;

pub use rate_limiter::RateLimiter;
