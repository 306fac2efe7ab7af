//! Client-side request throttling for hosted providers.

use std::fmt;
use std::num::NonZeroU32;

use governor::{DefaultDirectRateLimiter, Quota};
use tracing::debug;

use crate::telemetry;

/// Token-bucket settings for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Sustained request rate. Default: 3.
    pub requests_per_second: u32,
    /// Requests allowed back to back before throttling. Default: 5.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 3,
            burst: 5,
        }
    }
}

impl RateLimitConfig {
    pub fn new(requests_per_second: u32, burst: u32) -> Self {
        Self {
            requests_per_second,
            burst,
        }
    }
}

/// Per-provider rate limiter.
///
/// Zero values are clamped to one.
pub struct RateLimiter {
    limiter: DefaultDirectRateLimiter,
    config: RateLimitConfig,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish()
    }
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_second(rate).allow_burst(burst);
        Self {
            limiter: governor::RateLimiter::direct(quota),
            config,
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Wait until a request may be sent.
    pub async fn acquire(&self, provider: &str) {
        if self.limiter.check().is_ok() {
            return;
        }
        debug!(provider, "rate limit reached, waiting");
        metrics::counter!(telemetry::RATE_LIMIT_WAITS_TOTAL,
            "provider" => provider.to_owned(),
        )
        .increment(1);
        self.limiter.until_ready().await;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
