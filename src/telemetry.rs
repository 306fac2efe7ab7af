//! Telemetry metric names and recording helpers.
//!
//! Centralised metric names for mimir operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops. The recorder is the one piece of
//! process-wide state: every chain, cache and backend reports into it.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `mimir_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider` — backend name (e.g. "ollama", "openai (cached)")
//! - `status` — outcome: "ok" or "error"
//! - `direction` — token direction: "input" or "output"
//! - `kind` — error classification (see [`ErrorKind`])

use std::time::Duration;

use crate::error::ErrorKind;
use crate::types::TokenUsage;

/// Total analysis requests dispatched to a backend.
///
/// Labels: `provider`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "mimir_requests_total";

/// Request duration in seconds.
///
/// Labels: `provider`.
pub const REQUEST_DURATION_SECONDS: &str = "mimir_request_duration_seconds";

/// Total tokens consumed.
///
/// Labels: `provider`, `direction` ("input" | "output").
pub const TOKENS_TOTAL: &str = "mimir_tokens_total";

/// Failed requests by error classification.
///
/// Labels: `provider`, `kind`.
pub const ERRORS_TOTAL: &str = "mimir_errors_total";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `provider`.
pub const RETRIES_TOTAL: &str = "mimir_retries_total";

/// Total cache hits.
///
/// Labels: `match` ("exact" | "similar").
pub const CACHE_HITS_TOTAL: &str = "mimir_cache_hits_total";

/// Total cache misses.
pub const CACHE_MISSES_TOTAL: &str = "mimir_cache_misses_total";

/// Transitions from a failed backend to the next one in a fallback chain.
///
/// Labels: `from`, `to`.
pub const FALLBACKS_TOTAL: &str = "mimir_fallbacks_total";

/// Responses that could not be parsed and were scored by the local fallback.
pub const PROCESSOR_FALLBACKS_TOTAL: &str = "mimir_processor_fallbacks_total";

/// Outbound calls that had to wait for a rate limiter token.
///
/// Labels: `provider`.
pub const RATE_LIMIT_WAITS_TOTAL: &str = "mimir_rate_limit_waits_total";

/// Record a request outcome (counter + duration histogram).
pub fn record_request(provider: &str, elapsed: Duration, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(REQUESTS_TOTAL,
        "provider" => provider.to_owned(),
        "status" => status,
    )
    .increment(1);
    metrics::histogram!(REQUEST_DURATION_SECONDS,
        "provider" => provider.to_owned(),
    )
    .record(elapsed.as_secs_f64());
}

/// Record token usage reported by a backend.
pub fn record_token_usage(provider: &str, usage: &TokenUsage) {
    metrics::counter!(TOKENS_TOTAL,
        "provider" => provider.to_owned(),
        "direction" => "input",
    )
    .increment(u64::from(usage.input_tokens));
    metrics::counter!(TOKENS_TOTAL,
        "provider" => provider.to_owned(),
        "direction" => "output",
    )
    .increment(u64::from(usage.output_tokens));
}

/// Record a classified failure.
pub fn record_error(provider: &str, kind: ErrorKind) {
    metrics::counter!(ERRORS_TOTAL,
        "provider" => provider.to_owned(),
        "kind" => kind.as_str(),
    )
    .increment(1);
}

/// Record a fallback transition between two chain members.
pub fn record_fallback(from: &str, to: &str) {
    metrics::counter!(FALLBACKS_TOTAL,
        "from" => from.to_owned(),
        "to" => to.to_owned(),
    )
    .increment(1);
}
