//! Mimir error types and error classification.
//!
//! [`MimirError`] is the single error type surfaced by every backend, the
//! cached wrapper and the fallback chain. [`classify()`] maps an error onto
//! the coarse [`ErrorKind`] taxonomy used for telemetry tagging.

use std::fmt;
use std::time::Duration;

/// Mimir error types
#[derive(Debug, thiserror::Error)]
pub enum MimirError {
    // Provider/network errors
    #[error("request timed out")]
    Timeout,

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    // Data errors
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Chain errors
    #[error("no providers available")]
    NoProvidersAvailable,

    /// Every chain member was skipped or failed; carries the last failure.
    #[error("all providers failed: {last}")]
    AllProvidersFailed { last: Box<MimirError> },

    #[error("{0}")]
    Other(String),
}

impl MimirError {
    /// Whether a retry of the same request may succeed.
    ///
    /// Timeouts, rate limiting, connection-level failures and 5xx responses
    /// are transient. Everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            MimirError::Timeout | MimirError::RateLimited { .. } | MimirError::Http(_) => true,
            MimirError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Provider-supplied retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            MimirError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Coarse classification of this error, see [`classify()`].
    pub fn kind(&self) -> ErrorKind {
        classify(self)
    }
}

impl From<reqwest::Error> for MimirError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MimirError::Timeout
        } else if err.is_decode() {
            MimirError::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            MimirError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            MimirError::Http(err.to_string())
        }
    }
}

/// Result type alias for Mimir operations
pub type Result<T> = std::result::Result<T, MimirError>;

/// Error taxonomy used for telemetry tagging.
///
/// Never consulted for control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Timeout,
    RateLimit,
    AuthError,
    NetworkError,
    InvalidResponse,
    ProviderError,
    Unknown,
}

impl ErrorKind {
    /// Label used in metric tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::AuthError => "auth_error",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::InvalidResponse => "invalid_response",
            ErrorKind::ProviderError => "provider_error",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an error into an [`ErrorKind`].
///
/// Structured variants are matched first. Only variants that carry nothing
/// but a message (`Http`, `Other`) and API statuses without a dedicated
/// mapping fall through to [`classify_message()`].
pub fn classify(err: &MimirError) -> ErrorKind {
    match err {
        MimirError::Timeout => ErrorKind::Timeout,
        MimirError::RateLimited { .. } => ErrorKind::RateLimit,
        MimirError::AuthenticationFailed => ErrorKind::AuthError,
        MimirError::InvalidResponse(_) | MimirError::Json(_) => ErrorKind::InvalidResponse,
        MimirError::Api { status, message } => match status {
            401 | 403 => ErrorKind::AuthError,
            408 => ErrorKind::Timeout,
            429 => ErrorKind::RateLimit,
            500..=599 => ErrorKind::ProviderError,
            _ => match classify_message(message) {
                ErrorKind::Unknown => ErrorKind::ProviderError,
                kind => kind,
            },
        },
        MimirError::AllProvidersFailed { last } => classify(last),
        MimirError::Http(message) => match classify_message(message) {
            ErrorKind::Unknown => ErrorKind::NetworkError,
            kind => kind,
        },
        MimirError::Other(message) => classify_message(message),
        MimirError::InvalidRequest(_)
        | MimirError::Configuration(_)
        | MimirError::NoProvidersAvailable => ErrorKind::Unknown,
    }
}

/// Best-effort classification from an error message.
///
/// Case-insensitive substring matching; returns [`ErrorKind::Unknown`] when
/// nothing matches.
pub fn classify_message(message: &str) -> ErrorKind {
    let msg = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| msg.contains(n));

    if has(&["timeout", "timed out", "deadline exceeded"]) {
        ErrorKind::Timeout
    } else if has(&["429", "too many requests", "rate limit"]) {
        ErrorKind::RateLimit
    } else if has(&["401", "403", "unauthorized", "forbidden", "invalid api key"]) {
        ErrorKind::AuthError
    } else if has(&[
        "connection refused",
        "connection reset",
        "dns",
        "no route to host",
        "network",
    ]) {
        ErrorKind::NetworkError
    } else if has(&["500", "502", "503", "504", "internal server error", "bad gateway"]) {
        ErrorKind::ProviderError
    } else if has(&["invalid json", "parse", "malformed", "unexpected response"]) {
        ErrorKind::InvalidResponse
    } else {
        ErrorKind::Unknown
    }
}
