use std::time::Duration;

use mimir::{ErrorKind, MimirError, Result, classify};

#[test]
fn test_error_display() {
    let err = MimirError::Api {
        status: 503,
        message: "overloaded".to_string(),
    };
    assert!(err.to_string().contains("503"));
    assert!(err.to_string().contains("overloaded"));
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(MimirError::NoProvidersAvailable)
    }
    assert!(returns_error().is_err());
}

#[test]
fn all_providers_failed_wraps_cause() {
    let err = MimirError::AllProvidersFailed {
        last: Box::new(MimirError::Http("connection refused".into())),
    };
    assert!(err.to_string().starts_with("all providers failed"));
    assert!(err.to_string().contains("connection refused"));
    assert_eq!(classify(&err), ErrorKind::NetworkError);
    assert!(!err.is_transient());
}

// ============================================================================
// Transient error classification
// ============================================================================

#[test]
fn transient_errors() {
    assert!(MimirError::Timeout.is_transient());
    assert!(MimirError::RateLimited { retry_after: None }.is_transient());
    assert!(
        MimirError::RateLimited {
            retry_after: Some(Duration::from_secs(1))
        }
        .is_transient()
    );
    assert!(MimirError::Http("connection reset".into()).is_transient());
    assert!(
        MimirError::Api {
            status: 500,
            message: "internal".into()
        }
        .is_transient()
    );
    assert!(
        MimirError::Api {
            status: 503,
            message: "unavailable".into()
        }
        .is_transient()
    );
}

#[test]
fn permanent_errors() {
    assert!(!MimirError::AuthenticationFailed.is_transient());
    assert!(!MimirError::InvalidResponse("bad".into()).is_transient());
    assert!(!MimirError::InvalidRequest("no context".into()).is_transient());
    assert!(!MimirError::Configuration("bad".into()).is_transient());
    assert!(
        !MimirError::Api {
            status: 400,
            message: "bad request".into()
        }
        .is_transient()
    );
}

#[test]
fn retry_after_only_from_rate_limit() {
    let hint = Duration::from_secs(7);
    assert_eq!(
        MimirError::RateLimited {
            retry_after: Some(hint)
        }
        .retry_after(),
        Some(hint)
    );
    assert_eq!(MimirError::Timeout.retry_after(), None);
}

// ============================================================================
// Taxonomy labels
// ============================================================================

#[test]
fn error_kind_labels() {
    let labels: Vec<&str> = [
        ErrorKind::Timeout,
        ErrorKind::RateLimit,
        ErrorKind::AuthError,
        ErrorKind::NetworkError,
        ErrorKind::InvalidResponse,
        ErrorKind::ProviderError,
        ErrorKind::Unknown,
    ]
    .iter()
    .map(ErrorKind::as_str)
    .collect();
    assert_eq!(
        labels,
        vec![
            "timeout",
            "rate_limit",
            "auth_error",
            "network_error",
            "invalid_response",
            "provider_error",
            "unknown"
        ]
    );
}

#[test]
fn json_errors_are_invalid_responses() {
    let err: MimirError = serde_json::from_str::<serde_json::Value>("{nope")
        .unwrap_err()
        .into();
    assert_eq!(err.kind(), ErrorKind::InvalidResponse);
}
