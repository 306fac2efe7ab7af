//! HTTP helpers shared by the networked providers.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};

use crate::{MimirError, Result};

/// Timeout for availability probes.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Longest error body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Build an HTTP client with a per-request timeout.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| MimirError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Map a non-success response to an error.
///
/// Successful responses are passed through untouched.
pub async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(MimirError::AuthenticationFailed),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(MimirError::RateLimited { retry_after })
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Err(MimirError::Timeout),
        _ => {
            let mut message = response.text().await.unwrap_or_default();
            if message.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !message.is_char_boundary(cut) {
                    cut -= 1;
                }
                message.truncate(cut);
            }
            if message.is_empty() {
                message = status.to_string();
            }
            Err(MimirError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}
