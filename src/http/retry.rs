//! Classification of HTTP failures into retryable and terminal ones.

use reqwest::StatusCode;
use thiserror::Error;

/// Maximum number of attempts for one network operation.
pub const MAX_RETRIES: usize = 3;

/// Delay between attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// Responses that will not change on retry.
#[derive(Debug, Error)]
pub enum NonRetryableError {
    #[error("Rate limit exceeded ({0}). Try again later.")]
    RateLimitExceeded(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access forbidden: {0}")]
    Forbidden(String),

    #[error("Request error: {0}")]
    ClientError(String),
}

/// Returns Ok(()) when the error may succeed on retry (5xx, connection
/// failures, timeouts) and the terminal classification otherwise.
pub fn classify_error(error: &reqwest::Error) -> Result<(), NonRetryableError> {
    let Some(status) = error.status() else {
        return Ok(());
    };
    let target = error
        .url()
        .map(|u| u.to_string())
        .unwrap_or_else(|| "request".to_string());

    match status {
        StatusCode::TOO_MANY_REQUESTS => Err(NonRetryableError::RateLimitExceeded(target)),
        StatusCode::NOT_FOUND => Err(NonRetryableError::NotFound(target)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(NonRetryableError::Forbidden(target))
        }
        s if s.is_client_error() => Err(NonRetryableError::ClientError(format!(
            "HTTP {} from {}",
            s.as_u16(),
            target
        ))),
        _ => Ok(()),
    }
}

/// Wrap an `error_for_status()` failure, tagging terminal ones so the retry
/// loop stops early.
pub fn check_retryable(error: reqwest::Error) -> anyhow::Error {
    match classify_error(&error) {
        Ok(()) => anyhow::Error::from(error),
        Err(non_retryable) => anyhow::Error::from(non_retryable),
    }
}
