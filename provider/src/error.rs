use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http {status}: {body}")]
    Http { status: u16, body: String, retry_after: Option<Duration> },
    #[error("network error: {0}")]
    Network(String),
    #[error("stream error: {0}")]
    Stream(String),
    #[error("request aborted")]
    Aborted,
    #[error("no credential available for provider {0}")]
    NoCredential(String),
    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

impl ProviderError {
    /// Retryable: the listed statuses, or a body matching the overload/rate-limit phrase set. Once the
    /// body is streaming, callers must not reach this path — only pre-byte errors are retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Http { status, body, .. } => {
                RETRYABLE_STATUSES.contains(status) || overload_phrase(body)
            }
            ProviderError::Network(_) => true,
            ProviderError::Stream(_) | ProviderError::Aborted | ProviderError::NoCredential(_) | ProviderError::RetriesExhausted { .. } => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

fn overload_phrase(body: &str) -> bool {
    let lower = body.to_lowercase();
    ["resource exhausted", "resource-exhausted", "rate limit", "rate-limit", "ratelimit", "overloaded", "service unavailable", "service-unavailable"]
        .iter()
        .any(|needle| lower.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses_are_retryable() {
        for status in RETRYABLE_STATUSES {
            let err = ProviderError::Http { status, body: String::new(), retry_after: None };
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn overload_phrase_in_body_is_retryable_regardless_of_status() {
        let err = ProviderError::Http { status: 400, body: "Error: the model is currently overloaded".into(), retry_after: None };
        assert!(err.is_retryable());
    }

    #[test]
    fn auth_errors_are_not_retryable() {
        let err = ProviderError::Http { status: 401, body: "unauthorized".into(), retry_after: None };
        assert!(!err.is_retryable());
    }

    #[test]
    fn stream_errors_are_not_retryable() {
        assert!(!ProviderError::Stream("boom".into()).is_retryable());
    }
}
