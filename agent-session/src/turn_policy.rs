//! Facade-level classification of a failed turn. `AgentCore` surfaces a failed turn as an
//! `Assistant` message with `stop_reason: Error` and a provider-supplied `error_message` string
//! rather than a typed error — the structured `ProviderError` that produced it doesn't survive past
//! the stream, since by the time it reaches here every transport-level retry already ran out (see
//! `kestrel_provider::retry::RetryContext`). Classification here is therefore a second, coarser
//! heuristic layer on top of that string, mirroring the phrase set
//! `kestrel_provider::error::overload_phrase` uses for the same purpose at the transport layer.

use std::time::Duration;

use kestrel_provider::RetryConfig;

const OVERLOAD_PHRASES: [&str; 7] = ["resource exhausted", "resource-exhausted", "rate limit", "rate-limit", "ratelimit", "overloaded", "service unavailable"];
const CONTEXT_OVERFLOW_PHRASES: [&str; 4] = ["context length", "context_length", "maximum context", "too many tokens"];

pub fn looks_transient(error_message: &str) -> bool {
    let lower = error_message.to_lowercase();
    OVERLOAD_PHRASES.iter().any(|needle| lower.contains(needle)) || lower.contains("network error") || lower.contains("http 429") || lower.contains("http 503")
}

pub fn looks_like_context_overflow(error_message: &str) -> bool {
    let lower = error_message.to_lowercase();
    CONTEXT_OVERFLOW_PHRASES.iter().any(|needle| lower.contains(needle))
}

/// Exponential backoff for the facade's own retry attempt counter, reusing
/// `RetryConfig`'s shape so the same settings tune both the transport-level
/// and turn-level retry layers.
pub fn backoff_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let base = config.base_delay_ms as f64;
    let delay_ms = (base * config.multiplier.powi(attempt as i32 - 1)).min(config.max_delay_ms as f64);
    Duration::from_millis(delay_ms as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overload_phrase_is_transient() {
        assert!(looks_transient("http 429: rate limit exceeded"));
    }

    #[test]
    fn auth_failure_is_not_transient() {
        assert!(!looks_transient("http 401: unauthorized"));
    }

    #[test]
    fn context_length_phrase_is_detected() {
        assert!(looks_like_context_overflow("this model's maximum context length is 200000 tokens"));
    }

    #[test]
    fn backoff_grows_with_attempt() {
        let config = RetryConfig { max_retries: 5, base_delay_ms: 100, max_delay_ms: 10_000, multiplier: 2.0 };
        assert_eq!(backoff_delay(1, &config), Duration::from_millis(100));
        assert_eq!(backoff_delay(2, &config), Duration::from_millis(200));
    }
}
