//! Retry policy: exponential backoff with a hard attempt cap. No concept
//! of falling back to an alternate model on repeated failure.

use std::time::Duration;

use regex::Regex;
use std::sync::LazyLock;

use crate::error::ProviderError;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig { max_retries: 3, base_delay_ms: 1000, max_delay_ms: 30_000, multiplier: 2.0 }
    }
}

#[derive(Debug, Clone)]
pub struct RetryContext {
    config: RetryConfig,
    attempt: u32,
    last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    GiveUp,
}

impl RetryContext {
    pub fn new(config: RetryConfig) -> Self {
        RetryContext { config, attempt: 0, last_error: None }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Records an attempt and decides whether to retry.
    pub fn decide(&mut self, error: &ProviderError) -> RetryDecision {
        self.attempt += 1;
        self.last_error = Some(error.to_string());
        if error.is_retryable() && self.attempt <= self.config.max_retries {
            RetryDecision::Retry { delay: self.calculate_delay(error) }
        } else {
            RetryDecision::GiveUp
        }
    }

    fn calculate_delay(&self, error: &ProviderError) -> Duration {
        if let Some(hint) = error.retry_after() {
            return hint.min(Duration::from_millis(self.config.max_delay_ms));
        }
        let base = self.config.base_delay_ms as f64;
        let delay_ms = (base * self.config.multiplier.powi(self.attempt as i32 - 1)).min(self.config.max_delay_ms as f64);
        Duration::from_millis(delay_ms as u64)
    }

    pub fn exhausted_error(&self) -> ProviderError {
        ProviderError::RetriesExhausted { attempts: self.attempt, last_error: self.last_error.clone().unwrap_or_else(|| "unknown".to_string()) }
    }
}

#[allow(clippy::expect_used)]
static RESET_AFTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)reset after\s+((?:\d+h)?(?:\d+m)?(?:\d+(?:\.\d+)?s)?)").expect("valid regex"));
#[allow(clippy::expect_used)]
static RETRY_IN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(?:retry|try again) in\s+(\d+)\s*(ms|s)\b").expect("valid regex"));
#[allow(clippy::expect_used)]
static RETRY_DELAY_FIELD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?i)"?retryDelay"?\s*[:=]\s*"?(\d+(?:\.\d+)?)s"?"#).expect("valid regex"));
#[allow(clippy::expect_used)]
static DURATION_PART: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)(h|m|s)").expect("valid regex"));

/// Parses a server-provided retry hint out of an error body: `"reset after 1h2m3s"`, `"please retry
/// in 500ms"`, `"retryDelay": "34.0s"`.
pub fn parse_retry_hint(body: &str) -> Option<Duration> {
    if let Some(caps) = RESET_AFTER.captures(body) {
        if let Some(d) = parse_compound_duration(&caps[1]) {
            return Some(d);
        }
    }
    if let Some(caps) = RETRY_IN.captures(body) {
        let amount: u64 = caps[1].parse().ok()?;
        return Some(match &caps[2].to_lowercase()[..] {
            "ms" => Duration::from_millis(amount),
            "s" => Duration::from_secs(amount),
            _ => return None,
        });
    }
    if let Some(caps) = RETRY_DELAY_FIELD.captures(body) {
        let secs: f64 = caps[1].parse().ok()?;
        return Some(Duration::from_secs_f64(secs));
    }
    None
}

fn parse_compound_duration(s: &str) -> Option<Duration> {
    let mut total = Duration::ZERO;
    let mut matched_any = false;
    for caps in DURATION_PART.captures_iter(s) {
        matched_any = true;
        let amount: f64 = caps[1].parse().ok()?;
        total += match &caps[2] {
            "h" => Duration::from_secs_f64(amount * 3600.0),
            "m" => Duration::from_secs_f64(amount * 60.0),
            "s" => Duration::from_secs_f64(amount),
            _ => return None,
        };
    }
    matched_any.then_some(total)
}

/// Hints beyond an hour are not honored: treated as absent so the caller falls back to exponential
/// backoff instead of sleeping for an unreasonable time.
pub fn sanitize_hint(hint: Option<Duration>) -> Option<Duration> {
    hint.filter(|d| *d <= Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn parses_reset_after_compound_duration() {
        let hint = parse_retry_hint("rate limited, reset after 1h2m3s");
        assert_eq!(hint, Some(Duration::from_secs(3600 + 120 + 3)));
    }

    #[test]
    fn parses_retry_in_milliseconds() {
        assert_eq!(parse_retry_hint("please retry in 500ms"), Some(Duration::from_millis(500)));
    }

    #[test]
    fn parses_retry_delay_field() {
        assert_eq!(parse_retry_hint(r#"{"retryDelay": "34.0s"}"#), Some(Duration::from_secs_f64(34.0)));
    }

    #[test]
    fn hints_over_an_hour_are_not_honored() {
        assert_eq!(sanitize_hint(Some(Duration::from_secs(7200))), None);
    }

    #[test]
    fn exponential_backoff_without_hint() {
        let mut ctx = RetryContext::new(RetryConfig { base_delay_ms: 100, multiplier: 2.0, ..Default::default() });
        let error = ProviderError::Network("x".into());
        let RetryDecision::Retry { delay } = ctx.decide(&error) else { panic!("expected retry") };
        assert_eq!(delay, Duration::from_millis(100));
        let RetryDecision::Retry { delay } = ctx.decide(&error) else { panic!("expected retry") };
        assert_eq!(delay, Duration::from_millis(200));
    }

    #[test]
    fn gives_up_after_max_retries() {
        let mut ctx = RetryContext::new(RetryConfig { max_retries: 1, ..Default::default() });
        let error = ProviderError::Network("x".into());
        ctx.decide(&error);
        assert_eq!(ctx.decide(&error), RetryDecision::GiveUp);
    }

    #[test]
    fn non_retryable_errors_give_up_immediately() {
        let mut ctx = RetryContext::new(RetryConfig::default());
        let error = ProviderError::Http { status: 401, body: String::new(), retry_after: None };
        assert_eq!(ctx.decide(&error), RetryDecision::GiveUp);
    }
}
