//! Retry bounding and rate-limit backoff.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::error::OpenAIError;

/// How the client resends a failed request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt (so `max_retries + 1` sends at most)
    pub max_retries: u32,

    /// Wait used for a rate-limit error whose message carries no hint
    pub fallback_wait: Duration,

    /// Pause before retrying any other error; `None` retries immediately
    pub generic_backoff: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            fallback_wait: Duration::from_millis(1000),
            generic_backoff: None,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_fallback_wait(mut self, wait: Duration) -> Self {
        self.fallback_wait = wait;
        self
    }

    pub fn with_generic_backoff(mut self, backoff: Duration) -> Self {
        self.generic_backoff = Some(backoff);
        self
    }

    /// Decide what to do after attempt number `retry_count` (0-based) failed.
    pub fn next_step(&self, error: &OpenAIError, retry_count: u32) -> RetryStep {
        if !error.is_retryable() {
            return RetryStep::Fail;
        }
        if retry_count >= self.max_retries {
            return RetryStep::Exhausted;
        }
        match error {
            OpenAIError::Api { message, .. } if error.is_rate_limit() => RetryStep::Wait(
                parse_retry_after(message).unwrap_or(self.fallback_wait),
            ),
            _ => match self.generic_backoff {
                Some(backoff) => RetryStep::Wait(backoff),
                None => RetryStep::Immediate,
            },
        }
    }
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// Resend right away
    Immediate,
    /// Pause, then resend
    Wait(Duration),
    /// Bound reached
    Exhausted,
    /// Not retryable at all
    Fail,
}

fn retry_hint() -> &'static Regex {
    static HINT: OnceLock<Regex> = OnceLock::new();
    HINT.get_or_init(|| {
        Regex::new(r"(?i)try again in\s+(\d+(?:\.\d+)?)\s*(ms|s)\b")
            .expect("retry hint pattern is valid")
    })
}

/// Extract the wait suggested by a rate-limit message, e.g.
/// "Please try again in 250ms." or "Please try again in 1.5s.".
pub fn parse_retry_after(message: &str) -> Option<Duration> {
    let caps = retry_hint().captures(message)?;
    let amount: f64 = caps.get(1)?.as_str().parse().ok()?;
    let millis = match caps.get(2)?.as_str().to_ascii_lowercase().as_str() {
        "ms" => amount,
        _ => amount * 1000.0,
    };
    Some(Duration::from_millis(millis.ceil() as u64))
}
