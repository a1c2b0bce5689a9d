//! Exponential-backoff-with-jitter retry wrapper for LLM calls.

use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{ErrorContext, GhostPathError};

/// Tunable retry parameters. Defaults match the specification: 3 retries,
/// 1s base delay, 60s cap, doubling backoff, jitter in `[0.75, 1.25]`.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

/// Classification of an LLM transport fault, distinguishing the three retry
/// policies from the non-retryable ones.
#[derive(Debug, Clone)]
pub enum LlmFault {
    /// Rate limited. `retry_after_ms` is the server-advertised hint, if any.
    RateLimited { retry_after_ms: Option<u64> },
    /// Transient connection or 5xx server fault.
    Transient,
    /// Wall-clock timeout. Never retried.
    Timeout,
    /// Non-rate-limit 4xx. Never retried.
    ClientError,
    /// Anything else. Never retried, mapped to kind `"unknown"`.
    Unknown,
}

impl RetryConfig {
    /// `min(max_delay, base_delay * 2^attempt) * jitter`, jitter uniform in
    /// `[0.75, 1.25]`. `attempt` is 0-based (the first retry is attempt 0).
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = 2u64.saturating_pow(attempt);
        let scaled = self.base_delay.saturating_mul(exp as u32);
        let capped = scaled.min(self.max_delay);
        let jitter = rand::thread_rng().gen_range(0.75..=1.25);
        Duration::from_secs_f64(capped.as_secs_f64() * jitter)
    }
}

/// Retry `operation` under the policy described in §4.2: rate limits and
/// transient faults are retried with backoff (honoring a server-provided
/// `retry_after_ms` hint when present); timeouts and client errors fail
/// immediately; anything else is mapped to `LLM_API_ERROR` kind `"unknown"`.
///
/// `operation` returns `Err((fault, error))` on failure so the retry loop can
/// classify without downcasting.
pub async fn retry_with_backoff<F, Fut, T>(
    config: RetryConfig,
    mut operation: F,
) -> Result<T, GhostPathError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, (LlmFault, GhostPathError)>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err((fault, err)) => {
                let retryable = matches!(fault, LlmFault::RateLimited { .. } | LlmFault::Transient);
                if !retryable || attempt >= config.max_retries {
                    return Err(err);
                }

                let delay = match &fault {
                    LlmFault::RateLimited {
                        retry_after_ms: Some(ms),
                    } => Duration::from_millis(*ms),
                    _ => config.backoff_delay(attempt),
                };

                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    fault = ?fault,
                    "retrying LLM call after transient failure"
                );

                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Map an unclassified transport error into `LLM_API_ERROR` kind `"unknown"`,
/// per the catch-all retry rule.
pub fn unknown_llm_error(message: impl Into<String>) -> GhostPathError {
    GhostPathError::LlmApiError {
        kind: "unknown".to_string(),
        message: message.into(),
        context: ErrorContext::new(),
    }
}

pub fn timeout_llm_error(message: impl Into<String>) -> GhostPathError {
    GhostPathError::LlmApiError {
        kind: "timeout".to_string(),
        message: message.into(),
        context: ErrorContext::new(),
    }
}

pub fn rate_limited_llm_error(
    message: impl Into<String>,
    retry_after_ms: Option<u64>,
) -> GhostPathError {
    let mut context = ErrorContext::new();
    if let Some(ms) = retry_after_ms {
        context = context.with_retry_after_ms(ms);
    }
    GhostPathError::LlmApiError {
        kind: "rate_limited".to_string(),
        message: message.into(),
        context,
    }
}
