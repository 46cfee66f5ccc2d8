//! Retry with exponential backoff and jitter
//!
//! Delay before retry `n` (1-based attempt that just failed):
//! `min(initial_delay * multiplier^(n-1), max_delay)` plus up to `jitter`
//! of that value, drawn uniformly and added. The backoff sleep is
//! `tokio::time::sleep`, so other tasks keep running while an item waits.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tagguard_core::{Error, ErrorKind, Result};
use tagguard_telemetry::events;
use tracing::debug;

/// Retry behavior for one kind of call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds)
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Cap on the pre-jitter delay (milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Maximum additive jitter as a fraction of the delay; 0 disables it
    #[serde(default = "default_jitter")]
    pub jitter: f64,

    /// Error kinds eligible for retry
    #[serde(default = "default_retryable_kinds")]
    pub retryable_kinds: HashSet<ErrorKind>,
}

impl RetryConfig {
    /// Same configuration with jitter disabled
    pub fn without_jitter(mut self) -> Self {
        self.jitter = 0.0;
        self
    }

    /// Pre-jitter delay after `attempt` (1-based) failed
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_ms = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = delay_ms.min(self.max_delay_ms as f64);
        Duration::from_millis(capped as u64)
    }

    /// Delay after `attempt` failed, with jitter applied
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let delay = self.delay_for_attempt(attempt);
        if self.jitter <= 0.0 {
            return delay;
        }

        let factor = rand::thread_rng().gen_range(0.0..=self.jitter);
        delay + delay.mul_f64(factor)
    }

    /// Whether `err` should be retried under this configuration
    pub fn should_retry(&self, err: &Error) -> bool {
        !err.is_circuit_open() && err.is_retryable() && self.retryable_kinds.contains(&err.kind())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::validation("max_attempts must be at least 1"));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(Error::validation("backoff_multiplier must be >= 1.0"));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(Error::validation("jitter must be within [0, 1]"));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(Error::validation(
                "initial_delay_ms must not exceed max_delay_ms",
            ));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: default_jitter(),
            retryable_kinds: default_retryable_kinds(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> f64 {
    0.1
}

fn default_retryable_kinds() -> HashSet<ErrorKind> {
    [
        ErrorKind::Throttling,
        ErrorKind::Timeout,
        ErrorKind::Unavailable,
        ErrorKind::InternalService,
        ErrorKind::Network,
        ErrorKind::Connection,
    ]
    .into_iter()
    .collect()
}

/// Identifies the retried operation in log output
#[derive(Debug, Clone)]
pub struct RetryContext {
    pub operation: String,
    pub content_id: Option<String>,
}

impl RetryContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            content_id: None,
        }
    }

    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` is reached.
///
/// The returned error is always the one produced by the last attempt. An
/// invalid `config` fails with `Error::Validation` before `operation` runs.
pub async fn retry<F, Fut, T>(mut operation: F, config: &RetryConfig, context: &RetryContext) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    config.validate()?;
    let max_attempts = config.max_attempts;
    let content_id = context.content_id.as_deref();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = %context.operation,
                        content_id = content_id.unwrap_or("-"),
                        attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) => {
                let retryable = config.should_retry(&err);
                if !retryable || attempt >= max_attempts {
                    events::retry_gave_up(&context.operation, content_id, attempt, retryable, &err);
                    return Err(err);
                }

                let delay = config.jittered_delay(attempt);
                events::retry_scheduled(
                    &context.operation,
                    content_id,
                    attempt,
                    max_attempts,
                    delay,
                    &err,
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
