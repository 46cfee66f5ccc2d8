//! Per-dependency circuit breaker
//!
//! ```text
//!   CLOSED --(failure_threshold consecutive failures)--> OPEN
//!   OPEN ----(next call after timeout)-----------------> HALF_OPEN
//!   HALF_OPEN --(success_threshold consecutive successes)--> CLOSED
//!   HALF_OPEN --(any failure)--------------------------> OPEN
//! ```
//!
//! The OPEN → HALF_OPEN move is lazy: it happens on the first call after
//! `open_until`, never on a background timer. All counter updates and state
//! changes for one breaker happen under a single mutex; the lock is never
//! held across the wrapped operation.
//!
//! Every state change bumps a generation counter. A call records its outcome
//! only if the generation it was admitted under is still current, so a slow
//! call admitted while CLOSED cannot close or re-open a later HALF_OPEN
//! breaker.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tagguard_core::{Error, Result};
use tagguard_telemetry::events;
use tokio::time::Instant;
use tracing::debug;

/// Breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls pass through
    Closed,
    /// Calls are rejected without invoking the dependency
    Open,
    /// Probationary: calls are attempted, one failure re-opens
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Configuration for one circuit breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures in CLOSED that trip the breaker
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Consecutive successes in HALF_OPEN that close the breaker
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,

    /// How long the breaker stays OPEN (milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl CircuitBreakerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Reject thresholds that would make the state machine degenerate
    pub fn validate(&self) -> Result<()> {
        if self.failure_threshold == 0 {
            return Err(Error::validation("failure_threshold must be at least 1"));
        }
        if self.success_threshold == 0 {
            return Err(Error::validation("success_threshold must be at least 1"));
        }
        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            success_threshold: default_success_threshold(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_success_threshold() -> u32 {
    2
}

fn default_timeout_ms() -> u64 {
    60_000
}

/// Point-in-time view of a breaker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitBreakerStats {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    /// Time left before the next call may probe, while OPEN
    pub open_remaining_ms: Option<u64>,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    open_until: Option<Instant>,
    generation: u64,
}

/// A state change to report once the lock is released
struct Transition {
    from: CircuitState,
    to: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
}

impl BreakerState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            open_until: None,
            generation: 0,
        }
    }

    fn move_to(&mut self, to: CircuitState) -> Transition {
        let from = self.state;
        self.state = to;
        self.generation += 1;
        Transition {
            from,
            to,
            consecutive_failures: self.consecutive_failures,
            consecutive_successes: self.consecutive_successes,
        }
    }
}

/// Failure-isolation wrapper around a single upstream dependency
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a new breaker in the CLOSED state, rejecting an invalid config
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            config,
            state: Mutex::new(BreakerState::new()),
        })
    }

    /// Dependency name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state. An expired OPEN breaker still reports OPEN until the
    /// next call moves it to HALF_OPEN.
    pub fn state(&self) -> CircuitState {
        self.state.lock().state
    }

    /// Snapshot of counters and remaining open time
    pub fn stats(&self) -> CircuitBreakerStats {
        let guard = self.state.lock();
        let open_remaining_ms = match (guard.state, guard.open_until) {
            (CircuitState::Open, Some(until)) => {
                Some(until.saturating_duration_since(Instant::now()).as_millis() as u64)
            }
            _ => None,
        };

        CircuitBreakerStats {
            name: self.name.clone(),
            state: guard.state,
            consecutive_failures: guard.consecutive_failures,
            consecutive_successes: guard.consecutive_successes,
            open_remaining_ms,
        }
    }

    /// Run `operation` through the breaker.
    ///
    /// Returns [`Error::CircuitOpen`] without invoking `operation` while the
    /// breaker is OPEN and its timeout has not elapsed. Otherwise the
    /// operation's own result is returned unchanged after the outcome has
    /// been recorded.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let generation = self.acquire()?;

        match operation().await {
            Ok(value) => {
                self.on_success(generation);
                Ok(value)
            }
            Err(err) => {
                self.on_failure(generation);
                Err(err)
            }
        }
    }

    /// Force the breaker back to CLOSED with cleared counters
    pub fn reset(&self) {
        let transition = {
            let mut guard = self.state.lock();
            guard.consecutive_failures = 0;
            guard.consecutive_successes = 0;
            guard.open_until = None;
            if guard.state == CircuitState::Closed {
                None
            } else {
                Some(guard.move_to(CircuitState::Closed))
            }
        };

        if let Some(transition) = transition {
            self.report(transition);
        }
    }

    /// Admit or reject a call, moving an expired OPEN breaker to HALF_OPEN.
    /// Returns the generation the call was admitted under.
    fn acquire(&self) -> Result<u64> {
        let now = Instant::now();
        let mut guard = self.state.lock();

        if guard.state != CircuitState::Open {
            return Ok(guard.generation);
        }

        let open_until = guard.open_until;
        match open_until {
            Some(until) if now < until => {
                drop(guard);
                events::circuit_rejected(&self.name, until - now);
                Err(Error::circuit_open(&self.name))
            }
            _ => {
                guard.consecutive_successes = 0;
                guard.open_until = None;
                let transition = guard.move_to(CircuitState::HalfOpen);
                let generation = guard.generation;
                drop(guard);
                self.report(transition);
                Ok(generation)
            }
        }
    }

    fn on_success(&self, generation: u64) {
        let transition = {
            let mut guard = self.state.lock();
            if self.is_stale(&guard, generation, "success") {
                return;
            }
            match guard.state {
                CircuitState::Closed => {
                    guard.consecutive_failures = 0;
                    None
                }
                CircuitState::HalfOpen => {
                    guard.consecutive_successes += 1;
                    if guard.consecutive_successes >= self.config.success_threshold {
                        let transition = guard.move_to(CircuitState::Closed);
                        guard.consecutive_failures = 0;
                        guard.consecutive_successes = 0;
                        Some(transition)
                    } else {
                        None
                    }
                }
                CircuitState::Open => None,
            }
        };

        if let Some(transition) = transition {
            self.report(transition);
        }
    }

    fn on_failure(&self, generation: u64) {
        let transition = {
            let mut guard = self.state.lock();
            if self.is_stale(&guard, generation, "failure") {
                return;
            }
            match guard.state {
                CircuitState::Closed => {
                    guard.consecutive_failures += 1;
                    if guard.consecutive_failures >= self.config.failure_threshold {
                        Some(self.trip(&mut guard))
                    } else {
                        None
                    }
                }
                CircuitState::HalfOpen => {
                    guard.consecutive_failures += 1;
                    Some(self.trip(&mut guard))
                }
                CircuitState::Open => None,
            }
        };

        if let Some(transition) = transition {
            self.report(transition);
        }
    }

    /// The breaker changed state while this call was in flight
    fn is_stale(&self, guard: &BreakerState, generation: u64, outcome: &str) -> bool {
        if guard.generation == generation {
            return false;
        }
        debug!(
            dependency = %self.name,
            outcome,
            state = guard.state.as_str(),
            "Outcome from an earlier breaker state, ignoring"
        );
        true
    }

    fn trip(&self, guard: &mut BreakerState) -> Transition {
        guard.consecutive_successes = 0;
        guard.open_until = Some(Instant::now() + self.config.timeout());
        guard.move_to(CircuitState::Open)
    }

    fn report(&self, transition: Transition) {
        events::circuit_transition(
            &self.name,
            transition.from.as_str(),
            transition.to.as_str(),
            transition.consecutive_failures,
            transition.consecutive_successes,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tagguard_core::ErrorKind;

    fn config(failures: u32, successes: u32, timeout_ms: u64) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: failures,
            success_threshold: successes,
            timeout_ms,
        }
    }

    async fn fail(breaker: &CircuitBreaker) -> Error {
        breaker
            .execute(|| async { Err::<(), _>(Error::processing(ErrorKind::Unavailable, "503")) })
            .await
            .unwrap_err()
    }

    async fn succeed(breaker: &CircuitBreaker) -> Result<u32> {
        breaker.execute(|| async { Ok(7) }).await
    }

    #[test]
    fn test_config_defaults() {
        let cfg = CircuitBreakerConfig::default();
        assert_eq!(cfg.failure_threshold, 5);
        assert_eq!(cfg.success_threshold, 2);
        assert_eq!(cfg.timeout(), Duration::from_secs(60));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_zero_thresholds() {
        assert!(config(0, 2, 1000).validate().is_err());
        assert!(config(5, 0, 1000).validate().is_err());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = CircuitBreaker::new("text-model", config(0, 2, 1000)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_config_serde_defaults() {
        let cfg: CircuitBreakerConfig = serde_json::from_str(r#"{"failure_threshold": 3}"#).unwrap();
        assert_eq!(cfg, config(3, 2, 60_000));
    }

    #[tokio::test]
    async fn test_starts_closed() {
        let breaker = CircuitBreaker::new("text-model", CircuitBreakerConfig::default()).unwrap();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(succeed(&breaker).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_opens_at_threshold() {
        let breaker = CircuitBreaker::new("text-model", config(3, 2, 60_000)).unwrap();

        fail(&breaker).await;
        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Closed);

        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let breaker = CircuitBreaker::new("text-model", config(3, 2, 60_000)).unwrap();

        fail(&breaker).await;
        fail(&breaker).await;
        succeed(&breaker).await.unwrap();
        assert_eq!(breaker.stats().consecutive_failures, 0);

        fail(&breaker).await;
        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_propagates_original_error() {
        let breaker = CircuitBreaker::new("text-model", CircuitBreakerConfig::default()).unwrap();
        let err = fail(&breaker).await;

        match err {
            Error::Processing { kind, message, .. } => {
                assert_eq!(kind, ErrorKind::Unavailable);
                assert_eq!(message, "503");
            }
            other => panic!("expected original processing error, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_rejects_without_invoking() {
        let breaker = CircuitBreaker::new("video-model", config(1, 1, 60_000)).unwrap();
        fail(&breaker).await;

        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let err = breaker
            .execute(move || async move {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap_err();

        match err {
            Error::CircuitOpen { dependency } => assert_eq!(dependency, "video-model"),
            other => panic!("expected CircuitOpen, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(succeed(&breaker).await.unwrap_err().is_circuit_open());
        assert_eq!(breaker.stats().open_remaining_ms, Some(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_after_timeout_then_closes() {
        let breaker = CircuitBreaker::new("text-model", config(2, 2, 60_000)).unwrap();
        fail(&breaker).await;
        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(61)).await;

        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        breaker
            .execute(move || async move {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        succeed(&breaker).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::Closed);

        let stats = breaker.stats();
        assert_eq!(stats.consecutive_failures, 0);
        assert_eq!(stats.consecutive_successes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens() {
        let breaker = CircuitBreaker::new("text-model", config(1, 3, 10_000)).unwrap();
        fail(&breaker).await;

        tokio::time::advance(Duration::from_secs(11)).await;
        succeed(&breaker).await.unwrap();
        succeed(&breaker).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert_eq!(breaker.stats().consecutive_successes, 2);

        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.stats().consecutive_successes, 0);
        assert_eq!(breaker.stats().open_remaining_ms, Some(10_000));
        assert!(succeed(&breaker).await.unwrap_err().is_circuit_open());
    }

    #[tokio::test]
    async fn test_reset_closes() {
        let breaker = CircuitBreaker::new("text-model", config(1, 1, 60_000)).unwrap();
        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        breaker.reset();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(succeed(&breaker).await.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_outcome_from_closed_ignored_in_half_open() {
        let breaker = Arc::new(CircuitBreaker::new("text-model", config(1, 2, 10_000)).unwrap());

        // Admitted while CLOSED, completes only when released.
        let (release_ok, wait_ok) = tokio::sync::oneshot::channel::<()>();
        let slow_ok = tokio::spawn({
            let breaker = breaker.clone();
            async move {
                breaker
                    .execute(move || async move {
                        wait_ok.await.ok();
                        Ok(1u32)
                    })
                    .await
            }
        });
        let (release_err, wait_err) = tokio::sync::oneshot::channel::<()>();
        let slow_err = tokio::spawn({
            let breaker = breaker.clone();
            async move {
                breaker
                    .execute(move || async move {
                        wait_err.await.ok();
                        Err::<u32, _>(Error::processing(ErrorKind::Timeout, "slow"))
                    })
                    .await
            }
        });
        tokio::task::yield_now().await;

        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(11)).await;
        succeed(&breaker).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert_eq!(breaker.stats().consecutive_successes, 1);

        release_ok.send(()).unwrap();
        assert_eq!(slow_ok.await.unwrap().unwrap(), 1);
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert_eq!(breaker.stats().consecutive_successes, 1);

        release_err.send(()).unwrap();
        assert!(slow_err.await.unwrap().is_err());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        succeed(&breaker).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failures_trip_once() {
        let breaker = Arc::new(CircuitBreaker::new("text-model", config(5, 2, 60_000)).unwrap());

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let breaker = breaker.clone();
                tokio::spawn(async move {
                    breaker
                        .execute(|| async {
                            Err::<(), _>(Error::processing(ErrorKind::Timeout, "slow"))
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_err());
        }

        let stats = breaker.stats();
        assert_eq!(stats.state, CircuitState::Open);
        // Failures recorded after the trip are ignored, so the counter stops at the threshold.
        assert_eq!(stats.consecutive_failures, 5);
    }
}
