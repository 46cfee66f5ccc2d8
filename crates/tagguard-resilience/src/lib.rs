//! tagguard Resilience
//!
//! Safe invocation of unreliable upstream dependencies (text and vision
//! model APIs).
//!
//! - [`CircuitBreaker`]: per-dependency CLOSED / OPEN / HALF_OPEN state
//!   machine that short-circuits calls while a dependency is unhealthy
//! - [`CircuitBreakerRegistry`]: name → breaker map owned by the composition
//!   root and shared by reference
//! - [`retry`]: bounded exponential backoff with additive jitter
//! - [`classify`]: heuristic kind detection for errors we do not create
//!
//! Callers nest retry inside the breaker, so one breaker outcome covers
//! every retried attempt of a single call:
//!
//! ```rust,ignore
//! let breaker = registry.get_or_create("text-model", CircuitBreakerConfig::default())?;
//! let tags = breaker
//!     .execute(|| retry(|| model.tag(&request), &retry_config, &context))
//!     .await?;
//! ```

pub mod circuit_breaker;
pub mod classify;
pub mod registry;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
pub use classify::{classify_external_message, external_error};
pub use registry::CircuitBreakerRegistry;
pub use retry::{retry, RetryConfig, RetryContext};
