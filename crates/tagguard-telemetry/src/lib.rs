//! tagguard Telemetry
//!
//! Observability for the tagging pipeline.
//!
//! Provides:
//! - Structured log events and `metrics` facade emission for circuit breaker
//!   transitions, rejections, retries, hallucinations and routing decisions
//! - In-process counters for batch summaries
//!
//! Every emission here is best-effort: without an installed recorder the
//! metric calls are no-ops and never fail the caller.

pub mod events;
pub mod metrics;

pub use metrics::{MetricsCollector, MetricsSnapshot};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::events;
    pub use crate::metrics::{MetricsCollector, MetricsSnapshot};
}
