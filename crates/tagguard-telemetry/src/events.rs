//! Structured observability events
//!
//! Each function writes one structured `tracing` event and updates the
//! matching `metrics` series. Field names are part of the operator contract:
//! dashboards and alerts key on `dependency`, `state`, `content_id`,
//! `model` and `invalid_tags`.

use std::fmt::Display;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const CIRCUIT_TRANSITIONS: &str = "tagguard_circuit_transitions_total";
pub const CIRCUIT_REJECTIONS: &str = "tagguard_circuit_rejections_total";
pub const CIRCUIT_STATE: &str = "tagguard_circuit_state";
pub const RETRY_ATTEMPTS: &str = "tagguard_retry_attempts_total";
pub const HALLUCINATIONS: &str = "tagguard_hallucinations_total";
pub const DECISIONS: &str = "tagguard_decisions_total";
pub const ITEM_LATENCY: &str = "tagguard_item_latency_us";

/// Register descriptions for every series emitted by this crate
pub fn describe_metrics() {
    ::metrics::describe_counter!(
        CIRCUIT_TRANSITIONS,
        "Circuit breaker state transitions by dependency"
    );
    ::metrics::describe_counter!(
        CIRCUIT_REJECTIONS,
        "Calls rejected by an open circuit breaker"
    );
    ::metrics::describe_gauge!(
        CIRCUIT_STATE,
        "Current breaker state (0 closed, 1 half-open, 2 open)"
    );
    ::metrics::describe_counter!(RETRY_ATTEMPTS, "Retries scheduled after a failed attempt");
    ::metrics::describe_counter!(
        HALLUCINATIONS,
        "Model-emitted tags absent from the taxonomy"
    );
    ::metrics::describe_counter!(DECISIONS, "Routing decisions by outcome");
    ::metrics::describe_histogram!(
        ITEM_LATENCY,
        ::metrics::Unit::Microseconds,
        "End-to-end processing latency per content item"
    );
}

fn state_gauge_value(state: &str) -> f64 {
    match state {
        "closed" => 0.0,
        "half_open" => 1.0,
        _ => 2.0,
    }
}

/// A circuit breaker changed state
pub fn circuit_transition(
    dependency: &str,
    from: &str,
    to: &str,
    consecutive_failures: u32,
    consecutive_successes: u32,
) {
    if to == "open" {
        warn!(
            dependency = %dependency,
            from = %from,
            state = %to,
            consecutive_failures,
            consecutive_successes,
            "Circuit breaker opened"
        );
    } else {
        info!(
            dependency = %dependency,
            from = %from,
            state = %to,
            consecutive_failures,
            consecutive_successes,
            "Circuit breaker state changed"
        );
    }

    ::metrics::counter!(
        CIRCUIT_TRANSITIONS,
        "dependency" => dependency.to_string(),
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
    ::metrics::gauge!(CIRCUIT_STATE, "dependency" => dependency.to_string())
        .set(state_gauge_value(to));
}

/// A call was short-circuited by an open breaker
pub fn circuit_rejected(dependency: &str, open_remaining: Duration) {
    warn!(
        dependency = %dependency,
        state = "open",
        open_remaining_ms = open_remaining.as_millis() as u64,
        "Circuit breaker rejected call"
    );

    ::metrics::counter!(CIRCUIT_REJECTIONS, "dependency" => dependency.to_string()).increment(1);
}

/// A failed attempt will be retried after `delay`
pub fn retry_scheduled(
    operation: &str,
    content_id: Option<&str>,
    attempt: u32,
    max_attempts: u32,
    delay: Duration,
    error: &dyn Display,
) {
    warn!(
        operation = %operation,
        content_id = content_id.unwrap_or("-"),
        attempt,
        max_attempts,
        delay_ms = delay.as_millis() as u64,
        error = %error,
        "Attempt failed, retrying"
    );

    ::metrics::counter!(RETRY_ATTEMPTS, "operation" => operation.to_string()).increment(1);
}

/// Retrying stopped; the error goes back to the caller
pub fn retry_gave_up(
    operation: &str,
    content_id: Option<&str>,
    attempt: u32,
    retryable: bool,
    error: &dyn Display,
) {
    if retryable {
        error!(
            operation = %operation,
            content_id = content_id.unwrap_or("-"),
            attempts = attempt,
            error = %error,
            "Retries exhausted"
        );
    } else {
        debug!(
            operation = %operation,
            content_id = content_id.unwrap_or("-"),
            attempts = attempt,
            error = %error,
            "Non-retryable error"
        );
    }
}

/// A model emitted tags outside the taxonomy
pub fn hallucination_detected(content_id: &str, model: &str, invalid_tags: &[String]) {
    if invalid_tags.is_empty() {
        return;
    }

    warn!(
        content_id = %content_id,
        model = %model,
        invalid_tags = ?invalid_tags,
        invalid_count = invalid_tags.len(),
        "HALLUCINATION DETECTED"
    );

    ::metrics::counter!(HALLUCINATIONS, "model" => model.to_string())
        .increment(invalid_tags.len() as u64);
}

/// A routing decision was made for an item
pub fn decision_recorded(content_id: &str, needs_review: bool, min_confidence: f64, reason: &str) {
    let outcome = if needs_review { "needs_review" } else { "auto_publish" };

    info!(
        content_id = %content_id,
        outcome,
        min_confidence,
        reason = %reason,
        "Routing decision"
    );

    ::metrics::counter!(DECISIONS, "outcome" => outcome).increment(1);
}

/// Record end-to-end latency for one item
pub fn item_latency(latency_us: u64) {
    ::metrics::histogram!(ITEM_LATENCY).record(latency_us as f64);
}
