//! In-process counters for batch summaries

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics collector for tagging throughput and outcomes
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    items_processed: AtomicU64,
    auto_published: AtomicU64,
    needs_review: AtomicU64,
    failed_items: AtomicU64,
    circuit_rejections: AtomicU64,
    hallucinated_tags: AtomicU64,
    total_latency_us: AtomicU64,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                items_processed: AtomicU64::new(0),
                auto_published: AtomicU64::new(0),
                needs_review: AtomicU64::new(0),
                failed_items: AtomicU64::new(0),
                circuit_rejections: AtomicU64::new(0),
                hallucinated_tags: AtomicU64::new(0),
                total_latency_us: AtomicU64::new(0),
            }),
        }
    }

    /// Record a routed item
    pub fn record_decision(&self, needs_review: bool) {
        self.inner.items_processed.fetch_add(1, Ordering::Relaxed);
        if needs_review {
            self.inner.needs_review.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner.auto_published.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an item that failed before routing
    pub fn record_failure(&self, circuit_open: bool) {
        self.inner.items_processed.fetch_add(1, Ordering::Relaxed);
        self.inner.failed_items.fetch_add(1, Ordering::Relaxed);
        if circuit_open {
            self.inner.circuit_rejections.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record tags discarded as hallucinations
    pub fn record_hallucinations(&self, count: u64) {
        self.inner
            .hallucinated_tags
            .fetch_add(count, Ordering::Relaxed);
    }

    /// Record latency
    pub fn record_latency(&self, latency_us: u64) {
        self.inner
            .total_latency_us
            .fetch_add(latency_us, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_processed: self.inner.items_processed.load(Ordering::Relaxed),
            auto_published: self.inner.auto_published.load(Ordering::Relaxed),
            needs_review: self.inner.needs_review.load(Ordering::Relaxed),
            failed_items: self.inner.failed_items.load(Ordering::Relaxed),
            circuit_rejections: self.inner.circuit_rejections.load(Ordering::Relaxed),
            hallucinated_tags: self.inner.hallucinated_tags.load(Ordering::Relaxed),
            total_latency_us: self.inner.total_latency_us.load(Ordering::Relaxed),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub items_processed: u64,
    pub auto_published: u64,
    pub needs_review: u64,
    pub failed_items: u64,
    pub circuit_rejections: u64,
    pub hallucinated_tags: u64,
    pub total_latency_us: u64,
}

impl MetricsSnapshot {
    /// Items that reached a routing decision
    pub fn routed(&self) -> u64 {
        self.auto_published + self.needs_review
    }

    /// Share of routed items sent to human review
    pub fn review_rate(&self) -> f64 {
        let routed = self.routed();
        if routed == 0 {
            0.0
        } else {
            self.needs_review as f64 / routed as f64
        }
    }

    /// Calculate average latency per processed item
    pub fn avg_latency_us(&self) -> u64 {
        if self.items_processed == 0 {
            0
        } else {
            self.total_latency_us / self.items_processed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        let metrics = MetricsCollector::new();

        metrics.record_decision(false);
        metrics.record_decision(true);
        metrics.record_decision(true);
        metrics.record_failure(true);
        metrics.record_hallucinations(3);
        metrics.record_latency(4000);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.items_processed, 4);
        assert_eq!(snapshot.auto_published, 1);
        assert_eq!(snapshot.needs_review, 2);
        assert_eq!(snapshot.failed_items, 1);
        assert_eq!(snapshot.circuit_rejections, 1);
        assert_eq!(snapshot.hallucinated_tags, 3);
        assert_eq!(snapshot.avg_latency_us(), 1000);
        assert!((snapshot.review_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_snapshot_rates() {
        let snapshot = MetricsCollector::new().snapshot();
        assert_eq!(snapshot.review_rate(), 0.0);
        assert_eq!(snapshot.avg_latency_us(), 0);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = MetricsCollector::new();
        let clone = metrics.clone();
        clone.record_decision(false);
        assert_eq!(metrics.snapshot().auto_published, 1);
    }
}
