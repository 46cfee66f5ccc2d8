//! Core types for tagguard

use serde::{Deserialize, Serialize};

/// A single tag emitted by a model, with its confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagResult {
    /// Tag name (expected to be a taxonomy member)
    pub tag: String,

    /// Confidence score (0.0-1.0)
    pub confidence: f64,

    /// Optional model explanation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl TagResult {
    /// Create a new tag result
    pub fn new(tag: impl Into<String>, confidence: f64) -> Self {
        Self {
            tag: tag.into(),
            confidence,
            reasoning: None,
        }
    }

    /// Attach a reasoning string
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Check if confidence meets or exceeds the threshold
    pub fn meets_threshold(&self, threshold: f64) -> bool {
        self.confidence >= threshold
    }

    /// Confidence is a finite probability in [0, 1]
    pub fn is_well_formed(&self) -> bool {
        self.confidence.is_finite() && (0.0..=1.0).contains(&self.confidence)
    }
}

/// A point in a video selected for independent tagging
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSample {
    /// Zero-based position in the sample sequence
    pub frame_index: usize,

    /// Offset from the start of the video in seconds
    pub timestamp_seconds: f64,
}

impl FrameSample {
    pub fn new(frame_index: usize, timestamp_seconds: f64) -> Self {
        Self {
            frame_index,
            timestamp_seconds,
        }
    }
}

/// Who produced a routing decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DecisionSource {
    #[default]
    Ai,
    Human,
}

/// Publish/review decision for one content item.
///
/// Field names are serialized in camelCase so stored decisions keep a stable
/// schema regardless of which component wrote them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDecision {
    /// Whether a human must review before publishing
    pub needs_review: bool,

    /// Producer of the decision
    pub source: DecisionSource,

    /// Whether a human has reviewed the item
    pub reviewed: bool,

    /// Human-readable justification
    pub reason: String,

    /// Threshold the decision was computed against
    pub confidence_threshold: f64,

    /// Lowest confidence among the routed tags (0 when there were none)
    pub min_confidence: f64,
}

impl RoutingDecision {
    /// Create an unreviewed decision produced by the model path
    pub fn ai(
        needs_review: bool,
        reason: impl Into<String>,
        confidence_threshold: f64,
        min_confidence: f64,
    ) -> Self {
        Self {
            needs_review,
            source: DecisionSource::Ai,
            reviewed: false,
            reason: reason.into(),
            confidence_threshold,
            min_confidence,
        }
    }

    /// Whether the item can be published without review
    pub fn auto_publish(&self) -> bool {
        !self.needs_review
    }
}
