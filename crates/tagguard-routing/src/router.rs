//! Confidence router

use crate::config::RoutingConfig;
use tagguard_core::{Result, RoutingDecision, TagResult};

/// Reason recorded when nothing survived taxonomy validation
pub const NO_VALID_TAGS_REASON: &str = "No valid taxonomy tags produced";

/// Decide whether validated tags can be published without review.
///
/// Confidences in the reason are printed at full precision so a value just
/// under the threshold never reads as equal to it.
///
/// Review is required when there are no tags, or when any tag's confidence
/// is strictly below `threshold`. Tags exactly at the threshold pass.
pub fn route(valid_tags: &[TagResult], threshold: f64) -> RoutingDecision {
    if valid_tags.is_empty() {
        return RoutingDecision::ai(true, NO_VALID_TAGS_REASON, threshold, 0.0);
    }

    let min_confidence = valid_tags
        .iter()
        .map(|t| t.confidence)
        .fold(f64::INFINITY, f64::min);

    let low: Vec<&TagResult> = valid_tags
        .iter()
        .filter(|t| !t.meets_threshold(threshold))
        .collect();

    if low.is_empty() {
        let reason = format!(
            "All {} tags meet confidence threshold {} (min: {})",
            valid_tags.len(),
            threshold,
            min_confidence
        );
        RoutingDecision::ai(false, reason, threshold, min_confidence)
    } else {
        let listed: Vec<String> = low
            .iter()
            .map(|t| format!("{} ({})", t.tag, t.confidence))
            .collect();
        let reason = format!("Low confidence tags: {}", listed.join(", "));
        RoutingDecision::ai(true, reason, threshold, min_confidence)
    }
}

/// [`route`] bound to a validated threshold
#[derive(Debug, Clone, Default)]
pub struct ConfidenceRouter {
    config: RoutingConfig,
}

impl ConfidenceRouter {
    pub fn new(config: RoutingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn threshold(&self) -> f64 {
        self.config.confidence_threshold
    }

    pub fn route(&self, valid_tags: &[TagResult]) -> RoutingDecision {
        route(valid_tags, self.config.confidence_threshold)
    }
}
