//! Routing configuration

use serde::{Deserialize, Serialize};
use tagguard_core::{Error, Result};

/// Confidence threshold supplied per deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Minimum per-tag confidence for auto-publish (inclusive)
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

impl RoutingConfig {
    pub fn new(confidence_threshold: f64) -> Result<Self> {
        let config = Self {
            confidence_threshold,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::validation(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        Ok(())
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

fn default_confidence_threshold() -> f64 {
    0.85
}
