//! Frame sampling configuration

use crate::aggregate::{aggregate_frame_tags, DEFAULT_MIN_FRAME_FRACTION};
use crate::sampler::{frame_count, sample_frames_with_cap, MAX_DURATION_SECS, MAX_FRAMES};
use serde::{Deserialize, Serialize};
use tagguard_core::{Error, FrameSample, Result, TagResult};

/// How videos are sampled and how frame results are fused
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSamplingConfig {
    /// Seconds between sampled frames
    #[serde(default = "default_interval_secs")]
    pub interval_secs: f64,

    /// Longest video accepted, in seconds
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: f64,

    /// Share of frames a tag must appear in to be kept
    #[serde(default = "default_min_frame_fraction")]
    pub min_frame_fraction: f64,

    /// Frames tagged concurrently for one video
    #[serde(default = "default_max_concurrent_frames")]
    pub max_concurrent_frames: usize,
}

impl FrameSamplingConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.interval_secs.is_finite() || self.interval_secs <= 0.0 {
            return Err(Error::validation("interval_secs must be positive"));
        }
        if !self.max_duration_secs.is_finite() || self.max_duration_secs <= 0.0 {
            return Err(Error::validation("max_duration_secs must be positive"));
        }
        if self.max_duration_secs > MAX_DURATION_SECS {
            return Err(Error::validation(format!(
                "max_duration_secs may not exceed {}",
                MAX_DURATION_SECS
            )));
        }
        if frame_count(self.max_duration_secs, self.interval_secs) > MAX_FRAMES as f64 {
            return Err(Error::validation(format!(
                "interval_secs {} over max_duration_secs {} exceeds {} frames",
                self.interval_secs, self.max_duration_secs, MAX_FRAMES
            )));
        }
        if !(0.0..=1.0).contains(&self.min_frame_fraction) {
            return Err(Error::validation("min_frame_fraction must be within [0, 1]"));
        }
        if self.max_concurrent_frames == 0 {
            return Err(Error::validation("max_concurrent_frames must be at least 1"));
        }
        Ok(())
    }

    /// Sample points for a video of `duration_secs`
    pub fn sample(&self, duration_secs: f64) -> Result<Vec<FrameSample>> {
        sample_frames_with_cap(duration_secs, self.interval_secs, self.max_duration_secs)
    }

    /// Fuse per-frame results with the configured fraction
    pub fn aggregate(&self, frames: &[Vec<TagResult>]) -> Vec<TagResult> {
        aggregate_frame_tags(frames, self.min_frame_fraction)
    }
}

impl Default for FrameSamplingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_duration_secs: default_max_duration_secs(),
            min_frame_fraction: default_min_frame_fraction(),
            max_concurrent_frames: default_max_concurrent_frames(),
        }
    }
}

fn default_interval_secs() -> f64 {
    15.0
}

fn default_max_duration_secs() -> f64 {
    MAX_DURATION_SECS
}

fn default_min_frame_fraction() -> f64 {
    DEFAULT_MIN_FRAME_FRACTION
}

fn default_max_concurrent_frames() -> usize {
    4
}
