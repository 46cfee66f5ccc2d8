//! Frame sampling math

use tagguard_core::{Error, FrameSample, Result};
use tracing::debug;

/// Hard cap on video length, in seconds
pub const MAX_DURATION_SECS: f64 = 3600.0;

/// Hard cap on sample points per video; each one costs a model call
pub const MAX_FRAMES: usize = 1000;

/// Number of sample points `0, interval, ...` that fit in `duration_secs`
pub(crate) fn frame_count(duration_secs: f64, interval_secs: f64) -> f64 {
    (duration_secs / interval_secs).floor() + 1.0
}

/// Sample points at `0, interval, 2*interval, ...` up to and including
/// `duration_secs`, for videos no longer than [`MAX_DURATION_SECS`] and
/// samplings of at most [`MAX_FRAMES`] points.
pub fn sample_frames(duration_secs: f64, interval_secs: f64) -> Result<Vec<FrameSample>> {
    sample_frames_with_cap(duration_secs, interval_secs, MAX_DURATION_SECS)
}

/// [`sample_frames`] with an explicit duration cap
pub fn sample_frames_with_cap(
    duration_secs: f64,
    interval_secs: f64,
    max_duration_secs: f64,
) -> Result<Vec<FrameSample>> {
    if !duration_secs.is_finite() || duration_secs < 0.0 {
        return Err(Error::validation(format!(
            "video duration must be a non-negative number of seconds, got {}",
            duration_secs
        )));
    }
    if !interval_secs.is_finite() || interval_secs <= 0.0 {
        return Err(Error::validation(format!(
            "frame interval must be positive, got {}",
            interval_secs
        )));
    }
    if duration_secs > max_duration_secs {
        return Err(Error::DurationExceeded {
            duration_secs,
            max_secs: max_duration_secs,
        });
    }
    let frames = frame_count(duration_secs, interval_secs);
    if frames > MAX_FRAMES as f64 {
        return Err(Error::validation(format!(
            "sampling {}s every {}s yields {} frames, more than the limit of {}",
            duration_secs, interval_secs, frames, MAX_FRAMES
        )));
    }

    // Timestamps are index * interval so long videos do not accumulate drift.
    let samples: Vec<FrameSample> = (0..)
        .map(|index| FrameSample::new(index, index as f64 * interval_secs))
        .take_while(|sample| sample.timestamp_seconds <= duration_secs)
        .take(MAX_FRAMES)
        .collect();

    debug!(
        duration_secs,
        interval_secs,
        frames = samples.len(),
        "Sampled video frames"
    );

    Ok(samples)
}
