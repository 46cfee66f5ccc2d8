//! tagguard Video
//!
//! Turns a video into a bounded set of sample points and fuses the per-frame
//! tagging results back into one content-level tag list.
//!
//! - [`validate_format`]: container allow-list check on the URL path
//! - [`sample_frames`]: evenly spaced timestamps, capped video length and frame count
//! - [`aggregate_frame_tags`]: keep tags seen in enough frames, averaged

pub mod aggregate;
pub mod config;
pub mod format;
pub mod sampler;

pub use aggregate::aggregate_frame_tags;
pub use config::FrameSamplingConfig;
pub use format::{validate_format, VideoFormat, SUPPORTED_FORMATS};
pub use sampler::{sample_frames, sample_frames_with_cap, MAX_DURATION_SECS, MAX_FRAMES};
