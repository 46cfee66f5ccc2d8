//! Fusion of per-frame tag lists into content-level tags

use std::collections::HashMap;
use tagguard_core::TagResult;
use tracing::debug;

/// Default share of frames a tag must appear in
pub const DEFAULT_MIN_FRAME_FRACTION: f64 = 0.20;

struct TagTally {
    first_seen: usize,
    frames: usize,
    confidence_sum: f64,
}

/// Aggregate independent per-frame results.
///
/// A tag survives when `frames_with_tag / total_frames >= min_frame_fraction`
/// (inclusive). Its confidence is the mean over the frames it appeared in,
/// not over all frames. A tag listed twice in one frame counts once for that
/// frame, using the higher confidence. Output is sorted by descending
/// confidence; ties keep first-seen order. No frames means no tags.
pub fn aggregate_frame_tags(frames: &[Vec<TagResult>], min_frame_fraction: f64) -> Vec<TagResult> {
    let total_frames = frames.len();
    if total_frames == 0 {
        return Vec::new();
    }

    let mut tallies: HashMap<&str, TagTally> = HashMap::new();
    for frame in frames {
        let mut best_in_frame: Vec<(&str, f64)> = Vec::with_capacity(frame.len());
        for result in frame {
            match best_in_frame.iter_mut().find(|(tag, _)| *tag == result.tag) {
                Some((_, best)) => *best = best.max(result.confidence),
                None => best_in_frame.push((result.tag.as_str(), result.confidence)),
            }
        }

        for (tag, confidence) in best_in_frame {
            let next_index = tallies.len();
            let tally = tallies.entry(tag).or_insert(TagTally {
                first_seen: next_index,
                frames: 0,
                confidence_sum: 0.0,
            });
            tally.frames += 1;
            tally.confidence_sum += confidence;
        }
    }

    let mut kept: Vec<(usize, TagResult)> = tallies
        .into_iter()
        .filter(|(_, tally)| tally.frames as f64 / total_frames as f64 >= min_frame_fraction)
        .map(|(tag, tally)| {
            let result = TagResult::new(tag, tally.confidence_sum / tally.frames as f64)
                .with_reasoning(format!(
                    "detected in {} of {} frames",
                    tally.frames, total_frames
                ));
            (tally.first_seen, result)
        })
        .collect();

    kept.sort_by_key(|(first_seen, _)| *first_seen);
    kept.sort_by(|(_, a), (_, b)| b.confidence.total_cmp(&a.confidence));

    debug!(
        total_frames,
        min_frame_fraction,
        kept = kept.len(),
        "Aggregated frame tags"
    );

    kept.into_iter().map(|(_, result)| result).collect()
}
