//! Model invocation seam
//!
//! The pipeline treats a model as an opaque async callable. Production
//! deployments implement [`TaggingModel`] over their HTTP client; the CLI
//! uses [`RecordedModel`] to replay captured output.

use crate::item::RecordedItem;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use tagguard_core::{Error, ErrorKind, FrameSample, Result, TagResult};
use tagguard_resilience::external_error;

/// What the model is asked to tag
#[derive(Debug, Clone, PartialEq)]
pub enum ModelRequest {
    Text {
        content_id: String,
        text: String,
    },
    Frame {
        content_id: String,
        video_url: String,
        sample: FrameSample,
    },
}

impl ModelRequest {
    pub fn content_id(&self) -> &str {
        match self {
            Self::Text { content_id, .. } | Self::Frame { content_id, .. } => content_id,
        }
    }
}

/// An upstream tagging model
#[async_trait]
pub trait TaggingModel: Send + Sync {
    /// Model name, reported with hallucination events
    fn name(&self) -> &str;

    /// Tag one text body or one video frame
    async fn tag(&self, request: &ModelRequest) -> Result<Vec<TagResult>>;
}

struct Recording {
    tags: Vec<TagResult>,
    frames: Vec<Vec<TagResult>>,
}

/// Replays model output recorded alongside the input items
pub struct RecordedModel {
    name: String,
    recordings: HashMap<String, Recording>,
    transient_failures: u32,
    calls: AtomicU32,
}

impl RecordedModel {
    pub fn new(name: impl Into<String>, items: &[RecordedItem]) -> Self {
        let recordings = items
            .iter()
            .map(|recorded| {
                (
                    recorded.item.content_id.clone(),
                    Recording {
                        tags: recorded.recorded_tags.clone(),
                        frames: recorded.recorded_frames.clone(),
                    },
                )
            })
            .collect();

        Self {
            name: name.into(),
            recordings,
            transient_failures: 0,
            calls: AtomicU32::new(0),
        }
    }

    /// Fail the first `count` calls with an upstream throttling message
    pub fn with_transient_failures(mut self, count: u32) -> Self {
        self.transient_failures = count;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TaggingModel for RecordedModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn tag(&self, request: &ModelRequest) -> Result<Vec<TagResult>> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        if call < self.transient_failures {
            return Err(external_error("ThrottlingException: Rate exceeded"));
        }

        let recording = self.recordings.get(request.content_id()).ok_or_else(|| {
            Error::fatal(
                ErrorKind::InvalidRequest,
                format!("no recorded output for '{}'", request.content_id()),
            )
        })?;

        match request {
            ModelRequest::Text { .. } => Ok(recording.tags.clone()),
            ModelRequest::Frame { sample, .. } => Ok(recording
                .frames
                .get(sample.frame_index)
                .cloned()
                .unwrap_or_default()),
        }
    }
}
