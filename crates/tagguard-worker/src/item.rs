//! Content items as delivered by the work queue

use serde::{Deserialize, Serialize};
use tagguard_core::TagResult;

/// One piece of content to tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub content_id: String,

    #[serde(flatten)]
    pub content: Content,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text {
        text: String,
    },
    Video {
        #[serde(rename = "videoUrl")]
        video_url: String,
        #[serde(rename = "durationSeconds")]
        duration_seconds: f64,
    },
}

impl ContentItem {
    pub fn text(content_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            content_id: content_id.into(),
            content: Content::Text { text: text.into() },
        }
    }

    pub fn video(
        content_id: impl Into<String>,
        video_url: impl Into<String>,
        duration_seconds: f64,
    ) -> Self {
        Self {
            content_id: content_id.into(),
            content: Content::Video {
                video_url: video_url.into(),
                duration_seconds,
            },
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self.content, Content::Video { .. })
    }
}

/// An input line carrying the item plus model output recorded for it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedItem {
    #[serde(flatten)]
    pub item: ContentItem,

    /// Tags returned for a text item
    #[serde(default)]
    pub recorded_tags: Vec<TagResult>,

    /// Tags returned per sampled frame, by frame index
    #[serde(default)]
    pub recorded_frames: Vec<Vec<TagResult>>,
}
