//! Video container allow-list

use serde::{Deserialize, Serialize};
use std::fmt;
use tagguard_core::{Error, Result};
use url::Url;

/// Container formats the frame extractor accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    Mp4,
    Mov,
    Avi,
    Mkv,
}

/// Allowed extensions, lowercase
pub const SUPPORTED_FORMATS: &[&str] = &["mp4", "mov", "avi", "mkv"];

impl VideoFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "mp4" => Some(Self::Mp4),
            "mov" => Some(Self::Mov),
            "avi" => Some(Self::Avi),
            "mkv" => Some(Self::Mkv),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
            Self::Avi => "avi",
            Self::Mkv => "mkv",
        }
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Check the file extension of a video URL against the allow-list.
///
/// Only the path is considered; query string and fragment are ignored.
/// Inputs that are not absolute URLs (bare keys, relative paths) are
/// handled by stripping everything from the first `?` or `#`.
pub fn validate_format(video_url: &str) -> Result<VideoFormat> {
    let path = match Url::parse(video_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => video_url
            .split(|c: char| c == '?' || c == '#')
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let file_name = path.rsplit('/').next().unwrap_or_default();
    let extension = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext,
        _ => {
            return Err(Error::format(format!(
                "no file extension in '{}' (supported: {})",
                video_url,
                SUPPORTED_FORMATS.join(", ")
            )))
        }
    };

    VideoFormat::from_extension(extension).ok_or_else(|| {
        Error::format(format!(
            "'.{}' is not supported (supported: {})",
            extension,
            SUPPORTED_FORMATS.join(", ")
        ))
    })
}
