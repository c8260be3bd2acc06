// components/media_downloader/src/format.rs
//! Classification and selection of the encodings offered for one video.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("no format with both video and audio is available")]
    NoCombinedFormat,

    #[error("no video-only format is available")]
    NoVideoOnlyFormat,

    #[error("no audio-only format is available")]
    NoAudioOnlyFormat,

    #[error("custom format id must not be empty")]
    EmptyCustomFormat,
}

/// One encoding variant offered by the media service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatVariant {
    pub id: String,
    pub has_video: bool,
    pub has_audio: bool,
    pub height: Option<u32>,
    pub frame_rate: Option<u32>,
    /// Audio bitrate in kbps
    pub audio_bitrate: Option<u32>,
    pub container: String,
    pub approx_size_bytes: Option<u64>,
}

/// Selectable variants split by kind, best first.
///
/// Video kinds are ordered by height, audio by bitrate. Equal keys keep
/// the order of the original catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatCatalog {
    pub combined: Vec<FormatVariant>,
    pub video_only: Vec<FormatVariant>,
    pub audio_only: Vec<FormatVariant>,
}

/// Split a catalog into combined, video-only and audio-only variants.
///
/// Variants without any stream, video variants without a height and audio
/// variants without a bitrate cannot be ranked and are left out.
pub fn classify(variants: &[FormatVariant]) -> FormatCatalog {
    let mut catalog = FormatCatalog::default();

    for variant in variants {
        match (variant.has_video, variant.has_audio) {
            (true, true) if variant.height.is_some() => catalog.combined.push(variant.clone()),
            (true, false) if variant.height.is_some() => catalog.video_only.push(variant.clone()),
            (false, true) if variant.audio_bitrate.is_some() => {
                catalog.audio_only.push(variant.clone())
            }
            _ => {}
        }
    }

    // sort_by_key is stable
    catalog.combined.sort_by_key(|v| Reverse(v.height));
    catalog.video_only.sort_by_key(|v| Reverse(v.height));
    catalog.audio_only.sort_by_key(|v| Reverse(v.audio_bitrate));

    catalog
}

/// Which kind of encoding to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionPolicy {
    Combined,
    VideoOnly,
    AudioOnly,
    /// Caller-supplied format id, passed through to the fetcher unchecked
    Custom(String),
}

/// The variant picked by a [`SelectionPolicy`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatChoice {
    Combined(FormatVariant),
    /// Video stream only; the fetched file has no audio track
    VideoOnly(FormatVariant),
    AudioOnly(FormatVariant),
    Custom(String),
}

impl FormatChoice {
    pub fn format_id(&self) -> &str {
        match self {
            FormatChoice::Combined(v) | FormatChoice::VideoOnly(v) | FormatChoice::AudioOnly(v) => {
                &v.id
            }
            FormatChoice::Custom(id) => id,
        }
    }

    pub fn lacks_audio(&self) -> bool {
        matches!(self, FormatChoice::VideoOnly(_))
    }
}

impl FormatCatalog {
    pub fn is_empty(&self) -> bool {
        self.combined.is_empty() && self.video_only.is_empty() && self.audio_only.is_empty()
    }

    pub fn select(&self, policy: &SelectionPolicy) -> Result<FormatChoice, FormatError> {
        match policy {
            SelectionPolicy::Combined => self
                .combined
                .first()
                .cloned()
                .map(FormatChoice::Combined)
                .ok_or(FormatError::NoCombinedFormat),
            SelectionPolicy::VideoOnly => self
                .video_only
                .first()
                .cloned()
                .map(FormatChoice::VideoOnly)
                .ok_or(FormatError::NoVideoOnlyFormat),
            SelectionPolicy::AudioOnly => self
                .audio_only
                .first()
                .cloned()
                .map(FormatChoice::AudioOnly)
                .ok_or(FormatError::NoAudioOnlyFormat),
            SelectionPolicy::Custom(id) => {
                let id = id.trim();
                if id.is_empty() {
                    return Err(FormatError::EmptyCustomFormat);
                }
                Ok(FormatChoice::Custom(id.to_string()))
            }
        }
    }
}
