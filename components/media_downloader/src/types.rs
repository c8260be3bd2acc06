// components/media_downloader/src/types.rs
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::{FormatError, FormatVariant};
use crate::link::CanonicalLink;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Required dependency not found: {0}")]
    DependencyNotFound(&'static str),

    #[error("Malformed batch file {path}: {reason}")]
    MalformedInput { path: PathBuf, reason: String },

    #[error("Failed to write checkpoint {path}")]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Resolution failed: {0}")]
    ResolutionFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Unsupported audio quality: {0} (expected 128, 192, 320, best or worst)")]
    InvalidQuality(String),

    #[error("Failed to parse yt-dlp output: {0}")]
    ParseError(String),

    #[error("Format selection failed: {0}")]
    Format(#[from] FormatError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DownloadError {
    pub fn malformed(path: impl AsRef<Path>, reason: impl fmt::Display) -> Self {
        DownloadError::MalformedInput {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn checkpoint(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DownloadError::Checkpoint {
            path: path.into(),
            source,
        }
    }
}

/// One track to look up, as exported from a playlist
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(rename = "Track Name", alias = "track", default)]
    pub track: String,

    #[serde(rename = "Album Name", alias = "album", default)]
    pub album: String,

    #[serde(rename = "Artist Name(s)", alias = "artist", default)]
    pub artist: String,
}

impl MetadataRecord {
    pub fn new(
        track: impl Into<String>,
        album: impl Into<String>,
        artist: impl Into<String>,
    ) -> Self {
        Self {
            track: track.into(),
            album: album.into(),
            artist: artist.into(),
        }
    }
}

/// An entry of a results file, as read back for downloading
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResolvedLinkItem {
    #[serde(default = "unknown")]
    pub track: String,

    #[serde(default = "unknown")]
    pub artist: String,

    #[serde(default)]
    pub youtube_link: Option<String>,
}

fn unknown() -> String {
    "Unknown".to_string()
}

/// Bitrates the transcoder is asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bitrate {
    Kbps128,
    Kbps192,
    Kbps320,
}

impl Bitrate {
    pub fn kbps(&self) -> u32 {
        match self {
            Bitrate::Kbps128 => 128,
            Bitrate::Kbps192 => 192,
            Bitrate::Kbps320 => 320,
        }
    }
}

impl FromStr for Bitrate {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "128" => Ok(Bitrate::Kbps128),
            "192" => Ok(Bitrate::Kbps192),
            "320" => Ok(Bitrate::Kbps320),
            other => Err(DownloadError::InvalidQuality(other.to_string())),
        }
    }
}

/// Re-encode the fetched audio into `codec` at `bitrate`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeSpec {
    pub codec: &'static str,
    pub bitrate: Bitrate,
}

/// Side files fetched next to the media
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchExtras {
    /// Subtitle language codes, e.g. `en`
    pub subtitles: Vec<String>,
    pub thumbnail: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub link: CanonicalLink,
    pub format_spec: String,
    /// Output path with a `%(ext)s` placeholder for the final extension
    pub output_template: String,
    pub transcode: Option<TranscodeSpec>,
    pub extras: FetchExtras,
}

/// Everything the service reports about one video before fetching it
#[derive(Debug, Clone, PartialEq)]
pub struct ProbedMedia {
    pub title: String,
    pub uploader: Option<String>,
    pub duration_seconds: Option<f64>,
    pub variants: Vec<FormatVariant>,
}

/// Search, probe and fetch capability backing the engines
#[async_trait::async_trait]
pub trait MediaService {
    /// Check if the service is available and has all required dependencies
    async fn check_available(&self) -> Result<(), DownloadError>;

    /// Search for `query` and return the identifier of the single best match
    async fn resolve_query(&self, query: &str) -> Result<Option<String>, DownloadError>;

    /// List the encodings offered for a video
    async fn probe_formats(&self, link: &CanonicalLink) -> Result<ProbedMedia, DownloadError>;

    /// Fetch one video and return the path of the written file
    async fn fetch_media(&self, request: &FetchRequest) -> Result<PathBuf, DownloadError>;

    /// Whether fetched audio can be re-encoded on this machine
    fn transcode_available(&self) -> bool;
}
