// components/media_downloader/src/ytdlp.rs
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::format::FormatVariant;
use crate::link::CanonicalLink;
use crate::types::{DownloadError, FetchRequest, MediaService, ProbedMedia};

const YT_DLP: &str = "yt-dlp";
const FFMPEG: &str = "ffmpeg";

/// Media service backed by the `yt-dlp` command line tool
pub struct YtDlp;

#[async_trait]
impl MediaService for YtDlp {
    async fn check_available(&self) -> Result<(), DownloadError> {
        which::which(YT_DLP)
            .map(|_| ())
            .map_err(|_| DownloadError::DependencyNotFound(YT_DLP))
    }

    async fn resolve_query(&self, query: &str) -> Result<Option<String>, DownloadError> {
        let output = Command::new(YT_DLP)
            .arg("--dump-single-json")
            .arg("--flat-playlist")
            .arg("--quiet")
            .arg("--no-warnings")
            .arg(format!("ytsearch1:{}", query))
            .output()
            .await?;

        if !output.status.success() {
            return Err(DownloadError::ResolutionFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        parse_search(&output.stdout)
    }

    async fn probe_formats(&self, link: &CanonicalLink) -> Result<ProbedMedia, DownloadError> {
        debug!("Probing formats of {}", link);
        let output = Command::new(YT_DLP)
            .arg("--dump-json")
            .arg("--no-download")
            .arg("--quiet")
            .arg("--no-warnings")
            .arg(link.as_str())
            .output()
            .await?;

        if !output.status.success() {
            return Err(DownloadError::DownloadFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        parse_probe(&output.stdout)
    }

    async fn fetch_media(&self, request: &FetchRequest) -> Result<PathBuf, DownloadError> {
        let args = fetch_args(request);
        debug!("Running {} {}", YT_DLP, args.join(" "));

        let output = Command::new(YT_DLP).args(&args).output().await?;

        if !output.status.success() {
            return Err(DownloadError::DownloadFailed(format!(
                "{}: {}",
                request.link,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(PathBuf::from)
            .ok_or_else(|| {
                DownloadError::DownloadFailed(format!("{}: no output file reported", request.link))
            })
    }

    fn transcode_available(&self) -> bool {
        which::which(FFMPEG).is_ok()
    }
}

/// Command line for one fetch. The final file path is printed once all
/// post-processing has finished.
fn fetch_args(request: &FetchRequest) -> Vec<String> {
    let mut args = vec![
        "--quiet".to_string(),
        "--no-warnings".to_string(),
        "--no-playlist".to_string(),
        "--format".to_string(),
        request.format_spec.clone(),
        "--output".to_string(),
        request.output_template.clone(),
        "--print".to_string(),
        "after_move:filepath".to_string(),
    ];

    if let Some(transcode) = &request.transcode {
        args.push("--extract-audio".to_string());
        args.push("--audio-format".to_string());
        args.push(transcode.codec.to_string());
        args.push("--audio-quality".to_string());
        args.push(format!("{}K", transcode.bitrate.kbps()));
    }

    if !request.extras.subtitles.is_empty() {
        args.push("--write-subs".to_string());
        args.push("--sub-langs".to_string());
        args.push(request.extras.subtitles.join(","));
    }

    if request.extras.thumbnail {
        args.push("--write-thumbnail".to_string());
    }

    args.push(request.link.as_str().to_string());
    args
}

#[derive(Debug, Deserialize)]
struct YtDlpSearch {
    #[serde(default)]
    entries: Vec<YtDlpEntry>,
}

#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct YtDlpMetadata {
    title: String,
    uploader: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFormat {
    format_id: String,
    #[serde(default)]
    ext: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<u32>,
    fps: Option<f64>,
    abr: Option<f64>,
    filesize: Option<u64>,
    filesize_approx: Option<f64>,
}

fn has_codec(codec: &Option<String>) -> bool {
    codec
        .as_deref()
        .map_or(false, |c| !c.is_empty() && c != "none")
}

impl From<YtDlpFormat> for FormatVariant {
    fn from(format: YtDlpFormat) -> Self {
        FormatVariant {
            has_video: has_codec(&format.vcodec),
            has_audio: has_codec(&format.acodec),
            id: format.format_id,
            height: format.height,
            frame_rate: format.fps.map(|fps| fps.round() as u32),
            audio_bitrate: format.abr.map(|abr| abr.round() as u32),
            container: format.ext.unwrap_or_default(),
            approx_size_bytes: format
                .filesize
                .or(format.filesize_approx.map(|size| size as u64)),
        }
    }
}

fn parse_search(stdout: &[u8]) -> Result<Option<String>, DownloadError> {
    let search: YtDlpSearch =
        serde_json::from_slice(stdout).map_err(|e| DownloadError::ParseError(e.to_string()))?;
    Ok(search.entries.into_iter().next().map(|entry| entry.id))
}

fn parse_probe(stdout: &[u8]) -> Result<ProbedMedia, DownloadError> {
    let meta: YtDlpMetadata =
        serde_json::from_slice(stdout).map_err(|e| DownloadError::ParseError(e.to_string()))?;

    Ok(ProbedMedia {
        title: meta.title,
        uploader: meta.uploader,
        duration_seconds: meta.duration,
        variants: meta.formats.into_iter().map(FormatVariant::from).collect(),
    })
}

#[cfg(test)]
pub mod stub {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};

    /// Scripted media service that records what it was asked to fetch
    #[derive(Default)]
    pub struct MediaServiceStub {
        matches: HashMap<String, String>,
        search_errors: HashMap<String, String>,
        fetch_errors: HashSet<String>,
        probes: HashMap<String, ProbedMedia>,
        transcode: bool,
        requests: Mutex<Vec<FetchRequest>>,
    }

    impl MediaServiceStub {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_match(mut self, query: &str, id: &str) -> Self {
            self.matches.insert(query.to_string(), id.to_string());
            self
        }

        pub fn with_search_error(mut self, query: &str, message: &str) -> Self {
            self.search_errors
                .insert(query.to_string(), message.to_string());
            self
        }

        /// Fail every fetch of the video with this id
        pub fn with_fetch_error(mut self, id: &str) -> Self {
            self.fetch_errors.insert(id.to_string());
            self
        }

        pub fn with_probe(mut self, id: &str, probed: ProbedMedia) -> Self {
            self.probes.insert(id.to_string(), probed);
            self
        }

        pub fn with_transcoder(mut self) -> Self {
            self.transcode = true;
            self
        }

        pub fn fetch_requests(&self) -> Vec<FetchRequest> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl MediaService for MediaServiceStub {
        async fn check_available(&self) -> Result<(), DownloadError> {
            Ok(())
        }

        async fn resolve_query(&self, query: &str) -> Result<Option<String>, DownloadError> {
            if let Some(message) = self.search_errors.get(query) {
                return Err(DownloadError::ResolutionFailed(message.clone()));
            }
            Ok(self.matches.get(query).cloned())
        }

        async fn probe_formats(
            &self,
            link: &CanonicalLink,
        ) -> Result<ProbedMedia, DownloadError> {
            self.probes
                .get(link.id())
                .cloned()
                .ok_or_else(|| DownloadError::DownloadFailed(format!("no such video {}", link)))
        }

        async fn fetch_media(&self, request: &FetchRequest) -> Result<PathBuf, DownloadError> {
            self.requests.lock().push(request.clone());
            if self.fetch_errors.contains(request.link.id()) {
                return Err(DownloadError::DownloadFailed(format!(
                    "{}: video unavailable",
                    request.link
                )));
            }
            Ok(PathBuf::from(request.output_template.replace("%(ext)s", "mp3")))
        }

        fn transcode_available(&self) -> bool {
            self.transcode
        }
    }
}
