// components/media_downloader/src/lib.rs
mod checkpoint;
mod format;
mod input;
mod link;
mod orchestrator;
mod resolution;
mod types;
mod utils;
mod ytdlp;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use batch_runner::{BatchObserver, BatchRun, BatchRunner};
use tracing::{info, warn};

pub use checkpoint::{
    listing_file_name, render_listing, results_file_name, CheckpointFiles, CheckpointWriter,
};
pub use format::{
    classify, FormatCatalog, FormatChoice, FormatError, FormatVariant, SelectionPolicy,
};
pub use input::{load_records, load_resolved};
pub use link::{normalize_all, CanonicalLink, NormalizedLinks, Rejected, LONG_FORM_PREFIX};
pub use orchestrator::{
    eligible_items, AudioQuality, DownloadObserver, DownloadOrchestrator, DownloadPlan,
    DownloadTally, EligibleItem, FetchMode,
};
pub use resolution::{search_query, LinkOutcome, ResolutionEngine, ResolutionResult, SearchSummary};
pub use types::{
    Bitrate, DownloadError, FetchExtras, FetchRequest, MediaService, MetadataRecord,
    ProbedMedia, ResolvedLinkItem, TranscodeSpec,
};
pub use utils::{output_template, sanitize_name};
pub use ytdlp::YtDlp;

/// Resolve every record in order, handing checkpoints to `observer`
pub async fn resolve_batch<Obs>(
    engine: &ResolutionEngine,
    runner: &BatchRunner,
    records: Vec<MetadataRecord>,
    observer: &mut Obs,
) -> Result<BatchRun<ResolutionResult>, Obs::Error>
where
    Obs: BatchObserver<ResolutionResult>,
{
    runner
        .run(records, move |record| engine.resolve(record), observer)
        .await
}

/// Probe a video and classify what it offers
pub async fn list_formats<S>(
    service: &S,
    link: &CanonicalLink,
) -> Result<(ProbedMedia, FormatCatalog), DownloadError>
where
    S: MediaService + ?Sized,
{
    let probed = service.probe_formats(link).await?;
    let catalog = classify(&probed.variants);
    Ok((probed, catalog))
}

/// A single fetched video
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub path: PathBuf,
    pub title: String,
    pub choice: FormatChoice,
}

pub struct MediaDownloader {
    download_path: PathBuf,
    service: Arc<dyn MediaService + Send + Sync>,
}

impl MediaDownloader {
    /// Create a new MediaDownloader that will store files in the given directory
    pub async fn new(download_path: impl AsRef<Path>) -> Result<Self, DownloadError> {
        Self::new_with_service(download_path, Arc::new(YtDlp)).await
    }

    /// Create a new MediaDownloader with a specific service implementation
    pub async fn new_with_service(
        download_path: impl AsRef<Path>,
        service: Arc<dyn MediaService + Send + Sync>,
    ) -> Result<Self, DownloadError> {
        service.check_available().await?;

        let download_path = download_path.as_ref().to_owned();
        tokio::fs::create_dir_all(&download_path).await?;

        Ok(Self {
            download_path,
            service,
        })
    }

    pub fn download_path(&self) -> &Path {
        &self.download_path
    }

    pub fn service(&self) -> Arc<dyn MediaService + Send + Sync> {
        Arc::clone(&self.service)
    }

    pub fn resolution_engine(&self) -> ResolutionEngine {
        ResolutionEngine::new(self.service())
    }

    pub fn orchestrator(&self) -> DownloadOrchestrator {
        DownloadOrchestrator::new(self.service())
    }

    pub async fn formats(
        &self,
        link: &CanonicalLink,
    ) -> Result<(ProbedMedia, FormatCatalog), DownloadError> {
        list_formats(self.service.as_ref(), link).await
    }

    /// Fetch one video in the format picked by `policy`
    pub async fn download(
        &self,
        link: &CanonicalLink,
        policy: &SelectionPolicy,
    ) -> Result<FetchedMedia, DownloadError> {
        let (probed, catalog) = self.formats(link).await?;
        let choice = catalog.select(policy)?;

        if choice.lacks_audio() {
            warn!("Format {} has no audio track", choice.format_id());
        }
        info!("Fetching '{}' as format {}", probed.title, choice.format_id());

        let file_name = format!("{} [{}].%(ext)s", sanitize_name(&probed.title), link.id());
        let request = FetchRequest {
            link: link.clone(),
            format_spec: choice.format_id().to_string(),
            output_template: self.download_path.join(file_name).to_string_lossy().into_owned(),
            transcode: None,
            extras: FetchExtras::default(),
        };

        let path = self.service.fetch_media(&request).await?;
        Ok(FetchedMedia {
            path,
            title: probed.title,
            choice,
        })
    }
}
