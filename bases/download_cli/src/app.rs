// bases/download_cli/src/app.rs
use std::path::Path;

use batch_runner::{BatchObserver, BatchRunner, CancellationToken, Checkpoint, Progress};
use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use media_downloader::{
    eligible_items, list_formats, load_records, load_resolved, resolve_batch, CheckpointWriter,
    DownloadError, DownloadObserver, DownloadOrchestrator, DownloadPlan, EligibleItem, FetchMode,
    MediaDownloader, MediaService, ResolutionResult, YtDlp,
};
use tracing::{info, warn};

use crate::config::{Config, DownloadConfig, FetchConfig, FormatsConfig, SearchConfig};
use crate::output::OutputHandler;

pub struct App {
    config: Config,
    output: OutputHandler,
    cancel: CancellationToken,
}

impl App {
    pub fn new(config: Config, verbose: bool, cancel: CancellationToken) -> Self {
        Self {
            config,
            output: OutputHandler::new(verbose),
            cancel,
        }
    }

    pub async fn run(&self) -> Result<()> {
        match &self.config {
            Config::Search(config) => self.search(config).await,
            Config::Download(config) => self.download(config).await,
            Config::Formats(config) => self.formats(config).await,
            Config::Fetch(config) => self.fetch(config).await,
        }
    }

    async fn search(&self, config: &SearchConfig) -> Result<()> {
        let records = load_records(&config.input)?;
        self.output
            .print_search_start(&config.input, records.len(), config.threshold.percent());

        let downloader = MediaDownloader::new(&config.output_dir).await?;
        let engine = downloader.resolution_engine();
        let runner = BatchRunner::with_cancellation(config.threshold, self.cancel.clone());
        let mut observer = SearchObserver {
            writer: CheckpointWriter::create(&config.output_dir)?,
            output: &self.output,
        };

        let run = resolve_batch(&engine, &runner, records, &mut observer)
            .await
            .wrap_err("Search stopped while saving a checkpoint")?;

        let latest = observer.writer.latest().map(|files| files.results.as_path());
        self.output.print_search_complete(&run, latest);
        Ok(())
    }

    async fn download(&self, config: &DownloadConfig) -> Result<()> {
        let items = load_resolved(&config.input)?;
        let eligible = eligible_items(&items);
        if eligible.is_empty() {
            bail!("No usable links in {}", config.input.display());
        }

        let downloader = MediaDownloader::new(&config.output_dir).await?;
        let transcode_available = downloader.service().transcode_available() && !config.force_original;
        if config.force_original {
            info!("Transcoding disabled, keeping original audio format");
        }

        let plan = DownloadPlan {
            cap: config.cap,
            transcode_available,
            quality: config.quality,
            output_dir: downloader.download_path().to_path_buf(),
            extras: config.extras.clone(),
        };
        self.output.print_download_preview(
            eligible.len(),
            eligible.len().min(plan.cap.get()),
            &plan.output_dir,
        );

        let orchestrator =
            DownloadOrchestrator::with_cancellation(downloader.service(), self.cancel.clone());
        let mut observer = DownloadProgress {
            output: &self.output,
        };
        let tally = orchestrator.run(eligible, &plan, &mut observer).await;

        let kept_original = FetchMode::for_quality(plan.quality, plan.transcode_available)
            .keeps_original_format();
        self.output.print_download_complete(&tally, kept_original);
        Ok(())
    }

    async fn formats(&self, config: &FormatsConfig) -> Result<()> {
        let service = YtDlp;
        service.check_available().await?;
        let (probed, catalog) = list_formats(&service, &config.link)
            .await
            .wrap_err_with(|| format!("Could not list formats for {}", config.link))?;
        self.output.print_formats(&probed, &catalog);
        Ok(())
    }

    async fn fetch(&self, config: &FetchConfig) -> Result<()> {
        self.output
            .print_rejected(&config.links.rejected, config.links.duplicates);

        let downloader = MediaDownloader::new(&config.output_dir).await?;
        let mut failed = 0;
        for link in &config.links.links {
            if self.cancel.is_cancelled() {
                bail!("Interrupted");
            }
            match downloader.download(link, &config.policy).await {
                Ok(fetched) => self.output.print_fetch_complete(&fetched),
                Err(e) => {
                    failed += 1;
                    warn!("Failed to fetch {}: {}", link, e);
                    eprintln!("Failed: {}: {}", link, e);
                }
            }
        }

        if failed > 0 {
            bail!("{} of {} downloads failed", failed, config.links.links.len());
        }
        Ok(())
    }

    pub fn print_error(&self, error: &color_eyre::Report) {
        self.output.print_error(error);
    }
}

/// Saves checkpoints and echoes progress to the terminal
struct SearchObserver<'a> {
    writer: CheckpointWriter,
    output: &'a OutputHandler,
}

impl BatchObserver<ResolutionResult> for SearchObserver<'_> {
    type Error = DownloadError;

    fn on_progress(&mut self, progress: Progress) {
        self.output.print_progress(progress);
    }

    fn on_checkpoint(&mut self, checkpoint: Checkpoint<ResolutionResult>) -> Result<(), Self::Error> {
        let files = self.writer.write(checkpoint.percent, &checkpoint.results)?;
        self.output.print_checkpoint(files);
        Ok(())
    }
}

struct DownloadProgress<'a> {
    output: &'a OutputHandler,
}

impl DownloadObserver for DownloadProgress<'_> {
    fn on_progress(&mut self, progress: Progress) {
        self.output.print_progress(progress);
    }

    fn on_item_done(&mut self, item: &EligibleItem, path: &Path) {
        self.output.print_item_done(item, path);
    }

    fn on_item_error(&mut self, item: &EligibleItem, error: &str) {
        self.output.print_item_error(item, error);
    }
}
