// bases/download_cli/src/output.rs
use std::path::Path;

use batch_runner::{BatchRun, Progress};
use media_downloader::{
    CheckpointFiles, DownloadTally, EligibleItem, FetchedMedia, FormatCatalog, FormatVariant,
    ProbedMedia, Rejected, ResolutionResult, SearchSummary,
};

pub struct OutputHandler {
    verbose: bool,
}

impl OutputHandler {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn print_search_start(&self, input: &Path, total: usize, threshold: u32) {
        println!("Searching links for {} tracks from {}", total, input.display());
        println!("Saving a checkpoint every {}% of the list", threshold);
    }

    pub fn print_progress(&self, progress: Progress) {
        if self.verbose {
            println!(
                "  [{:>3}%] {}/{}",
                progress.percent(),
                progress.processed,
                progress.total
            );
        }
    }

    pub fn print_checkpoint(&self, files: &CheckpointFiles) {
        println!("Checkpoint {}%: {}", files.percent, files.results.display());
        if self.verbose {
            println!("  listing: {}", files.listing.display());
        }
    }

    pub fn print_search_complete(&self, run: &BatchRun<ResolutionResult>, latest: Option<&Path>) {
        let summary = SearchSummary::of(&run.results);
        if run.cancelled {
            println!(
                "\nSearch interrupted after {} of {} tracks",
                run.processed(),
                run.total
            );
        } else {
            println!("\nSearch complete");
        }
        println!("Processed: {}", summary.total);
        println!("Found: {}", summary.found);
        println!("Not found: {}", summary.not_found);
        if let Some(path) = latest {
            println!("Results: {}", path.display());
        }
    }

    pub fn print_download_preview(&self, eligible: usize, selected: usize, dir: &Path) {
        println!("{} tracks have a usable link", eligible);
        println!("Downloading {} into {}", selected, dir.display());
    }

    pub fn print_item_done(&self, item: &EligibleItem, path: &Path) {
        println!("Downloaded: {} - {}", item.artist, item.track);
        if self.verbose {
            println!("  saved to {}", path.display());
        }
    }

    pub fn print_item_error(&self, item: &EligibleItem, error: &str) {
        eprintln!("Failed: {} - {}: {}", item.artist, item.track, error);
    }

    pub fn print_download_complete(&self, tally: &DownloadTally, kept_original: bool) {
        if tally.cancelled {
            println!(
                "\nDownload interrupted after {} of {} tracks",
                tally.attempted(),
                tally.total
            );
        } else {
            println!("\nDownload finished");
        }
        println!("Successful: {}", tally.successful);
        println!("Failed: {}", tally.failed);
        println!("Total: {}", tally.total);
        if kept_original {
            println!("Note: files were kept in their original audio format (no ffmpeg)");
        }
    }

    pub fn print_formats(&self, probed: &ProbedMedia, catalog: &FormatCatalog) {
        println!("{}", probed.title);
        if let Some(uploader) = &probed.uploader {
            println!("Uploader: {}", uploader);
        }
        if let Some(duration) = probed.duration_seconds {
            println!("Duration: {:.1} seconds", duration);
        }

        if catalog.is_empty() {
            println!("\nNo selectable formats");
            return;
        }
        print_section("Video + audio", &catalog.combined);
        print_section("Video only", &catalog.video_only);
        print_section("Audio only", &catalog.audio_only);
    }

    pub fn print_rejected(&self, rejected: &[Rejected], duplicates: usize) {
        for entry in rejected {
            eprintln!("Skipping: {}", entry);
        }
        if duplicates > 0 {
            println!("Ignoring {} repeated links", duplicates);
        }
    }

    pub fn print_fetch_complete(&self, fetched: &FetchedMedia) {
        println!(
            "Downloaded: {} (format {}) to {}",
            fetched.title,
            fetched.choice.format_id(),
            fetched.path.display()
        );
        if fetched.choice.lacks_audio() {
            println!("  note: this file has no audio track");
        }
    }

    pub fn print_error(&self, error: &color_eyre::Report) {
        eprintln!("Error: {}", error);

        if self.verbose {
            eprintln!("\nError details:");
            error.chain().skip(1).for_each(|cause| {
                eprintln!("  caused by: {}", cause);
            });
        }
    }
}

fn print_section(title: &str, variants: &[FormatVariant]) {
    if variants.is_empty() {
        return;
    }
    println!("\n{}:", title);
    for variant in variants {
        println!("  {}", describe(variant));
    }
}

fn describe(variant: &FormatVariant) -> String {
    let mut line = format!("{:<8} {:<5}", variant.id, variant.container);
    if let Some(height) = variant.height {
        line.push_str(&format!(" {}p", height));
    }
    if let Some(fps) = variant.frame_rate {
        line.push_str(&format!(" {}fps", fps));
    }
    if let Some(abr) = variant.audio_bitrate {
        line.push_str(&format!(" {}kbps", abr));
    }
    if let Some(size) = variant.approx_size_bytes {
        line.push_str(&format!(" ~{:.1} MiB", size as f64 / (1024.0 * 1024.0)));
    }
    line
}
