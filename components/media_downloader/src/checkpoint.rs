// components/media_downloader/src/checkpoint.rs
//! Snapshot files written while a search batch runs.
//!
//! Each checkpoint produces a pair of self-contained files named after the
//! coverage percentage: `music_results_{N}percent.json` with every result so
//! far, and `music_list_{N}percent.txt` with a readable listing of the same.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use batch_runner::{BatchObserver, Checkpoint, Progress};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::resolution::ResolutionResult;
use crate::types::DownloadError;

const SEPARATOR_WIDTH: usize = 50;

pub fn results_file_name(percent: u32) -> String {
    format!("music_results_{}percent.json", percent)
}

pub fn listing_file_name(percent: u32) -> String {
    format!("music_list_{}percent.txt", percent)
}

/// Three lines per result: header, link, separator
pub fn render_listing(results: &[ResolutionResult]) -> String {
    let separator = "-".repeat(SEPARATOR_WIDTH);
    let mut listing = String::new();
    for (index, result) in results.iter().enumerate() {
        listing.push_str(&format!(
            "{}. {} - {} - {}\n",
            index + 1,
            result.track,
            result.album,
            result.artist
        ));
        listing.push_str(&format!("   Link: {}\n", result.link));
        listing.push_str(&separator);
        listing.push('\n');
    }
    listing
}

/// Files produced by one checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointFiles {
    pub percent: u32,
    pub results: PathBuf,
    pub listing: PathBuf,
}

/// Writes every checkpoint of a search run into one directory
pub struct CheckpointWriter {
    dir: PathBuf,
    written: Vec<CheckpointFiles>,
}

impl CheckpointWriter {
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, DownloadError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| DownloadError::checkpoint(&dir, e))?;
        Ok(Self {
            dir,
            written: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> &[CheckpointFiles] {
        &self.written
    }

    pub fn latest(&self) -> Option<&CheckpointFiles> {
        self.written.last()
    }

    /// Write both files for one snapshot
    pub fn write(
        &mut self,
        percent: u32,
        results: &[ResolutionResult],
    ) -> Result<&CheckpointFiles, DownloadError> {
        let json = serde_json::to_string_pretty(results)
            .map_err(|e| DownloadError::ParseError(e.to_string()))?;

        let results_path = self.dir.join(results_file_name(percent));
        let listing_path = self.dir.join(listing_file_name(percent));

        write_file(&self.dir, &results_path, json.as_bytes())?;
        write_file(&self.dir, &listing_path, render_listing(results).as_bytes())?;

        info!(
            "Checkpoint {}%: {} results saved to {}",
            percent,
            results.len(),
            results_path.display()
        );

        self.written.push(CheckpointFiles {
            percent,
            results: results_path,
            listing: listing_path,
        });
        Ok(&self.written[self.written.len() - 1])
    }
}

/// Write through a temporary file in `dir` so a reader never sees a partial
/// file. The temporary file is removed if anything fails.
fn write_file(dir: &Path, path: &Path, contents: &[u8]) -> Result<(), DownloadError> {
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| DownloadError::checkpoint(dir, e))?;
    tmp.write_all(contents)
        .map_err(|e| DownloadError::checkpoint(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| DownloadError::checkpoint(path, e.error))?;
    Ok(())
}

impl BatchObserver<ResolutionResult> for CheckpointWriter {
    type Error = DownloadError;

    fn on_progress(&mut self, progress: Progress) {
        debug!("Resolved {}/{}", progress.processed, progress.total);
    }

    fn on_checkpoint(&mut self, checkpoint: Checkpoint<ResolutionResult>) -> Result<(), Self::Error> {
        self.write(checkpoint.percent, &checkpoint.results)?;
        Ok(())
    }
}
