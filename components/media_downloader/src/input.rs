// components/media_downloader/src/input.rs
//! Batch files read at the start of a run.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::types::{DownloadError, MetadataRecord, ResolvedLinkItem};

/// Read the track list for a search run
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<MetadataRecord>, DownloadError> {
    load_array(path.as_ref())
}

/// Read a results file for a download run
pub fn load_resolved(path: impl AsRef<Path>) -> Result<Vec<ResolvedLinkItem>, DownloadError> {
    load_array(path.as_ref())
}

fn load_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, DownloadError> {
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| DownloadError::malformed(path, e))
}
