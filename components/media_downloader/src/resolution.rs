// components/media_downloader/src/resolution.rs
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::link::CanonicalLink;
use crate::types::{MediaService, MetadataRecord};

const NOT_FOUND: &str = "NOT FOUND";
const ERROR_PREFIX: &str = "ERROR: ";

/// What a lookup produced for one record.
///
/// Stored as a single string: the canonical link, `NOT FOUND`, or
/// `ERROR: <text>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LinkOutcome {
    Found(CanonicalLink),
    NotFound,
    Error(String),
}

impl LinkOutcome {
    pub fn link(&self) -> Option<&CanonicalLink> {
        match self {
            LinkOutcome::Found(link) => Some(link),
            _ => None,
        }
    }
}

impl fmt::Display for LinkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkOutcome::Found(link) => write!(f, "{}", link),
            LinkOutcome::NotFound => f.write_str(NOT_FOUND),
            LinkOutcome::Error(message) => write!(f, "{}{}", ERROR_PREFIX, message),
        }
    }
}

impl From<LinkOutcome> for String {
    fn from(outcome: LinkOutcome) -> Self {
        outcome.to_string()
    }
}

impl From<String> for LinkOutcome {
    fn from(raw: String) -> Self {
        if raw == NOT_FOUND {
            return LinkOutcome::NotFound;
        }
        if let Some(message) = raw.strip_prefix(ERROR_PREFIX) {
            return LinkOutcome::Error(message.to_string());
        }
        match CanonicalLink::normalize(&raw) {
            Ok(link) => LinkOutcome::Found(link),
            Err(rejected) => LinkOutcome::Error(rejected.to_string()),
        }
    }
}

/// Lookup result for one record, as written to checkpoint files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub track: String,
    pub album: String,
    pub artist: String,
    #[serde(rename = "youtube_link")]
    pub link: LinkOutcome,
    pub processed_at: DateTime<Utc>,
}

impl ResolutionResult {
    pub fn is_found(&self) -> bool {
        matches!(self.link, LinkOutcome::Found(_))
    }
}

/// Counts over a finished search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchSummary {
    pub total: usize,
    pub found: usize,
    /// Includes lookups that failed with an error
    pub not_found: usize,
}

impl SearchSummary {
    pub fn of(results: &[ResolutionResult]) -> Self {
        let found = results.iter().filter(|r| r.is_found()).count();
        Self {
            total: results.len(),
            found,
            not_found: results.len() - found,
        }
    }
}

/// Search query for a record: artist, track, album
pub fn search_query(record: &MetadataRecord) -> String {
    format!("{} {} {}", record.artist, record.track, record.album)
}

/// Turns metadata records into resolution results, one at a time
pub struct ResolutionEngine {
    service: Arc<dyn MediaService + Send + Sync>,
    last_processed_at: Mutex<Option<DateTime<Utc>>>,
}

impl ResolutionEngine {
    pub fn new(service: Arc<dyn MediaService + Send + Sync>) -> Self {
        Self {
            service,
            last_processed_at: Mutex::new(None),
        }
    }

    /// Look up one record. Never fails: a miss or a service error is
    /// recorded in the returned result.
    pub async fn resolve(&self, record: MetadataRecord) -> ResolutionResult {
        let query = search_query(&record);
        debug!("Searching: {}", query);

        let link = match self.service.resolve_query(&query).await {
            Ok(Some(id)) => match CanonicalLink::from_id(&id) {
                Ok(link) => LinkOutcome::Found(link),
                Err(rejected) => LinkOutcome::Error(rejected.to_string()),
            },
            Ok(None) => LinkOutcome::NotFound,
            Err(e) => {
                warn!("Search for '{}' failed: {}", query, e);
                LinkOutcome::Error(e.to_string())
            }
        };

        ResolutionResult {
            track: record.track,
            album: record.album,
            artist: record.artist,
            link,
            processed_at: self.timestamp(),
        }
    }

    /// Wall clock time, held back from going earlier than the last result
    fn timestamp(&self) -> DateTime<Utc> {
        let mut last = self.last_processed_at.lock();
        let now = match *last {
            Some(previous) if previous > Utc::now() => previous,
            _ => Utc::now(),
        };
        *last = Some(now);
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ytdlp::stub::MediaServiceStub;
    use assert_matches::assert_matches;

    fn engine(stub: MediaServiceStub) -> ResolutionEngine {
        ResolutionEngine::new(Arc::new(stub))
    }

    #[test]
    fn query_orders_artist_track_album() {
        let record = MetadataRecord::new("Hurt", "American IV", "Johnny Cash");
        assert_eq!(search_query(&record), "Johnny Cash Hurt American IV");
    }

    #[tokio::test]
    async fn found_match_becomes_canonical_link() {
        let stub = MediaServiceStub::new().with_match("Johnny Cash Hurt American IV", "8AHCfZTRGiI");
        let result = engine(stub)
            .resolve(MetadataRecord::new("Hurt", "American IV", "Johnny Cash"))
            .await;

        assert_eq!(result.track, "Hurt");
        assert_eq!(result.album, "American IV");
        assert_eq!(result.artist, "Johnny Cash");
        assert_matches!(
            result.link,
            LinkOutcome::Found(link) if link.as_str() == "https://www.youtube.com/watch?v=8AHCfZTRGiI"
        );
    }

    #[tokio::test]
    async fn missing_match_is_not_found() {
        let result = engine(MediaServiceStub::new())
            .resolve(MetadataRecord::new("Nothing", "Nowhere", "Nobody"))
            .await;

        assert_eq!(result.link, LinkOutcome::NotFound);
        assert!(!result.is_found());
    }

    #[tokio::test]
    async fn service_error_is_captured_as_data() {
        let stub = MediaServiceStub::new().with_search_error("Broken Song Album", "HTTP 429");
        let result = engine(stub)
            .resolve(MetadataRecord::new("Song", "Album", "Broken"))
            .await;

        assert_matches!(result.link, LinkOutcome::Error(text) if text.contains("HTTP 429"));
    }

    #[tokio::test]
    async fn timestamps_never_go_backwards() {
        let engine = engine(MediaServiceStub::new());
        let mut previous = None;
        for i in 0..5 {
            let result = engine
                .resolve(MetadataRecord::new(format!("t{}", i), "a", "b"))
                .await;
            if let Some(previous) = previous {
                assert!(result.processed_at >= previous);
            }
            previous = Some(result.processed_at);
        }
    }

    #[test]
    fn outcome_serialises_into_link_field() {
        let result = ResolutionResult {
            track: "Jolene".to_string(),
            album: "Jolene".to_string(),
            artist: "Dolly Parton".to_string(),
            link: LinkOutcome::Error("timed out".to_string()),
            processed_at: Utc::now(),
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["youtube_link"], "ERROR: timed out");
        assert!(value.get("link").is_none());

        let decoded: ResolutionResult = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, result);
    }

    #[test]
    fn outcome_markers_parse_back() {
        assert_eq!(LinkOutcome::from("NOT FOUND".to_string()), LinkOutcome::NotFound);
        assert_matches!(
            LinkOutcome::from("https://youtu.be/abc".to_string()),
            LinkOutcome::Found(link) if link.id() == "abc"
        );
        assert_matches!(
            LinkOutcome::from("ERROR: boom".to_string()),
            LinkOutcome::Error(text) if text == "boom"
        );
    }

    #[test]
    fn summary_counts_errors_as_not_found() {
        let make = |link| ResolutionResult {
            track: String::new(),
            album: String::new(),
            artist: String::new(),
            link,
            processed_at: Utc::now(),
        };
        let results = vec![
            make(LinkOutcome::Found(CanonicalLink::from_id("a").unwrap())),
            make(LinkOutcome::NotFound),
            make(LinkOutcome::Error("x".to_string())),
            make(LinkOutcome::Found(CanonicalLink::from_id("b").unwrap())),
        ];

        assert_eq!(
            SearchSummary::of(&results),
            SearchSummary {
                total: 4,
                found: 2,
                not_found: 2
            }
        );
    }
}
