// components/media_downloader/src/orchestrator.rs
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use batch_runner::{CancellationToken, Progress};
use tracing::{debug, info, warn};

use crate::link::{CanonicalLink, LONG_FORM_PREFIX};
use crate::types::{
    Bitrate, DownloadError, FetchExtras, FetchRequest, MediaService, ResolvedLinkItem,
    TranscodeSpec,
};
use crate::utils::output_template;

const TRANSCODE_CODEC: &str = "mp3";
const TRANSCODE_SOURCE_FORMAT: &str = "bestaudio/best";
const ORIGINAL_BEST_FORMAT: &str = "bestaudio[ext=m4a]/bestaudio/best";
const ORIGINAL_WORST_FORMAT: &str = "worstaudio";

/// Audio quality requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioQuality {
    Best,
    Worst,
    Bitrate(Bitrate),
}

impl FromStr for AudioQuality {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "best" => Ok(AudioQuality::Best),
            "worst" => Ok(AudioQuality::Worst),
            other => other.parse().map(AudioQuality::Bitrate),
        }
    }
}

/// Format and transcode settings used for every item of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMode {
    pub format_spec: &'static str,
    pub transcode: Option<TranscodeSpec>,
}

impl FetchMode {
    /// Map a quality request onto what this machine can do.
    ///
    /// Without a transcoder the original audio stream is kept: `worst` picks
    /// the smallest one, anything else the best one.
    pub fn for_quality(quality: AudioQuality, transcode_available: bool) -> Self {
        if transcode_available {
            let bitrate = match quality {
                AudioQuality::Best => Bitrate::Kbps320,
                AudioQuality::Worst => Bitrate::Kbps128,
                AudioQuality::Bitrate(bitrate) => bitrate,
            };
            return Self {
                format_spec: TRANSCODE_SOURCE_FORMAT,
                transcode: Some(TranscodeSpec {
                    codec: TRANSCODE_CODEC,
                    bitrate,
                }),
            };
        }

        let format_spec = match quality {
            AudioQuality::Worst => ORIGINAL_WORST_FORMAT,
            AudioQuality::Best | AudioQuality::Bitrate(_) => ORIGINAL_BEST_FORMAT,
        };
        Self {
            format_spec,
            transcode: None,
        }
    }

    pub fn keeps_original_format(&self) -> bool {
        self.transcode.is_none()
    }
}

/// A results entry that carries a usable link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleItem {
    pub track: String,
    pub artist: String,
    pub link: CanonicalLink,
}

/// Keep entries whose link is in the exact long form. Markers for missing or
/// failed lookups are dropped. Two tracks sharing a video both stay, since
/// each is saved under its own name.
pub fn eligible_items(items: &[ResolvedLinkItem]) -> Vec<EligibleItem> {
    let mut eligible = Vec::new();

    for item in items {
        let Some(raw) = item.youtube_link.as_deref() else {
            continue;
        };
        if !raw.starts_with(LONG_FORM_PREFIX) {
            continue;
        }
        let Ok(link) = CanonicalLink::normalize(raw) else {
            continue;
        };
        eligible.push(EligibleItem {
            track: item.track.clone(),
            artist: item.artist.clone(),
            link,
        });
    }

    eligible
}

/// Settings for one download run
#[derive(Debug, Clone)]
pub struct DownloadPlan {
    pub cap: NonZeroUsize,
    /// Probed once before the run starts
    pub transcode_available: bool,
    pub quality: AudioQuality,
    pub output_dir: PathBuf,
    pub extras: FetchExtras,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadTally {
    pub successful: usize,
    pub failed: usize,
    /// Items selected for the run, fixed before the first fetch
    pub total: usize,
    /// Stopped before every selected item was attempted
    pub cancelled: bool,
}

impl DownloadTally {
    pub fn new(total: usize) -> Self {
        Self {
            successful: 0,
            failed: 0,
            total,
            cancelled: false,
        }
    }

    pub fn attempted(&self) -> usize {
        self.successful + self.failed
    }
}

pub trait DownloadObserver {
    fn on_progress(&mut self, _progress: Progress) {}

    fn on_item_done(&mut self, _item: &EligibleItem, _path: &Path) {}

    fn on_item_error(&mut self, item: &EligibleItem, error: &str);
}

/// Fetches eligible items one by one and tallies the outcome
pub struct DownloadOrchestrator {
    service: Arc<dyn MediaService + Send + Sync>,
    cancel: CancellationToken,
}

impl DownloadOrchestrator {
    pub fn new(service: Arc<dyn MediaService + Send + Sync>) -> Self {
        Self::with_cancellation(service, CancellationToken::new())
    }

    pub fn with_cancellation(
        service: Arc<dyn MediaService + Send + Sync>,
        cancel: CancellationToken,
    ) -> Self {
        Self { service, cancel }
    }

    /// Token that stops the run before the next item
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Fetch at most `plan.cap` items. A failed item is counted and reported
    /// to the observer; the run always continues with the next one. A fetch
    /// in flight is never interrupted: cancellation is seen between items and
    /// the partial tally is returned.
    pub async fn run<O: DownloadObserver>(
        &self,
        items: Vec<EligibleItem>,
        plan: &DownloadPlan,
        observer: &mut O,
    ) -> DownloadTally {
        let mode = FetchMode::for_quality(plan.quality, plan.transcode_available);
        if mode.keeps_original_format() {
            warn!("Transcoding unavailable, keeping original audio format");
        }

        let eligible = items.len();
        let batch: Vec<EligibleItem> = items.into_iter().take(plan.cap.get()).collect();
        let mut tally = DownloadTally::new(batch.len());
        info!(
            "Downloading {} of {} eligible items to {}",
            tally.total,
            eligible,
            plan.output_dir.display()
        );

        for (index, item) in batch.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(
                    "Download cancelled after {} of {} items",
                    tally.attempted(),
                    tally.total
                );
                tally.cancelled = true;
                break;
            }

            let request = FetchRequest {
                link: item.link.clone(),
                format_spec: mode.format_spec.to_string(),
                output_template: output_template(&plan.output_dir, &item.artist, &item.track),
                transcode: mode.transcode,
                extras: plan.extras.clone(),
            };

            debug!("Fetching {} - {} from {}", item.artist, item.track, item.link);
            match self.service.fetch_media(&request).await {
                Ok(path) => {
                    tally.successful += 1;
                    observer.on_item_done(item, &path);
                }
                Err(e) => {
                    tally.failed += 1;
                    warn!("Failed to download {}: {}", item.track, e);
                    observer.on_item_error(item, &e.to_string());
                }
            }

            observer.on_progress(Progress {
                processed: index + 1,
                total: tally.total,
            });
        }

        info!(
            "Download finished: {} successful, {} failed, {} total",
            tally.successful, tally.failed, tally.total
        );
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ytdlp::stub::MediaServiceStub;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[derive(Default)]
    struct Recorder {
        fractions: Vec<f64>,
        done: Vec<String>,
        errors: Vec<(String, String)>,
    }

    impl DownloadObserver for Recorder {
        fn on_progress(&mut self, progress: Progress) {
            self.fractions.push(progress.fraction());
        }

        fn on_item_done(&mut self, item: &EligibleItem, _path: &Path) {
            self.done.push(item.track.clone());
        }

        fn on_item_error(&mut self, item: &EligibleItem, error: &str) {
            self.errors.push((item.track.clone(), error.to_string()));
        }
    }

    fn item(track: &str, artist: &str, id: &str) -> EligibleItem {
        EligibleItem {
            track: track.to_string(),
            artist: artist.to_string(),
            link: CanonicalLink::from_id(id).unwrap(),
        }
    }

    fn items(count: usize) -> Vec<EligibleItem> {
        (0..count)
            .map(|i| item(&format!("Track {}", i), "Artist", &format!("id{}", i)))
            .collect()
    }

    fn plan(cap: usize, transcode_available: bool, quality: AudioQuality) -> DownloadPlan {
        DownloadPlan {
            cap: NonZeroUsize::new(cap).unwrap(),
            transcode_available,
            quality,
            output_dir: PathBuf::from("/downloads"),
            extras: FetchExtras::default(),
        }
    }

    fn resolved(link: Option<&str>) -> ResolvedLinkItem {
        ResolvedLinkItem {
            track: "T".to_string(),
            artist: "A".to_string(),
            youtube_link: link.map(str::to_string),
        }
    }

    #[rstest]
    #[case(0, 3)]
    #[case(2, 5)]
    #[case(5, 5)]
    #[case(8, 3)]
    #[case(10, 1)]
    #[tokio::test]
    async fn tally_covers_min_of_cap_and_eligible(#[case] eligible: usize, #[case] cap: usize) {
        let stub = Arc::new(MediaServiceStub::new().with_fetch_error("id1"));
        let orchestrator = DownloadOrchestrator::new(stub.clone());
        let mut recorder = Recorder::default();

        let tally = orchestrator
            .run(
                items(eligible),
                &plan(cap, true, AudioQuality::Best),
                &mut recorder,
            )
            .await;

        let expected = eligible.min(cap);
        assert_eq!(tally.total, expected);
        assert_eq!(tally.successful + tally.failed, expected);
        assert_eq!(stub.fetch_requests().len(), expected);
    }

    #[tokio::test]
    async fn failures_are_reported_and_loop_continues() {
        let stub = Arc::new(
            MediaServiceStub::new()
                .with_fetch_error("id0")
                .with_fetch_error("id2"),
        );
        let orchestrator = DownloadOrchestrator::new(stub);
        let mut recorder = Recorder::default();

        let tally = orchestrator
            .run(items(4), &plan(10, true, AudioQuality::Best), &mut recorder)
            .await;

        assert_eq!(
            tally,
            DownloadTally {
                successful: 2,
                failed: 2,
                total: 4,
                cancelled: false,
            }
        );
        assert_eq!(recorder.done, vec!["Track 1", "Track 3"]);
        assert_eq!(recorder.errors.len(), 2);
        assert_eq!(recorder.errors[0].0, "Track 0");
        assert!(recorder.errors[0].1.contains("id0"));
    }

    #[tokio::test]
    async fn progress_fires_after_each_item() {
        let stub = Arc::new(MediaServiceStub::new());
        let orchestrator = DownloadOrchestrator::new(stub);
        let mut recorder = Recorder::default();

        orchestrator
            .run(items(6), &plan(4, false, AudioQuality::Best), &mut recorder)
            .await;

        assert_eq!(recorder.fractions, vec![0.25, 0.5, 0.75, 1.0]);
    }

    #[tokio::test]
    async fn without_transcoder_best_keeps_original_audio() {
        let stub = Arc::new(MediaServiceStub::new());
        let orchestrator = DownloadOrchestrator::new(stub.clone());

        orchestrator
            .run(
                items(2),
                &plan(5, false, AudioQuality::Best),
                &mut Recorder::default(),
            )
            .await;

        for request in stub.fetch_requests() {
            assert_eq!(request.transcode, None);
            assert_eq!(request.format_spec, "bestaudio[ext=m4a]/bestaudio/best");
        }
    }

    #[tokio::test]
    async fn transcoder_extracts_at_requested_bitrate() {
        let stub = Arc::new(MediaServiceStub::new());
        let orchestrator = DownloadOrchestrator::new(stub.clone());

        orchestrator
            .run(
                vec![item("Don't Stop", "AC/DC!", "abc")],
                &plan(1, true, AudioQuality::Bitrate(Bitrate::Kbps192)),
                &mut Recorder::default(),
            )
            .await;

        let requests = stub.fetch_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].format_spec, "bestaudio/best");
        assert_eq!(
            requests[0].transcode,
            Some(TranscodeSpec {
                codec: "mp3",
                bitrate: Bitrate::Kbps192
            })
        );
        assert_eq!(
            requests[0].output_template,
            "/downloads/ACDC - Dont Stop.%(ext)s"
        );
        assert_eq!(
            requests[0].link.as_str(),
            "https://www.youtube.com/watch?v=abc"
        );
    }

    #[rstest]
    #[case(AudioQuality::Bitrate(Bitrate::Kbps128), true, "bestaudio/best", Some(128))]
    #[case(AudioQuality::Best, true, "bestaudio/best", Some(320))]
    #[case(AudioQuality::Worst, true, "bestaudio/best", Some(128))]
    #[case(AudioQuality::Best, false, "bestaudio[ext=m4a]/bestaudio/best", None)]
    #[case(AudioQuality::Worst, false, "worstaudio", None)]
    #[case(
        AudioQuality::Bitrate(Bitrate::Kbps320),
        false,
        "bestaudio[ext=m4a]/bestaudio/best",
        None
    )]
    fn quality_maps_onto_fetch_mode(
        #[case] quality: AudioQuality,
        #[case] transcode_available: bool,
        #[case] format_spec: &str,
        #[case] kbps: Option<u32>,
    ) {
        let mode = FetchMode::for_quality(quality, transcode_available);
        assert_eq!(mode.format_spec, format_spec);
        assert_eq!(mode.transcode.map(|t| t.bitrate.kbps()), kbps);
    }

    #[rstest]
    #[case("best", AudioQuality::Best)]
    #[case("worst", AudioQuality::Worst)]
    #[case("192", AudioQuality::Bitrate(Bitrate::Kbps192))]
    fn parses_quality(#[case] raw: &str, #[case] expected: AudioQuality) {
        assert_eq!(raw.parse::<AudioQuality>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_quality() {
        assert_matches!(
            "lossless".parse::<AudioQuality>(),
            Err(DownloadError::InvalidQuality(_))
        );
    }

    #[test]
    fn eligibility_requires_exact_long_form() {
        let items = vec![
            resolved(Some("https://www.youtube.com/watch?v=one")),
            resolved(Some("NOT FOUND")),
            resolved(Some("ERROR: timed out")),
            resolved(Some("https://youtu.be/two")),
            resolved(Some("HTTPS://WWW.YOUTUBE.COM/watch?v=three")),
            resolved(Some("https://www.youtube.com/watch?v=")),
            resolved(None),
            resolved(Some("https://www.youtube.com/watch?v=four&t=10")),
            resolved(Some("https://www.youtube.com/watch?v=one")),
        ];

        let eligible = eligible_items(&items);
        let ids: Vec<&str> = eligible.iter().map(|i| i.link.id()).collect();
        assert_eq!(ids, vec!["one", "four", "one"]);
    }

    #[tokio::test]
    async fn tracks_sharing_a_video_are_each_downloaded() {
        let shared = "https://www.youtube.com/watch?v=same";
        let items = vec![
            ResolvedLinkItem {
                track: "Track One".to_string(),
                artist: "A".to_string(),
                youtube_link: Some(shared.to_string()),
            },
            ResolvedLinkItem {
                track: "Track Two".to_string(),
                artist: "A".to_string(),
                youtube_link: Some(shared.to_string()),
            },
        ];
        let stub = Arc::new(MediaServiceStub::new());
        let orchestrator = DownloadOrchestrator::new(stub.clone());

        let tally = orchestrator
            .run(
                eligible_items(&items),
                &plan(5, true, AudioQuality::Best),
                &mut Recorder::default(),
            )
            .await;

        assert_eq!(tally.attempted(), 2);
        assert_eq!(tally.total, 2);
        let templates: Vec<String> = stub
            .fetch_requests()
            .into_iter()
            .map(|r| r.output_template)
            .collect();
        assert_eq!(
            templates,
            vec![
                "/downloads/A - Track One.%(ext)s",
                "/downloads/A - Track Two.%(ext)s"
            ]
        );
    }

    #[tokio::test]
    async fn cancellation_stops_between_items() {
        struct CancelAfter {
            remaining: usize,
            cancel: CancellationToken,
        }

        impl DownloadObserver for CancelAfter {
            fn on_item_done(&mut self, _item: &EligibleItem, _path: &Path) {
                self.remaining -= 1;
                if self.remaining == 0 {
                    self.cancel.cancel();
                }
            }

            fn on_item_error(&mut self, _item: &EligibleItem, _error: &str) {}
        }

        let stub = Arc::new(MediaServiceStub::new());
        let orchestrator = DownloadOrchestrator::new(stub.clone());
        let mut observer = CancelAfter {
            remaining: 2,
            cancel: orchestrator.cancellation(),
        };

        let tally = orchestrator
            .run(items(5), &plan(4, true, AudioQuality::Best), &mut observer)
            .await;

        assert_eq!(stub.fetch_requests().len(), 2);
        assert_eq!(
            tally,
            DownloadTally {
                successful: 2,
                failed: 0,
                total: 4,
                cancelled: true,
            }
        );
    }

    #[tokio::test]
    async fn cancelled_before_start_fetches_nothing() {
        let stub = Arc::new(MediaServiceStub::new());
        let orchestrator = DownloadOrchestrator::new(stub.clone());
        orchestrator.cancellation().cancel();

        let tally = orchestrator
            .run(items(3), &plan(3, true, AudioQuality::Best), &mut Recorder::default())
            .await;

        assert!(tally.cancelled);
        assert_eq!(tally.attempted(), 0);
        assert!(stub.fetch_requests().is_empty());
    }
}
