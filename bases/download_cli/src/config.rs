// bases/download_cli/src/config.rs
use crate::args::{Command, DownloadArgs, FetchArgs, FormatsArgs, PolicyArg, SearchArgs};
use batch_runner::{BatchError, Threshold};
use media_downloader::{
    normalize_all, AudioQuality, CanonicalLink, DownloadError, FetchExtras, NormalizedLinks,
    Rejected, SelectionPolicy,
};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Threshold(#[from] BatchError),

    #[error("--max must be at least 1")]
    ZeroCap,

    #[error(transparent)]
    Quality(#[from] DownloadError),

    #[error(transparent)]
    Link(#[from] Rejected),

    #[error("--policy custom needs a --format-id")]
    MissingFormatId,

    #[error("none of the given links is a recognised video link")]
    NoLinks,
}

/// Validated settings for one subcommand
#[derive(Debug)]
pub enum Config {
    Search(SearchConfig),
    Download(DownloadConfig),
    Formats(FormatsConfig),
    Fetch(FetchConfig),
}

#[derive(Debug)]
pub struct SearchConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub threshold: Threshold,
}

#[derive(Debug)]
pub struct DownloadConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub cap: NonZeroUsize,
    pub quality: AudioQuality,
    /// Skip transcoding even when it is available
    pub force_original: bool,
    pub extras: FetchExtras,
}

#[derive(Debug)]
pub struct FormatsConfig {
    pub link: CanonicalLink,
}

#[derive(Debug)]
pub struct FetchConfig {
    pub links: NormalizedLinks,
    pub policy: SelectionPolicy,
    pub output_dir: PathBuf,
}

impl Config {
    /// Create configuration from CLI arguments
    pub fn from_args(command: Command) -> Result<Self, ConfigError> {
        match command {
            Command::Search(args) => SearchConfig::from_args(args).map(Config::Search),
            Command::Download(args) => DownloadConfig::from_args(args).map(Config::Download),
            Command::Formats(args) => FormatsConfig::from_args(args).map(Config::Formats),
            Command::Fetch(args) => FetchConfig::from_args(args).map(Config::Fetch),
        }
    }
}

impl SearchConfig {
    fn from_args(args: SearchArgs) -> Result<Self, ConfigError> {
        Ok(Self {
            input: args.input,
            output_dir: args.output_dir,
            threshold: Threshold::new(args.threshold)?,
        })
    }
}

impl DownloadConfig {
    fn from_args(args: DownloadArgs) -> Result<Self, ConfigError> {
        let cap = NonZeroUsize::new(args.max).ok_or(ConfigError::ZeroCap)?;
        let subtitles = args
            .subtitles
            .into_iter()
            .map(|lang| lang.trim().to_string())
            .filter(|lang| !lang.is_empty())
            .collect();

        Ok(Self {
            input: args.input,
            output_dir: args.output_dir,
            cap,
            quality: args.quality.parse()?,
            force_original: args.no_transcode,
            extras: FetchExtras {
                subtitles,
                thumbnail: args.thumbnail,
            },
        })
    }
}

impl FormatsConfig {
    fn from_args(args: FormatsArgs) -> Result<Self, ConfigError> {
        Ok(Self {
            link: CanonicalLink::normalize(&args.link)?,
        })
    }
}

impl FetchConfig {
    fn from_args(args: FetchArgs) -> Result<Self, ConfigError> {
        let policy = match args.policy {
            PolicyArg::Combined => SelectionPolicy::Combined,
            PolicyArg::VideoOnly => SelectionPolicy::VideoOnly,
            PolicyArg::AudioOnly => SelectionPolicy::AudioOnly,
            PolicyArg::Custom => {
                SelectionPolicy::Custom(args.format_id.ok_or(ConfigError::MissingFormatId)?)
            }
        };

        let links = normalize_all(&args.links);
        if links.links.is_empty() {
            return Err(ConfigError::NoLinks);
        }

        Ok(Self {
            links,
            policy,
            output_dir: args.output_dir,
        })
    }
}
