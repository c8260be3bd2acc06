// bases/download_cli/src/args.rs
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Find video links for a track list and download them as audio
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look up a link for every track in a JSON playlist export
    Search(SearchArgs),

    /// Download the tracks listed in a results file
    Download(DownloadArgs),

    /// Show the formats a video is offered in
    Formats(FormatsArgs),

    /// Download videos in a chosen format
    Fetch(FetchArgs),
}

#[derive(ClapArgs, Debug)]
pub struct SearchArgs {
    /// JSON array with `Track Name`, `Album Name` and `Artist Name(s)` fields
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory receiving the checkpoint files
    #[arg(short, long, default_value = "music_results")]
    pub output_dir: PathBuf,

    /// Percentage of the batch between two checkpoints
    #[arg(short, long, default_value_t = 5)]
    pub threshold: u32,
}

#[derive(ClapArgs, Debug)]
pub struct DownloadArgs {
    /// Results file written by `search`
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory to store downloaded files
    #[arg(short, long, default_value = "Music")]
    pub output_dir: PathBuf,

    /// Maximum number of tracks to download
    #[arg(short, long, default_value_t = 10)]
    pub max: usize,

    /// MP3 bitrate (128, 192, 320), or best/worst original audio
    #[arg(short, long, default_value = "192")]
    pub quality: String,

    /// Keep the original audio format even when ffmpeg is installed
    #[arg(long)]
    pub no_transcode: bool,

    /// Subtitle languages to fetch, comma separated
    #[arg(long, value_delimiter = ',')]
    pub subtitles: Vec<String>,

    /// Also fetch the thumbnail
    #[arg(long)]
    pub thumbnail: bool,
}

#[derive(ClapArgs, Debug)]
pub struct FormatsArgs {
    /// Video link, long or short form
    pub link: String,
}

#[derive(ClapArgs, Debug)]
pub struct FetchArgs {
    /// Video links, long or short form
    #[arg(required = true)]
    pub links: Vec<String>,

    /// Which kind of format to pick
    #[arg(short, long, value_enum, default_value_t = PolicyArg::Combined)]
    pub policy: PolicyArg,

    /// Format id to request with `--policy custom`
    #[arg(long)]
    pub format_id: Option<String>,

    /// Directory to store downloaded files
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyArg {
    Combined,
    VideoOnly,
    AudioOnly,
    Custom,
}
