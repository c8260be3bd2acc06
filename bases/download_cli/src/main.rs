// bases/download_cli/src/main.rs
mod app;
mod args;
mod config;
mod output;

use app::App;
use args::Args;
use batch_runner::CancellationToken;
use clap::Parser;
use color_eyre::Result;
use config::Config;

const DEFAULT_FILTER: &str = "download_cli=info,media_downloader=info,batch_runner=info";
const VERBOSE_FILTER: &str = "download_cli=debug,media_downloader=debug,batch_runner=debug";

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let default_filter = if args.verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let cancel = CancellationToken::new();
    tokio::spawn(watch_interrupt(cancel.clone()));

    let verbose = args.verbose;
    let config = Config::from_args(args.command)?;
    let app = App::new(config, verbose, cancel);

    if let Err(error) = app.run().await {
        app.print_error(&error);
        std::process::exit(1);
    }
    Ok(())
}

/// First Ctrl-C asks the running batch to stop after the current item,
/// a second one exits immediately.
async fn watch_interrupt(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    tracing::warn!("Interrupted, finishing the current item (Ctrl-C again to abort)");
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        std::process::exit(130);
    }
}
