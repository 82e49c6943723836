//! Pagebinder main entry point
//!
//! This is the command-line interface for binding a website into one PDF.

use anyhow::Context;
use clap::Parser;
use pagebinder::config::{load_settings, Overrides, Settings};
use pagebinder::crawler::{discard_saved_state, prepare_state, ChromeRenderer, Coordinator};
use pagebinder::output::print_report;
use pagebinder::storage::{open_store, StateStore};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Pagebinder: bind a whole website into one navigable PDF
///
/// Pagebinder crawls every same-domain page reachable from URL in
/// breadth-first order, prints each page through a headless browser, and
/// merges the results into a single PDF with an optional clickable index.
#[derive(Parser, Debug)]
#[command(name = "pagebinder")]
#[command(version)]
#[command(about = "Bind a whole website into one navigable PDF", long_about = None)]
struct Cli {
    /// Base URL to start crawling from
    #[arg(value_name = "URL")]
    url: String,

    /// Output PDF file [default: website.pdf]
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Maximum number of pages to render [default: 50]
    #[arg(short, long, value_name = "N")]
    max_pages: Option<u32>,

    /// Show the browser window while rendering
    #[arg(long)]
    no_headless: bool,

    /// Prepend a clickable table of contents
    #[arg(short, long)]
    index: bool,

    /// Only follow URLs whose path matches this regex (repeatable).
    /// Paths are also matched with a trailing slash, so "/docs/" covers /docs
    #[arg(long, value_name = "REGEX")]
    include: Vec<String>,

    /// Never follow URLs whose path matches this regex (repeatable).
    /// Paths are also matched with a trailing slash, so "/blog/" covers /blog
    #[arg(long, value_name = "REGEX")]
    exclude: Vec<String>,

    /// Maximum link distance from the base URL
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Resume from the saved crawl state
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Delete any saved crawl state before starting
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Crawl state file [default: crawler_state.json]
    #[arg(long, value_name = "FILE")]
    state_file: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            output: self.output.clone(),
            max_pages: self.max_pages,
            max_depth: self.max_depth,
            no_headless: self.no_headless,
            index: self.index,
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            resume: self.resume,
            state_file: self.state_file.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pagebinder=info,warn"),
            1 => EnvFilter::new("pagebinder=debug,info"),
            2 => EnvFilter::new("pagebinder=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Validates everything, crawls, assembles and reports
///
/// Settings and saved state are checked before the browser is launched, so
/// a bad URL, filter or state file never costs a render.
async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let settings = load_settings(&cli.url, cli.config.as_deref(), cli.overrides())
        .context("invalid configuration")?;
    log_settings(&settings);

    let mut store = open_store(&settings.output.state_file);
    if cli.fresh && store.exists() {
        tracing::info!(
            "Removing saved crawl state {}",
            settings.output.state_file.display()
        );
        discard_saved_state(&mut store)?;
    }

    let state = prepare_state(&settings, &store).context("cannot start crawl")?;

    let renderer = ChromeRenderer::launch(&settings.renderer)
        .await
        .context("cannot start the browser")?;

    let stop = Arc::new(AtomicBool::new(false));
    spawn_interrupt_handler(Arc::clone(&stop));

    let mut coordinator =
        Coordinator::new(Arc::new(settings), state, renderer, store)?.with_stop_flag(stop);
    coordinator.run().await?;
    let report = coordinator.finish().await?;

    print_report(&report);
    Ok(if report.exit_code() == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// First Ctrl-C pauses at the next page boundary; a second one exits at once
fn spawn_interrupt_handler(stop: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Interrupt received; finishing the current page before pausing");
        stop.store(true, Ordering::SeqCst);

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Second interrupt; exiting without saving");
            std::process::exit(130);
        }
    });
}

fn log_settings(settings: &Settings) {
    tracing::info!("Base URL: {}", settings.base_url);
    tracing::info!(
        "Limits: {} pages, depth {}",
        settings.crawl.max_pages,
        settings
            .crawl
            .max_depth
            .map(|d| d.to_string())
            .unwrap_or_else(|| "unlimited".to_string())
    );
    if !settings.crawl.include.is_empty() {
        tracing::info!("Include patterns: {:?}", settings.crawl.include);
    }
    if !settings.crawl.exclude.is_empty() {
        tracing::info!("Exclude patterns: {:?}", settings.crawl.exclude);
    }
    tracing::debug!("Output: {}", settings.output.path.display());
    tracing::debug!("State file: {}", settings.output.state_file.display());
}
