use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use college_scraper::client::{ReqwestClient, ReqwestClientOptions};
use college_scraper::render::{ChromeOptions, ChromeRendererFactory};
use college_scraper::sites::Careers360;
use college_scraper::{Format, OutputPaths, PageRange, Pipeline, PipelineOptions, Sinks};
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE: &str = "scraper.log";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Csv => Format::Csv,
            OutputFormat::Json => Format::Json,
        }
    }
}

/// Scrape Careers360 college listings and their detail pages.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    #[arg(long, default_value_t = 1)]
    start_page: u32,

    #[arg(long, default_value_t = 5)]
    end_page: u32,

    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Directory holding the `scraper.log` file
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Maximum simultaneous listing requests (0 for unlimited)
    #[arg(long, default_value_t = 5)]
    max_concurrency: usize,

    /// Browser sessions running at once during the detail phase
    #[arg(long, default_value_t = 6)]
    detail_workers: usize,

    #[arg(long, default_value_t = 5)]
    listing_save_interval: usize,

    #[arg(long, default_value_t = 10)]
    detail_save_interval: usize,

    /// Page load timeout in seconds
    #[arg(long, default_value_t = 30)]
    page_load_timeout: u64,

    /// Milliseconds to wait after navigation before reading the page
    #[arg(long, default_value_t = 3000)]
    settle_delay: u64,

    /// Up to this many extra milliseconds are added to the settle delay at random
    #[arg(long, default_value_t = 2000)]
    settle_jitter: u64,

    /// Show the browser windows
    #[arg(long)]
    headed: bool,

    #[arg(long, env = "CHROME_PATH")]
    chrome_path: Option<PathBuf>,

    /// Only scrape the listing pages
    #[arg(long)]
    skip_details: bool,
}

/// Opens `<dir>/scraper.log` for appending, creating `dir` if needed.
fn open_log_file(dir: &Path) -> anyhow::Result<File> {
    fs::create_dir_all(dir)
        .with_context(|| format!("telemetry: creating log directory '{}'", dir.display()))?;
    let path = dir.join(LOG_FILE);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("telemetry: opening '{}'", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_file = open_log_file(&args.log_dir)?;
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new("info,chromiumoxide=error"))
                .context("telemetry: creating EnvFilter")?,
        )
        .init();

    let pages = PageRange::new(args.start_page, args.end_page)?;
    let options = PipelineOptions::new(pages)
        .with_max_concurrency(Some(args.max_concurrency))
        .with_detail_workers(args.detail_workers)
        .with_listing_save_interval(args.listing_save_interval)
        .with_detail_save_interval(args.detail_save_interval)
        .with_skip_details(args.skip_details);
    let pipeline = Pipeline::new(options)?;

    let client = ReqwestClient::new(
        ReqwestClientOptions::default().with_timeout(Duration::from_secs(args.page_load_timeout)),
    )?;

    let mut chrome = ChromeOptions::default()
        .with_headless(!args.headed)
        .with_page_load_timeout(Duration::from_secs(args.page_load_timeout))
        .with_settle_delay(Duration::from_millis(args.settle_delay))
        .with_settle_jitter(Duration::from_millis(args.settle_jitter));
    if let Some(path) = args.chrome_path {
        chrome = chrome.with_chrome_executable(path);
    }
    let renderers = Arc::new(ChromeRendererFactory::new(chrome)?);

    let format = Format::from(args.format);
    let paths = OutputPaths::timestamped(
        &args.output_dir,
        "careers360_colleges",
        format,
        chrono::Local::now(),
    )?;
    let partial = format.sink(&paths.partial);
    let output = format.sink(&paths.final_output);

    let report = pipeline
        .run(
            Arc::new(Careers360::new()),
            client,
            renderers,
            Sinks {
                partial: partial.as_ref(),
                output: output.as_ref(),
            },
            signal::ctrl_c(),
        )
        .await;

    tracing::info!(
        rows = report.records.len(),
        interrupted = report.interrupted,
        "total execution time: {:.2} seconds",
        report.running_time.as_secs_f64()
    );
    Ok(())
}
