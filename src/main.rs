//! CLI entry point: `process_code <CODE>` runs the full pipeline for one
//! California statutory code end to end (§6).

use std::sync::Arc;

use clap::Parser;
use ca_code_pipeline::{
    PipelineConfig, PipelineController, RenderedScraper, RunOptions, SqliteStore, StaticScraper,
};
use tracing_subscriber::EnvFilter;

/// Scrape a California statutory code into a local SQLite store.
#[derive(Parser, Debug)]
#[command(name = "process_code", version, about)]
struct Cli {
    /// Code abbreviation, e.g. WIC, FAM, PEN.
    code: String,

    /// Resume an existing run instead of restarting discovery (§6).
    #[arg(long)]
    resume: bool,

    /// Override the concurrent worker count (§4.5).
    #[arg(long)]
    workers: Option<u32>,

    /// Skip the final failure-log retry pass (§4.8).
    #[arg(long)]
    skip_retry: bool,

    /// Override the maximum reconciliation passes (§4.7).
    #[arg(long)]
    max_retry: Option<u32>,

    /// Path to the SQLite store file. Defaults to `CITESCRAPE_STORE_PATH` or
    /// `./<CODE>.db`.
    #[arg(long, env = "CITESCRAPE_STORE_PATH")]
    store_path: Option<String>,

    /// Override the code index page URL (defaults to the live leginfo.ca.gov
    /// TOC page for `code`).
    #[arg(long)]
    index_url: Option<String>,

    /// Run the Stage 3 browser headful instead of headless.
    #[arg(long)]
    headful: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let store_path = cli
        .store_path
        .clone()
        .unwrap_or_else(|| format!("./{}.db", cli.code.to_lowercase()));

    let mut builder = PipelineConfig::builder_from_env().store_path(&store_path).headless(!cli.headful);
    if let Some(workers) = cli.workers {
        builder = builder.worker_count(workers);
    }
    if let Some(max_retry) = cli.max_retry {
        builder = builder.max_reconciliation_attempts(max_retry);
    }
    let config = builder.build()?;

    let scraper = Arc::new(StaticScraper::new()?);
    let rendered_scraper = Arc::new(RenderedScraper::new(config.headless()));
    let store = Arc::new(SqliteStore::open(config.store_path()).await?);
    let controller = PipelineController::new(scraper, rendered_scraper, store, config);

    let shutdown = controller.shutdown_token();
    ca_code_pipeline::shutdown::install_ctrl_c_handler(shutdown);

    let index_url = cli
        .index_url
        .unwrap_or_else(|| ca_code_pipeline::utils::constants::code_index_url(&cli.code));

    let report = controller
        .run(RunOptions {
            code: cli.code.clone(),
            index_url,
            resume: cli.resume,
            skip_retry: cli.skip_retry,
            max_retry_override: cli.max_retry,
        })
        .await?;

    println!(
        "{}: {}/{} sections complete ({:.1}%), {} failures logged",
        report.code,
        report.completed_sections,
        report.total_sections,
        report.completion_rate * 100.0,
        report.failure_breakdown.total,
    );

    std::process::exit(report.exit_code());
}
