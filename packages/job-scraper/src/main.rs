//! Job scraper entry point.
//!
//! Reads listing URLs from the sources file, runs the pipeline and prints a
//! per-source summary with the total extraction cost.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use job_scraper::{
    load_sources, Config, ConcurrencyLimiter, DedupIndex, GenericScraper, HttpFetcher, JobSink,
    LinkSelectionMode, MemorySink, Orchestrator,
};
use openai_client::{CostLedger, OpenAIClient};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "job-scraper")]
#[command(about = "Extract structured job postings from company career pages")]
struct Cli {
    /// File with one listing-page URL per line
    #[arg(long)]
    sources: Option<PathBuf>,

    /// Job links kept per listing page
    #[arg(long)]
    max_links: Option<usize>,

    /// Simultaneous fetches and extraction calls across all sources
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Runtime worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// SQLite database URL
    #[arg(long)]
    database_url: Option<String>,

    /// Keep records in memory instead of the database
    #[arg(long)]
    in_memory: bool,

    /// How job links are picked: json or pattern
    #[arg(long, default_value_t = LinkSelectionMode::JsonArray)]
    link_mode: LinkSelectionMode,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,job_scraper=debug,openai_client=info,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(path) = cli.sources.clone() {
        config.sources_path = path;
    }
    if let Some(max_links) = cli.max_links {
        config.pipeline.max_links = max_links;
    }
    if let Some(max_concurrency) = cli.max_concurrency {
        config.pipeline.max_concurrency = max_concurrency;
    }
    if let Some(workers) = cli.workers {
        config.worker_threads = workers;
    }
    if let Some(url) = cli.database_url.clone() {
        config.database_url = url;
    }
    config.pipeline.link_mode = cli.link_mode;
    info!(?config, "Configuration loaded");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads.max(1))
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(run(config, cli.in_memory))
}

async fn run(config: Config, in_memory: bool) -> Result<()> {
    let sources = load_sources(&config.sources_path)
        .await
        .context("Failed to load sources")?;
    if sources.is_empty() {
        warn!(path = %config.sources_path.display(), "No sources to scrape");
        return Ok(());
    }
    info!(count = sources.len(), "Sources loaded");

    let ledger = CostLedger::new();
    let limiter = ConcurrencyLimiter::new(config.pipeline.max_concurrency);

    let client = OpenAIClient::new(config.openai_api_key.clone(), ledger.clone())
        .context("Failed to create OpenAI client")?
        .with_base_url(&config.openai_base_url)
        .with_model(&config.openai_model);
    let ai = Arc::new(limiter.gate(client));
    let fetcher = Arc::new(HttpFetcher::new().context("Failed to create HTTP fetcher")?);
    let (sink, dedup) = open_sink(&config, in_memory).await?;

    let scraper = GenericScraper::new(ai, fetcher, dedup, &config.pipeline);
    let orchestrator = Orchestrator::new(Arc::new(scraper), sink, limiter.clone(), ledger.clone());

    let report = tokio::select! {
        report = orchestrator.run(sources) => report,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping run");
            limiter.close();
            info!(
                billed_calls = ledger.billed_calls(),
                total_cost = %ledger.total(),
                "Partial extraction cost"
            );
            return Ok(());
        }
    };

    println!("{report}");
    Ok(())
}

type Sinks = (Arc<dyn JobSink>, Arc<dyn DedupIndex>);

fn shared<S: JobSink + 'static>(sink: S) -> Sinks {
    let sink = Arc::new(sink);
    let dedup: Arc<dyn DedupIndex> = sink.clone();
    let sink: Arc<dyn JobSink> = sink;
    (sink, dedup)
}

async fn open_sink(config: &Config, in_memory: bool) -> Result<Sinks> {
    if in_memory {
        info!("Keeping records in memory");
        return Ok(shared(MemorySink::new()));
    }
    open_database(config).await
}

#[cfg(feature = "sqlite")]
async fn open_database(config: &Config) -> Result<Sinks> {
    info!("Connecting to database...");
    let sink = job_scraper::SqliteSink::new(&config.database_url)
        .await
        .context("Failed to open database")?;
    info!("Database ready");
    Ok(shared(sink))
}

#[cfg(not(feature = "sqlite"))]
async fn open_database(config: &Config) -> Result<Sinks> {
    warn!(
        database_url = %config.database_url,
        "Built without SQLite support, keeping records in memory"
    );
    Ok(shared(MemorySink::new()))
}
