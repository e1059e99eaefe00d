//! Job-posting extraction from company career pages.
//!
//! Given a list of listing-page URLs, the pipeline fetches each page, asks a
//! language model which links lead to job postings, fetches those postings,
//! asks the model to turn each into a structured [`JobRecord`], and writes
//! one batch per source to a [`JobSink`]. Sources and links run
//! concurrently under one [`ConcurrencyLimiter`]; every model call is billed
//! to a shared [`CostLedger`](openai_client::CostLedger).
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use job_scraper::{
//!     ConcurrencyLimiter, GenericScraper, HttpFetcher, MemorySink, Orchestrator, PipelineConfig,
//! };
//! use openai_client::{CostLedger, OpenAIClient};
//!
//! let config = PipelineConfig::default();
//! let ledger = CostLedger::new();
//! let limiter = ConcurrencyLimiter::new(config.max_concurrency);
//! let ai = limiter.gate(OpenAIClient::from_env(ledger.clone())?);
//! let sink = Arc::new(MemorySink::new());
//!
//! let scraper = GenericScraper::new(Arc::new(ai), Arc::new(HttpFetcher::new()?), sink.clone(), &config);
//! let report = Orchestrator::new(Arc::new(scraper), sink, limiter, ledger)
//!     .run(vec!["https://example.com/careers".into()])
//!     .await;
//! println!("{report}");
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Seams: extraction service, fetcher, sink, scraper
//! - [`pipeline`] - Link resolution, detail parsing, orchestration
//! - [`stores`] - Sink implementations (MemorySink, SqliteSink)
//! - [`fetchers`] - Page fetchers (HttpFetcher)
//! - [`limiter`] - Shared concurrency cap
//! - [`testing`] - Mock implementations for testing

pub mod ai;
pub mod config;
pub mod error;
pub mod fetchers;
pub mod hashing;
pub mod html;
pub mod limiter;
pub mod pipeline;
pub mod prompts;
pub mod record;
pub mod sources;
pub mod stores;
pub mod testing;
pub mod traits;

// Re-export core types at crate root
pub use config::{Config, LinkSelectionMode, PipelineConfig};
pub use error::{Result, ScrapeError, SinkError, SinkResult};
pub use fetchers::HttpFetcher;
pub use hashing::{CandidateLink, LinkHash};
pub use limiter::{ConcurrencyLimiter, LimitExt, LimitedService, Permit};
pub use pipeline::{
    DetailParser, GenericScraper, LinkFailure, LinkResolution, LinkResolver, Orchestrator,
    RunReport, SourceReport, SourceState,
};
pub use record::{ExtractedJob, JobRecord, NOT_AVAILABLE};
pub use sources::{load_sources, parse_sources};
pub use stores::MemorySink;
#[cfg(feature = "sqlite")]
pub use stores::SqliteSink;
pub use traits::{
    ai::ExtractionService,
    fetcher::PageFetcher,
    scraper::JobScraper,
    sink::{DedupIndex, JobSink},
};
