//! Seams between pipeline stages.
//!
//! - `ExtractionService`: the language-model endpoint
//! - `PageFetcher`: raw page retrieval
//! - `DedupIndex` / `JobSink`: "seen before?" lookups and persistence
//! - `JobScraper`: the four per-source pipeline steps

pub mod ai;
pub mod fetcher;
pub mod scraper;
pub mod sink;
