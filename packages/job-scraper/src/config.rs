//! Runtime configuration.
//!
//! [`Config`] is read from the environment (and `.env`) by the binary.
//! [`PipelineConfig`] carries the tunables the library itself needs.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::limiter::DEFAULT_MAX_CONCURRENCY;

/// Default cap on job links taken from one listing page.
pub const DEFAULT_MAX_LINKS: usize = 100;

/// How the link resolver asks the extraction service to pick job links.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkSelectionMode {
    /// The service answers with a JSON array of the chosen hrefs
    #[default]
    JsonArray,
    /// The service answers with one regular expression matching them
    Pattern,
}

impl FromStr for LinkSelectionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "json-array" | "array" => Ok(Self::JsonArray),
            "pattern" | "regex" => Ok(Self::Pattern),
            other => Err(format!("unknown link mode '{other}' (expected json or pattern)")),
        }
    }
}

impl fmt::Display for LinkSelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JsonArray => f.write_str("json"),
            Self::Pattern => f.write_str("pattern"),
        }
    }
}

/// Tunables for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Job links kept per listing page after dedup
    pub max_links: usize,

    /// Aggregate in-flight fetches and extraction calls
    pub max_concurrency: usize,

    pub link_mode: LinkSelectionMode,

    /// Visible text sent for one detail page is cut to this many bytes
    pub max_detail_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_links: DEFAULT_MAX_LINKS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            link_mode: LinkSelectionMode::default(),
            max_detail_bytes: 48_000,
        }
    }
}

impl PipelineConfig {
    pub fn with_max_links(mut self, max_links: usize) -> Self {
        self.max_links = max_links;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_link_mode(mut self, mode: LinkSelectionMode) -> Self {
        self.link_mode = mode;
        self
    }

    pub fn with_max_detail_bytes(mut self, bytes: usize) -> Self {
        self.max_detail_bytes = bytes;
        self
    }
}

/// Application configuration loaded from environment variables
#[derive(Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub database_url: String,
    pub sources_path: PathBuf,
    pub worker_threads: usize,
    pub pipeline: PipelineConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("openai_api_key", &"<redacted>")
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("database_url", &self.database_url)
            .field("sources_path", &self.sources_path)
            .field("worker_threads", &self.worker_threads)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?;
        if api_key.trim().is_empty() {
            anyhow::bail!("OPENAI_API_KEY must not be empty");
        }

        let defaults = PipelineConfig::default();
        Ok(Self {
            openai_api_key: api_key,
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| openai_client::DEFAULT_BASE_URL.to_string()),
            openai_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| openai_client::DEFAULT_MODEL.to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://jobs.db?mode=rwc".to_string()),
            sources_path: env::var("JOB_SCRAPER_SOURCES")
                .unwrap_or_else(|_| "company_urls.txt".to_string())
                .into(),
            worker_threads: parse_var("JOB_SCRAPER_WORKER_THREADS", 20)?,
            pipeline: PipelineConfig {
                max_links: parse_var("JOB_SCRAPER_MAX_LINKS", defaults.max_links)?,
                max_concurrency: parse_var(
                    "JOB_SCRAPER_MAX_CONCURRENCY",
                    defaults.max_concurrency,
                )?,
                ..defaults
            },
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a valid number")),
        Err(_) => Ok(default),
    }
}
