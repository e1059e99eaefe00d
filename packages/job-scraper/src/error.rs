//! Typed errors for the job scraper.
//!
//! Library code returns these `thiserror` types; only configuration loading
//! and the binary use `anyhow`.

use openai_client::OpenAIError;
use thiserror::Error;

/// Errors that fail one source (or one link within a source).
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Invalid settings or an unreadable sources file
    #[error("config error: {0}")]
    Config(String),

    /// Page could not be retrieved
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Extraction service call failed (after its own retries)
    #[error("extraction service error: {0}")]
    Extraction(#[from] OpenAIError),

    /// Service answered, but the answer is not the structure we asked for
    #[error("malformed extraction for {url}: {reason}")]
    MalformedExtraction { url: String, reason: String },

    /// URL could not be parsed or resolved
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Dedup lookup or persistence failed
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// Worker task died or was cancelled
    #[error("task failed: {0}")]
    Task(String),
}

impl ScrapeError {
    /// Short label for diagnostics and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Fetch { .. } => "fetch",
            Self::Extraction(inner) => inner.kind(),
            Self::MalformedExtraction { .. } => "malformed_response",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::Sink(_) => "sink",
            Self::Task(_) => "task",
        }
    }

    pub(crate) fn malformed(url: &str, reason: impl ToString) -> Self {
        Self::MalformedExtraction {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised by dedup lookups and job sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Underlying store failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Batch aborted part way and was rolled back
    #[error("batch aborted after {written} of {expected} records: {source}")]
    PartialWrite {
        written: usize,
        expected: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl SinkError {
    pub(crate) fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into().into())
    }
}

/// Result type alias for scraping operations.
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for sink operations.
pub type SinkResult<T> = std::result::Result<T, SinkError>;
