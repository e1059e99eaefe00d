//! Page retrieval trait.

use async_trait::async_trait;

use crate::error::Result;

/// Fetches the body of a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Return the page body, or `ScrapeError::Fetch` on any transport or
    /// status failure.
    async fn fetch(&self, url: &str) -> Result<String>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "fetcher"
    }
}
