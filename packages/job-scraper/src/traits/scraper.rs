//! Per-source pipeline steps.

use async_trait::async_trait;

use crate::error::Result;
use crate::pipeline::resolve::LinkResolution;
use crate::record::JobRecord;

/// The four steps the orchestrator drives for each source.
///
/// Concurrency is the orchestrator's concern; implementations just do the
/// work for one page or one link.
#[async_trait]
pub trait JobScraper: Send + Sync {
    /// Fetch the listing page of a source.
    async fn fetch_listing(&self, url: &str) -> Result<String>;

    /// Pick the unseen job-detail links on a listing page.
    async fn resolve_links(&self, listing: &str, base_url: &str) -> Result<LinkResolution>;

    /// Fetch one job-detail page.
    async fn fetch_detail(&self, url: &str) -> Result<String>;

    /// Turn a detail page into a record.
    async fn parse_detail(&self, detail: &str, url: &str) -> Result<JobRecord>;
}
