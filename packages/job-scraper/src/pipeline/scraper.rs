//! Default scraper for arbitrary company career pages.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::detail::DetailParser;
use crate::pipeline::resolve::{LinkResolution, LinkResolver};
use crate::record::JobRecord;
use crate::traits::{
    ai::ExtractionService, fetcher::PageFetcher, scraper::JobScraper, sink::DedupIndex,
};

/// Site-agnostic scraper: the extraction service decides which links are
/// jobs and what each job page says.
pub struct GenericScraper {
    fetcher: Arc<dyn PageFetcher>,
    resolver: LinkResolver,
    parser: DetailParser,
    max_links: usize,
}

impl GenericScraper {
    pub fn new(
        ai: Arc<dyn ExtractionService>,
        fetcher: Arc<dyn PageFetcher>,
        dedup: Arc<dyn DedupIndex>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            fetcher,
            resolver: LinkResolver::new(Arc::clone(&ai), dedup).with_mode(config.link_mode),
            parser: DetailParser::new(ai).with_max_payload_bytes(config.max_detail_bytes),
            max_links: config.max_links,
        }
    }
}

#[async_trait]
impl JobScraper for GenericScraper {
    async fn fetch_listing(&self, url: &str) -> Result<String> {
        self.fetcher.fetch(url).await
    }

    async fn resolve_links(&self, listing: &str, base_url: &str) -> Result<LinkResolution> {
        self.resolver
            .resolve_job_links(listing, base_url, self.max_links)
            .await
    }

    async fn fetch_detail(&self, url: &str) -> Result<String> {
        self.fetcher.fetch(url).await
    }

    async fn parse_detail(&self, detail: &str, url: &str) -> Result<JobRecord> {
        self.parser.parse_detail(detail, url).await
    }
}
