//! Drives every source through the pipeline concurrently.
//!
//! Each source gets its own task; each job link of a source gets its own
//! task. Every page fetch holds a limiter slot, and the extraction service is
//! expected to be wrapped in the same limiter, so the slot count bounds all
//! outbound traffic. A failure is contained to the link or source it hit.

use std::sync::Arc;

use futures::future::join_all;
use openai_client::CostLedger;
use tracing::{debug, error, info, warn};

use crate::error::{Result, ScrapeError};
use crate::limiter::ConcurrencyLimiter;
use crate::pipeline::report::{LinkFailure, RunReport, SourceReport, SourceState};
use crate::record::JobRecord;
use crate::traits::{scraper::JobScraper, sink::JobSink};

/// Runs sources through a [`JobScraper`] into a [`JobSink`].
#[derive(Clone)]
pub struct Orchestrator {
    scraper: Arc<dyn JobScraper>,
    sink: Arc<dyn JobSink>,
    limiter: ConcurrencyLimiter,
    ledger: CostLedger,
}

impl Orchestrator {
    pub fn new(
        scraper: Arc<dyn JobScraper>,
        sink: Arc<dyn JobSink>,
        limiter: ConcurrencyLimiter,
        ledger: CostLedger,
    ) -> Self {
        Self {
            scraper,
            sink,
            limiter,
            ledger,
        }
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    pub fn ledger(&self) -> &CostLedger {
        &self.ledger
    }

    /// Process all sources and report once every one has finished.
    pub async fn run(&self, sources: Vec<String>) -> RunReport {
        info!(
            sources = sources.len(),
            max_concurrency = self.limiter.capacity(),
            sink = self.sink.name(),
            "Starting run"
        );

        let handles: Vec<_> = sources
            .iter()
            .cloned()
            .map(|source| {
                let this = self.clone();
                tokio::spawn(async move { this.process_source(source).await })
            })
            .collect();
        let results = join_all(handles).await;

        let mut reports = Vec::with_capacity(results.len());
        for (source, result) in sources.into_iter().zip(results) {
            let report = match result {
                Ok(report) => report,
                Err(e) => {
                    error!(source = %source, error = %e, "Source task died");
                    let mut report = SourceReport::new(source);
                    report.fail(&ScrapeError::Task(e.to_string()));
                    report
                }
            };
            reports.push(report);
        }

        let report = RunReport {
            sources: reports,
            total_cost: self.ledger.total(),
            billed_calls: self.ledger.billed_calls(),
        };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            records_written = report.records_written(),
            billed_calls = report.billed_calls,
            total_cost = %report.total_cost,
            "Run complete"
        );
        report
    }

    /// Run one source to a terminal state.
    pub async fn process_source(&self, source: String) -> SourceReport {
        let mut report = SourceReport::new(&source);
        match self.drive(&source, &mut report).await {
            Ok(()) => info!(
                source = %source,
                parsed = report.records_parsed,
                written = report.records_written,
                link_failures = report.link_failures.len(),
                "Source complete"
            ),
            Err(e) => {
                warn!(
                    source = %source,
                    stage = %report.state,
                    kind = e.kind(),
                    error = %e,
                    "Source failed"
                );
                report.fail(&e);
            }
        }
        report
    }

    async fn drive(&self, source: &str, report: &mut SourceReport) -> Result<()> {
        let listing = {
            let _permit = self.limiter.acquire().await?;
            self.scraper.fetch_listing(source).await?
        };
        report.advance(SourceState::LinksFetched);

        let resolution = self.scraper.resolve_links(&listing, source).await?;
        report.links_resolved = resolution.links.len();
        report.links_already_seen = resolution.already_seen;
        report.links_truncated = resolution.truncated;
        report.advance(SourceState::LinksResolved);

        report.advance(SourceState::DetailsFetching);
        let urls: Vec<String> = resolution
            .links
            .iter()
            .map(|link| link.url().to_string())
            .collect();
        let handles: Vec<_> = urls
            .iter()
            .cloned()
            .map(|url| {
                let scraper = Arc::clone(&self.scraper);
                let limiter = self.limiter.clone();
                tokio::spawn(async move { process_link(scraper, limiter, url).await })
            })
            .collect();
        let results = join_all(handles).await;

        let mut records = Vec::with_capacity(results.len());
        for (url, result) in urls.into_iter().zip(results) {
            let outcome = result.unwrap_or_else(|e| Err(ScrapeError::Task(e.to_string())));
            match outcome {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(
                        source = %source,
                        url = %url,
                        kind = e.kind(),
                        error = %e,
                        "Job link failed"
                    );
                    report.link_failures.push(LinkFailure {
                        url,
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }
        report.records_parsed = records.len();
        report.advance(SourceState::DetailsParsed);

        if records.is_empty() {
            debug!(source = %source, "No new records to persist");
        } else {
            report.records_written = self.sink.write_batch(&records).await?;
            info!(
                source = %source,
                written = report.records_written,
                sink = self.sink.name(),
                "Batch persisted"
            );
        }
        report.advance(SourceState::Persisted);
        Ok(())
    }
}

async fn process_link(
    scraper: Arc<dyn JobScraper>,
    limiter: ConcurrencyLimiter,
    url: String,
) -> Result<JobRecord> {
    let detail = {
        let _permit = limiter.acquire().await?;
        scraper.fetch_detail(&url).await?
    };
    scraper.parse_detail(&detail, &url).await
}
