//! Testing utilities including mock implementations.
//!
//! These let the pipeline run end to end without a language model or a
//! network: replies are scripted by prompt substring and pages are served
//! from memory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use openai_client::{
    CompletionResponse, Cost, CostLedger, OpenAIError, TokenPricing, Usage, RATE_LIMIT_CODE,
};

use crate::error::{Result, ScrapeError};
use crate::traits::{ai::ExtractionService, fetcher::PageFetcher};

/// Tracks how many calls are in flight and the highest count seen.
#[derive(Debug, Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// A scripted answer from the mock extraction service.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Successful completion
    Content {
        content: String,
        prompt_tokens: u32,
        completion_tokens: u32,
    },
    /// Rate limited until the retry bound ran out
    RateLimited,
    /// Non-retryable service failure
    ServiceError(String),
}

impl MockReply {
    /// Successful completion with a small nominal usage.
    pub fn content(content: impl Into<String>) -> Self {
        Self::Content {
            content: content.into(),
            prompt_tokens: 100,
            completion_tokens: 20,
        }
    }

    /// Successful completion with explicit token counts.
    pub fn with_usage(content: impl Into<String>, prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self::Content {
            content: content.into(),
            prompt_tokens,
            completion_tokens,
        }
    }
}

/// Record of a call made to the mock extraction service.
#[derive(Debug, Clone)]
pub struct MockServiceCall {
    pub instruction: String,
    pub payload: String,
}

/// A mock extraction service for testing.
///
/// Replies are matched in insertion order: the first rule whose marker occurs
/// in the instruction or the payload wins. An empty marker matches anything.
#[derive(Default)]
pub struct MockExtractionService {
    /// Scripted replies as (marker, reply)
    replies: Arc<RwLock<Vec<(String, MockReply)>>>,

    /// Ledger billed for successful replies
    ledger: Option<CostLedger>,

    pricing: TokenPricing,

    /// Artificial latency per call
    delay: Option<Duration>,

    /// Call tracking
    calls: Arc<RwLock<Vec<MockServiceCall>>>,
    gauge: Gauge,
}

impl MockExtractionService {
    /// Create a new mock service with no scripted replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reply for prompts containing `marker`.
    pub fn with_reply(self, marker: impl Into<String>, reply: MockReply) -> Self {
        self.replies.write().unwrap().push((marker.into(), reply));
        self
    }

    /// Bill successful replies to `ledger` at the default token prices.
    pub fn with_ledger(mut self, ledger: CostLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockServiceCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// Highest number of simultaneous calls observed.
    pub fn peak_concurrency(&self) -> usize {
        self.gauge.peak()
    }

    fn reply_for(&self, instruction: &str, payload: &str) -> Option<MockReply> {
        self.replies
            .read()
            .unwrap()
            .iter()
            .find(|(marker, _)| instruction.contains(marker.as_str()) || payload.contains(marker.as_str()))
            .map(|(_, reply)| reply.clone())
    }
}

#[async_trait]
impl ExtractionService for MockExtractionService {
    async fn complete(
        &self,
        instruction: &str,
        payload: &str,
    ) -> openai_client::Result<CompletionResponse> {
        self.calls.write().unwrap().push(MockServiceCall {
            instruction: instruction.to_string(),
            payload: payload.to_string(),
        });

        self.gauge.enter();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.gauge.leave();

        match self.reply_for(instruction, payload) {
            Some(MockReply::Content {
                content,
                prompt_tokens,
                completion_tokens,
            }) => {
                let cost = self.pricing.cost(&Usage {
                    prompt_tokens,
                    completion_tokens,
                    total_tokens: prompt_tokens + completion_tokens,
                });
                if let Some(ledger) = &self.ledger {
                    ledger.record(cost);
                }
                Ok(CompletionResponse {
                    content,
                    prompt_tokens,
                    completion_tokens,
                    cost,
                })
            }
            Some(MockReply::RateLimited) => Err(OpenAIError::RetryExhausted {
                attempts: 4,
                code: Some(RATE_LIMIT_CODE.to_string()),
                message: "Rate limit reached. Please try again in 20ms.".to_string(),
            }),
            Some(MockReply::ServiceError(message)) => Err(OpenAIError::Api {
                status: 500,
                code: Some("server_error".to_string()),
                kind: None,
                message,
            }),
            None => Err(OpenAIError::Config(format!(
                "no scripted reply for prompt starting {:?}",
                instruction.chars().take(40).collect::<String>()
            ))),
        }
    }
}

/// A mock page fetcher for testing.
///
/// Serves predefined bodies without making network requests.
#[derive(Default)]
pub struct MockFetcher {
    /// Predefined bodies by URL
    pages: Arc<RwLock<HashMap<String, String>>>,

    /// URLs that should fail
    fail_urls: Arc<RwLock<Vec<String>>>,

    delay: Option<Duration>,

    /// Call tracking
    calls: Arc<RwLock<Vec<String>>>,
    gauge: Gauge,
}

impl MockFetcher {
    /// Create a new mock fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predefined page.
    pub fn with_page(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.write().unwrap().insert(url.into(), body.into());
        self
    }

    /// Mark a URL as failing.
    pub fn fail_url(self, url: impl Into<String>) -> Self {
        self.fail_urls.write().unwrap().push(url.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// URLs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    /// Highest number of simultaneous fetches observed.
    pub fn peak_concurrency(&self) -> usize {
        self.gauge.peak()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.calls.write().unwrap().push(url.to_string());

        self.gauge.enter();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.gauge.leave();

        if self.fail_urls.read().unwrap().iter().any(|u| u == url) {
            return Err(ScrapeError::Fetch {
                url: url.to_string(),
                reason: "mock connection refused".to_string(),
            });
        }

        self.pages
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| ScrapeError::Fetch {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Cost of one default [`MockReply::content`] answer at default prices.
pub fn nominal_reply_cost() -> Cost {
    TokenPricing::default().cost(&Usage {
        prompt_tokens: 100,
        completion_tokens: 20,
        total_tokens: 120,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_service_matches_first_rule() {
        let ledger = CostLedger::new();
        let service = MockExtractionService::new()
            .with_reply("/jobs/", MockReply::content("[\"/jobs/1\"]"))
            .with_reply("", MockReply::ServiceError("fallback".into()))
            .with_ledger(ledger.clone());

        let ok = service.complete("Pick: ", "/jobs/1,/about").await.unwrap();
        assert_eq!(ok.content, "[\"/jobs/1\"]");
        assert_eq!(ledger.total(), nominal_reply_cost());

        let err = service.complete("Pick: ", "/about").await.unwrap_err();
        assert_eq!(err.kind(), "service");
        assert_eq!(service.call_count(), 2);
        assert_eq!(ledger.billed_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_service_bills_explicit_usage() {
        let ledger = CostLedger::new();
        let service = MockExtractionService::new()
            .with_reply("", MockReply::with_usage("{}", 1000, 200))
            .with_ledger(ledger.clone());

        let reply = service.complete("Extract: ", "page").await.unwrap();
        assert_eq!(reply.prompt_tokens, 1000);
        assert_eq!(reply.cost.nanos(), 800_000);
        assert_eq!(ledger.total().nanos(), 800_000);
    }

    #[tokio::test]
    async fn test_mock_fetcher() {
        let fetcher = MockFetcher::new()
            .with_page("https://acme.test/careers", "<html></html>")
            .fail_url("https://down.test/");

        assert!(fetcher.fetch("https://acme.test/careers").await.is_ok());
        assert!(matches!(
            fetcher.fetch("https://down.test/").await,
            Err(ScrapeError::Fetch { .. })
        ));
        assert!(fetcher.fetch("https://acme.test/missing").await.is_err());
        assert_eq!(fetcher.calls().len(), 3);
    }
}
