//! OpenAI implementation of the extraction service.
//!
//! ```rust,ignore
//! use job_scraper::ConcurrencyLimiter;
//! use openai_client::{CostLedger, OpenAIClient};
//!
//! let ledger = CostLedger::new();
//! let limiter = ConcurrencyLimiter::new(200);
//! let service = limiter.gate(OpenAIClient::from_env(ledger.clone())?);
//! ```

use async_trait::async_trait;
use openai_client::{CompletionResponse, OpenAIClient, Result};

use crate::traits::ai::ExtractionService;

#[async_trait]
impl ExtractionService for OpenAIClient {
    async fn complete(&self, instruction: &str, payload: &str) -> Result<CompletionResponse> {
        OpenAIClient::complete(self, instruction, payload).await
    }
}
