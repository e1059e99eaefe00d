//! OpenAI chat completion client
//!
//! A small client for the chat completions endpoint with the resilience the
//! scraping pipeline needs: bounded retries, rate-limit backoff driven by the
//! server's own hint, and per-call cost accounting into a shared ledger.
//!
//! # Example
//!
//! ```rust,ignore
//! use openai_client::{CostLedger, OpenAIClient};
//!
//! let ledger = CostLedger::new();
//! let client = OpenAIClient::from_env(ledger.clone())?;
//!
//! let response = client
//!     .complete("Summarize this page in one sentence: ", page_text)
//!     .await?;
//! println!("{} (spent so far: {})", response.content, ledger.total());
//! ```

pub mod cost;
pub mod error;
pub mod retry;
pub mod types;

pub use cost::{Cost, CostLedger, TokenPricing};
pub use error::{OpenAIError, Result, RATE_LIMIT_CODE};
pub use retry::{parse_retry_after, RetryPolicy, RetryStep};
pub use types::*;

use std::sync::Arc;

use reqwest::{header, Client};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Default model for completions.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI chat completion client.
///
/// Clones share the HTTP connection pool, the cost ledger and the request
/// gate.
#[derive(Clone)]
pub struct OpenAIClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
    pricing: TokenPricing,
    retry: RetryPolicy,
    ledger: CostLedger,
    /// Held for each attempt's exchange only, never across backoff
    gate: Option<Arc<Semaphore>>,
}

impl std::fmt::Debug for OpenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("pricing", &self.pricing)
            .field("retry", &self.retry)
            .field("gated", &self.gate.is_some())
            .finish_non_exhaustive()
    }
}

impl OpenAIClient {
    /// Create a new OpenAI client with the given API key, billing into `ledger`.
    pub fn new(api_key: impl Into<String>, ledger: CostLedger) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(OpenAIError::Config("OpenAI API key is empty".into()));
        }

        Ok(Self {
            http_client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            pricing: TokenPricing::default(),
            retry: RetryPolicy::default(),
            ledger,
            gate: None,
        })
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env(ledger: CostLedger) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| OpenAIError::Config("OPENAI_API_KEY not set".into()))?;
        Self::new(api_key, ledger)
    }

    /// Set a custom base URL (for Azure, proxies, test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model every request is addressed to.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_pricing(mut self, pricing: TokenPricing) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Use a preconfigured HTTP client (timeouts, proxies).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }

    /// Take a permit from `gate` for every request sent.
    ///
    /// The permit covers one send and its body read. It is released before
    /// any backoff pause, so a throttled call does not hold a slot while it
    /// waits. A closed gate fails the call with [`OpenAIError::Cancelled`].
    pub fn with_request_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ledger this client bills into.
    pub fn ledger(&self) -> &CostLedger {
        &self.ledger
    }

    /// Send `instruction` immediately followed by `payload` as one user
    /// message, retrying transient failures per the retry policy.
    pub async fn complete(&self, instruction: &str, payload: &str) -> Result<CompletionResponse> {
        let request = ChatRequest::instruction(&self.model, instruction, payload);
        self.chat_completion(&request).await
    }

    /// Chat completion with bounded retry.
    pub async fn chat_completion(&self, request: &ChatRequest) -> Result<CompletionResponse> {
        let mut retry_count = 0u32;
        loop {
            let error = match self.send_once(request).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            match self.retry.next_step(&error, retry_count) {
                RetryStep::Fail => return Err(error),
                RetryStep::Exhausted => {
                    warn!(
                        attempts = retry_count + 1,
                        error = %error,
                        "OpenAI retry limit reached"
                    );
                    return Err(error.exhausted(retry_count + 1));
                }
                RetryStep::Wait(wait) => {
                    if error.is_rate_limit() {
                        info!(
                            wait_ms = wait.as_millis() as u64,
                            retry = retry_count + 1,
                            "Rate limit exceeded, backing off"
                        );
                    } else {
                        warn!(
                            error = %error,
                            wait_ms = wait.as_millis() as u64,
                            retry = retry_count + 1,
                            "OpenAI request failed, backing off"
                        );
                    }
                    tokio::time::sleep(wait).await;
                }
                RetryStep::Immediate => {
                    warn!(error = %error, retry = retry_count + 1, "OpenAI request failed, retrying");
                }
            }
            retry_count += 1;
        }
    }

    /// One request/response exchange; bills the ledger on success.
    async fn send_once(&self, request: &ChatRequest) -> Result<CompletionResponse> {
        let permit = match &self.gate {
            Some(gate) => Some(
                Arc::clone(gate)
                    .acquire_owned()
                    .await
                    .map_err(|_| OpenAIError::Cancelled("request gate closed".into()))?,
            ),
            None => None,
        };
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI request failed");
                OpenAIError::Network(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OpenAIError::Network(e.to_string()))?;
        drop(permit);

        if !status.is_success() {
            let error = ApiErrorBody::into_error(&body, status.as_u16());
            debug!(status = %status, error = %error, "OpenAI API error");
            return Err(error);
        }

        let chat_response: ChatResponseRaw = serde_json::from_str(&body)
            .map_err(|e| OpenAIError::Parse(format!("Failed to deserialize response: {}", e)))?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OpenAIError::Parse("No choices in OpenAI response".into()))?;

        let cost = self.pricing.cost(&chat_response.usage);
        let total = self.ledger.record(cost);

        debug!(
            model = chat_response.model.as_deref().unwrap_or(&self.model),
            finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
            prompt_tokens = chat_response.usage.prompt_tokens,
            completion_tokens = chat_response.usage.completion_tokens,
            cost = %cost,
            total = %total,
            duration_ms = start.elapsed().as_millis() as u64,
            "OpenAI chat completion"
        );

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            prompt_tokens: chat_response.usage.prompt_tokens,
            completion_tokens: chat_response.usage.completion_tokens,
            cost,
        })
    }
}
