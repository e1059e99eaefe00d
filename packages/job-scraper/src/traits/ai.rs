//! Extraction service trait.

use async_trait::async_trait;
use openai_client::{CompletionResponse, Result};

/// A billed instruction-following completion endpoint.
///
/// Implementations own their retry policy and cost accounting; callers only
/// see the final answer or the terminal error.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    /// Send `instruction` immediately followed by `payload` as one prompt.
    async fn complete(&self, instruction: &str, payload: &str) -> Result<CompletionResponse>;
}

#[async_trait]
impl<T: ExtractionService + ?Sized> ExtractionService for std::sync::Arc<T> {
    async fn complete(&self, instruction: &str, payload: &str) -> Result<CompletionResponse> {
        (**self).complete(instruction, payload).await
    }
}
