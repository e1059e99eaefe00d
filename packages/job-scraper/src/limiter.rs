//! Process-wide cap on in-flight network operations.
//!
//! One [`ConcurrencyLimiter`] is shared by every source and link task. Page
//! fetches take a permit explicitly. The OpenAI client takes one per request
//! attempt through [`ConcurrencyLimiter::gate`], so rate-limit backoff never
//! holds a slot. Other services can be wrapped whole in [`LimitedService`].

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use openai_client::{CompletionResponse, OpenAIClient, OpenAIError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Result, ScrapeError};
use crate::traits::ai::ExtractionService;

/// Default number of simultaneous operations.
pub const DEFAULT_MAX_CONCURRENCY: usize = 200;

/// Counting semaphore shared across tasks. Clones share the same permits.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held slot. The slot is returned when this is dropped, whether the
/// guarded work finished, failed, panicked or was cancelled.
#[derive(Debug)]
pub struct Permit {
    _permit: OwnedSemaphorePermit,
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY)
    }
}

impl ConcurrencyLimiter {
    /// Create a limiter with `capacity` slots (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait until a slot is free.
    pub async fn acquire(&self) -> Result<Permit> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| ScrapeError::Task("concurrency limiter closed".into()))?;
        Ok(Permit { _permit: permit })
    }

    /// Run `work` while holding a slot.
    pub async fn run<F, T>(&self, work: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        let _permit = self.acquire().await?;
        Ok(work.await)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Slots currently held.
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }

    /// Refuse all future acquisitions. Holders keep their slots.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Make every request `client` sends hold one of this limiter's slots.
    pub fn gate(&self, client: OpenAIClient) -> OpenAIClient {
        client.with_request_gate(Arc::clone(&self.semaphore))
    }
}

/// An extraction service whose calls each hold a limiter slot.
///
/// The slot covers the whole call. For services that retry internally, gate
/// the individual requests instead.
pub struct LimitedService<S> {
    inner: S,
    limiter: ConcurrencyLimiter,
}

impl<S: ExtractionService> LimitedService<S> {
    pub fn new(inner: S, limiter: ConcurrencyLimiter) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl<S: ExtractionService> ExtractionService for LimitedService<S> {
    async fn complete(
        &self,
        instruction: &str,
        payload: &str,
    ) -> openai_client::Result<CompletionResponse> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| OpenAIError::Cancelled(e.to_string()))?;
        self.inner.complete(instruction, payload).await
    }
}

/// Extension trait for wrapping a service in a limiter.
pub trait LimitExt: ExtractionService + Sized {
    fn limited(self, limiter: ConcurrencyLimiter) -> LimitedService<Self> {
        LimitedService::new(self, limiter)
    }
}

impl<S: ExtractionService> LimitExt for S {}
