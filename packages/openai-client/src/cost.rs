//! Token pricing and the shared cost ledger.
//!
//! Money is tracked in integer nano-dollars so concurrent additions are a
//! single atomic `fetch_add` and totals are exact.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::types::Usage;

const NANOS_PER_DOLLAR: f64 = 1_000_000_000.0;

/// An amount of money in nano-dollars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cost(u64);

impl Cost {
    pub const ZERO: Cost = Cost(0);

    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    pub fn nanos(&self) -> u64 {
        self.0
    }

    pub fn as_usd(&self) -> f64 {
        self.0 as f64 / NANOS_PER_DOLLAR
    }
}

impl std::ops::Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        Cost(self.0.saturating_add(rhs.0))
    }
}

impl std::iter::Sum for Cost {
    fn sum<I: Iterator<Item = Cost>>(iter: I) -> Cost {
        iter.fold(Cost::ZERO, |acc, c| acc + c)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.6}", self.as_usd())
    }
}

/// Per-token prices for one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPricing {
    /// Price of one prompt token, in nano-dollars
    pub prompt_nanos: u64,

    /// Price of one completion token, in nano-dollars
    pub completion_nanos: u64,
}

impl Default for TokenPricing {
    /// gpt-3.5-turbo: $0.0000005 per prompt token, $0.0000015 per completion token.
    fn default() -> Self {
        Self {
            prompt_nanos: 500,
            completion_nanos: 1_500,
        }
    }
}

impl TokenPricing {
    pub fn new(prompt_nanos: u64, completion_nanos: u64) -> Self {
        Self {
            prompt_nanos,
            completion_nanos,
        }
    }

    /// `prompt_tokens * P + completion_tokens * C`
    pub fn cost(&self, usage: &Usage) -> Cost {
        let prompt = u64::from(usage.prompt_tokens).saturating_mul(self.prompt_nanos);
        let completion = u64::from(usage.completion_tokens).saturating_mul(self.completion_nanos);
        Cost(prompt.saturating_add(completion))
    }
}

/// Running total of extraction spend.
///
/// Cheap to clone; clones share the same total. The total only ever grows.
#[derive(Debug, Clone, Default)]
pub struct CostLedger {
    inner: Arc<LedgerInner>,
}

#[derive(Debug, Default)]
struct LedgerInner {
    total_nanos: AtomicU64,
    billed_calls: AtomicU64,
}

impl CostLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one billed call and return the new running total.
    pub fn record(&self, cost: Cost) -> Cost {
        self.inner.billed_calls.fetch_add(1, Ordering::Relaxed);
        let previous = self.inner.total_nanos.fetch_add(cost.0, Ordering::AcqRel);
        Cost(previous.saturating_add(cost.0))
    }

    pub fn total(&self) -> Cost {
        Cost(self.inner.total_nanos.load(Ordering::Acquire))
    }

    /// Number of calls that were billed.
    pub fn billed_calls(&self) -> u64 {
        self.inner.billed_calls.load(Ordering::Relaxed)
    }
}
