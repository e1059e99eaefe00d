//! Dedup and persistence traits.

use async_trait::async_trait;

use crate::error::SinkResult;
use crate::hashing::LinkHash;
use crate::record::JobRecord;

/// Answers "has this link been persisted before?".
#[async_trait]
pub trait DedupIndex: Send + Sync {
    async fn exists(&self, hash: &LinkHash) -> SinkResult<bool>;
}

/// Destination for extracted job records.
///
/// A sink is also the dedup index: a link counts as seen once its record has
/// been written.
#[async_trait]
pub trait JobSink: DedupIndex {
    /// Persist one source's records as a single batch.
    ///
    /// Records whose `source_link_hash` is already stored are skipped.
    /// Returns how many records were newly stored.
    async fn write_batch(&self, records: &[JobRecord]) -> SinkResult<usize>;

    /// Short name for logs.
    fn name(&self) -> &str;
}
