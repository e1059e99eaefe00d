//! In-memory sink for testing and dry runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{SinkError, SinkResult};
use crate::hashing::LinkHash;
use crate::record::JobRecord;
use crate::traits::sink::{DedupIndex, JobSink};

/// Records keyed by link hash. Data is lost on restart.
#[derive(Default)]
pub struct MemorySink {
    records: RwLock<HashMap<LinkHash, JobRecord>>,
}

impl MemorySink {
    /// Create a new empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn record_count(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    /// Snapshot of the stored records, in no particular order.
    pub fn records(&self) -> Vec<JobRecord> {
        self.records
            .read()
            .map(|r| r.values().cloned().collect())
            .unwrap_or_default()
    }
}

fn poisoned<T>(_: T) -> SinkError {
    SinkError::storage("memory sink lock poisoned")
}

#[async_trait]
impl DedupIndex for MemorySink {
    async fn exists(&self, hash: &LinkHash) -> SinkResult<bool> {
        Ok(self.records.read().map_err(poisoned)?.contains_key(hash))
    }
}

#[async_trait]
impl JobSink for MemorySink {
    async fn write_batch(&self, records: &[JobRecord]) -> SinkResult<usize> {
        let mut store = self.records.write().map_err(poisoned)?;
        let mut written = 0;
        for record in records {
            if store.contains_key(&record.source_link_hash) {
                continue;
            }
            store.insert(record.source_link_hash, record.clone());
            written += 1;
        }
        Ok(written)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
