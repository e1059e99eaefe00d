//! Detail parsing: job page -> [`JobRecord`].

use std::sync::Arc;

use chrono::Utc;
use openai_client::truncate_to_char_boundary;
use tracing::debug;

use crate::error::{Result, ScrapeError};
use crate::hashing::LinkHash;
use crate::html;
use crate::prompts;
use crate::record::{ExtractedJob, JobRecord};
use crate::traits::ai::ExtractionService;

/// Turns one job-detail page into a record via the extraction service.
pub struct DetailParser {
    ai: Arc<dyn ExtractionService>,
    max_payload_bytes: usize,
}

impl DetailParser {
    pub fn new(ai: Arc<dyn ExtractionService>) -> Self {
        Self {
            ai,
            max_payload_bytes: usize::MAX,
        }
    }

    /// Cut the visible text sent to the service to at most `bytes`.
    pub fn with_max_payload_bytes(mut self, bytes: usize) -> Self {
        self.max_payload_bytes = bytes;
        self
    }

    /// Extract a record from the page at `source_url`.
    ///
    /// A malformed answer fails this link only and is never resent.
    pub async fn parse_detail(&self, page_content: &str, source_url: &str) -> Result<JobRecord> {
        let text = html::visible_text(page_content);
        if text.is_empty() {
            return Err(ScrapeError::malformed(source_url, "page has no visible text"));
        }
        let payload = truncate_to_char_boundary(&text, self.max_payload_bytes);

        let response = self.ai.complete(prompts::JOB_DETAILS, payload).await?;
        let content = response.unwrapped_content()?;
        let job = ExtractedJob::from_json(content)
            .map_err(|reason| ScrapeError::malformed(source_url, reason))?;

        let record = job.into_record(LinkHash::of(source_url), Utc::now());
        debug!(
            url = %source_url,
            cost = %response.cost,
            summary = %record.summary(),
            "Parsed job"
        );
        debug!(
            url = %source_url,
            "Responsibilities:\n{}\nQualifications:\n{}\nSkills:\n{}",
            JobRecord::bulleted(&record.responsibilities),
            JobRecord::bulleted(&record.qualifications),
            JobRecord::bulleted(&record.skills)
        );
        Ok(record)
    }
}
