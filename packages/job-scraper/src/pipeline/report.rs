//! Per-source and per-run outcomes.

use std::fmt;

use openai_client::Cost;

use crate::error::ScrapeError;

/// Where a source's pipeline is. `Persisted` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SourceState {
    Pending,
    LinksFetched,
    LinksResolved,
    DetailsFetching,
    DetailsParsed,
    Persisted,
    Failed,
}

impl SourceState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Persisted | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::LinksFetched => "links_fetched",
            Self::LinksResolved => "links_resolved",
            Self::DetailsFetching => "details_fetching",
            Self::DetailsParsed => "details_parsed",
            Self::Persisted => "persisted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A job link that did not produce a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFailure {
    pub url: String,
    pub kind: &'static str,
    pub message: String,
}

/// What happened to one source.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: String,
    pub state: SourceState,

    /// Stage the source was in when it failed
    pub failed_stage: Option<SourceState>,
    pub error_kind: Option<&'static str>,
    pub error: Option<String>,

    pub links_resolved: usize,
    pub links_already_seen: usize,
    pub links_truncated: usize,
    pub records_parsed: usize,
    pub records_written: usize,
    pub link_failures: Vec<LinkFailure>,
}

impl SourceReport {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            state: SourceState::Pending,
            failed_stage: None,
            error_kind: None,
            error: None,
            links_resolved: 0,
            links_already_seen: 0,
            links_truncated: 0,
            records_parsed: 0,
            records_written: 0,
            link_failures: Vec::new(),
        }
    }

    /// Move forward. Terminal states and backward moves are ignored.
    pub fn advance(&mut self, next: SourceState) {
        if self.state.is_terminal() || next <= self.state {
            return;
        }
        self.state = next;
    }

    /// Mark the source failed at its current stage.
    pub fn fail(&mut self, error: &ScrapeError) {
        if self.state.is_terminal() {
            return;
        }
        self.failed_stage = Some(self.state);
        self.error_kind = Some(error.kind());
        self.error = Some(error.to_string());
        self.state = SourceState::Failed;
    }

    pub fn succeeded(&self) -> bool {
        self.state == SourceState::Persisted
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
    pub total_cost: Cost,
    pub billed_calls: u64,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.sources.iter().filter(|s| s.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.sources.len() - self.succeeded()
    }

    pub fn records_written(&self) -> usize {
        self.sources.iter().map(|s| s.records_written).sum()
    }

    pub fn link_failures(&self) -> usize {
        self.sources.iter().map(|s| s.link_failures.len()).sum()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<48} {:>10} {:>6} {:>6} {:>6} {:>8}  error",
            "source", "state", "links", "seen", "parsed", "written"
        )?;
        for s in &self.sources {
            let error = match (&s.failed_stage, &s.error) {
                (Some(stage), Some(error)) => format!("[{stage}] {error}"),
                _ => String::new(),
            };
            writeln!(
                f,
                "{:<48} {:>10} {:>6} {:>6} {:>6} {:>8}  {}",
                s.source,
                s.state,
                s.links_resolved,
                s.links_already_seen,
                s.records_parsed,
                s.records_written,
                error
            )?;
        }
        write!(
            f,
            "{} sources ({} ok, {} failed), {} records written, {} link failures, \
             {} billed calls, total cost {}",
            self.sources.len(),
            self.succeeded(),
            self.failed(),
            self.records_written(),
            self.link_failures(),
            self.billed_calls,
            self.total_cost
        )
    }
}
