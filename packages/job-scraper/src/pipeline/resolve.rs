//! Link resolution: listing page -> unseen job-detail links.
//!
//! 1. Collect the page's anchors and drop obvious noise
//! 2. Ask the extraction service which ones lead to job postings
//! 3. Resolve the chosen hrefs against the page URL, keeping document order
//! 4. Drop links the dedup index already holds
//! 5. Keep at most `max_links`

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::LinkSelectionMode;
use crate::error::{Result, ScrapeError};
use crate::hashing::{resolve_href, CandidateLink};
use crate::html;
use crate::prompts;
use crate::traits::ai::ExtractionService;
use crate::traits::sink::DedupIndex;

/// Outcome of resolving one listing page.
#[derive(Debug, Clone, Default)]
pub struct LinkResolution {
    /// Unseen job links in document order, at most `max_links`
    pub links: Vec<CandidateLink>,

    /// Chosen links dropped because they were already persisted
    pub already_seen: usize,

    /// Unseen links dropped by the `max_links` cap
    pub truncated: usize,

    /// Chosen hrefs that do not occur on the page
    pub discarded: usize,
}

/// Picks job-detail links off listing pages.
pub struct LinkResolver {
    ai: Arc<dyn ExtractionService>,
    dedup: Arc<dyn DedupIndex>,
    mode: LinkSelectionMode,
}

impl LinkResolver {
    pub fn new(ai: Arc<dyn ExtractionService>, dedup: Arc<dyn DedupIndex>) -> Self {
        Self {
            ai,
            dedup,
            mode: LinkSelectionMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: LinkSelectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Resolve the job links of the listing page at `base_url`.
    pub async fn resolve_job_links(
        &self,
        page_content: &str,
        base_url: &str,
        max_links: usize,
    ) -> Result<LinkResolution> {
        let base = Url::parse(base_url).map_err(|e| ScrapeError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        let hrefs = html::navigable_hrefs(&html::extract_hrefs(page_content));
        let on_page = PageLinks::new(&base, &hrefs);
        if on_page.is_empty() {
            debug!(base_url = %base_url, "Listing page has no navigable links");
            return Ok(LinkResolution::default());
        }

        let mut resolution = LinkResolution::default();
        let chosen = match self.mode {
            LinkSelectionMode::JsonArray => {
                self.choose_by_array(&hrefs, &base, &on_page, &mut resolution)
                    .await?
            }
            LinkSelectionMode::Pattern => self.choose_by_pattern(&hrefs, &on_page).await?,
        };

        for link in chosen {
            if self.dedup.exists(&link.content_hash).await? {
                info!(url = %link.url(), "Job already stored, skipping");
                resolution.already_seen += 1;
                continue;
            }
            resolution.links.push(link);
        }

        if resolution.links.len() > max_links {
            resolution.truncated = resolution.links.len() - max_links;
            resolution.links.truncate(max_links);
            info!(
                base_url = %base_url,
                kept = max_links,
                dropped = resolution.truncated,
                "Job link cap reached"
            );
        }

        debug!(
            base_url = %base_url,
            links = resolution.links.len(),
            already_seen = resolution.already_seen,
            discarded = resolution.discarded,
            "Links resolved"
        );
        Ok(resolution)
    }

    async fn choose_by_array(
        &self,
        hrefs: &[String],
        base: &Url,
        on_page: &PageLinks,
        resolution: &mut LinkResolution,
    ) -> Result<Vec<CandidateLink>> {
        let payload = hrefs.join(prompts::LINK_SEPARATOR);
        let response = self.ai.complete(prompts::LINK_SELECTION, &payload).await?;
        let selected = parse_link_selection(response.unwrapped_content()?)
            .map_err(|e| ScrapeError::malformed(base.as_str(), e))?;

        let mut positions = Vec::new();
        let mut taken = HashSet::new();
        for href in &selected {
            match on_page.position_of(base, href) {
                Some(position) => {
                    if taken.insert(position) {
                        positions.push(position);
                    }
                }
                None => {
                    debug!(href = %href, "Chosen link is not on the page, dropping");
                    resolution.discarded += 1;
                }
            }
        }
        positions.sort_unstable();
        Ok(positions.into_iter().map(|p| on_page.links[p].clone()).collect())
    }

    async fn choose_by_pattern(
        &self,
        hrefs: &[String],
        on_page: &PageLinks,
    ) -> Result<Vec<CandidateLink>> {
        let payload = hrefs.join(prompts::LINK_SEPARATOR);
        let response = self.ai.complete(prompts::LINK_PATTERN, &payload).await?;
        let raw = response.unwrapped_content()?;

        let pattern = match Regex::new(strip_pattern_delimiters(raw)) {
            Ok(pattern) => pattern,
            Err(e) => {
                warn!(pattern = %raw, error = %e, "Service returned an invalid pattern");
                return Ok(Vec::new());
            }
        };

        Ok(on_page
            .links
            .iter()
            .filter(|link| pattern.is_match(&link.raw_href))
            .cloned()
            .collect())
    }
}

/// Resolved page links in document order, one per distinct URL.
struct PageLinks {
    links: Vec<CandidateLink>,
    by_url: HashMap<String, usize>,
}

impl PageLinks {
    fn new(base: &Url, hrefs: &[String]) -> Self {
        let mut links: Vec<CandidateLink> = Vec::new();
        let mut by_url = HashMap::new();
        for href in hrefs {
            let Some(resolved) = resolve_href(base, href) else {
                continue;
            };
            if by_url.contains_key(resolved.as_str()) {
                continue;
            }
            by_url.insert(resolved.to_string(), links.len());
            links.push(CandidateLink::new(href.clone(), resolved));
        }
        Self { links, by_url }
    }

    fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    fn position_of(&self, base: &Url, href: &str) -> Option<usize> {
        let resolved = resolve_href(base, href)?;
        self.by_url.get(resolved.as_str()).copied()
    }
}

/// Read the chosen hrefs out of the service's answer.
///
/// An array is taken as-is; an object contributes the first array that
/// holds strings, in the order the keys appear in the answer. Any other
/// JSON value selects nothing.
pub fn parse_link_selection(content: &str) -> std::result::Result<Vec<String>, String> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| format!("link selection is not JSON: {e}"))?;

    let strings = |items: Vec<Value>| -> Vec<String> {
        items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                _ => None,
            })
            .collect()
    };

    Ok(match value {
        Value::Array(items) => strings(items),
        Value::Object(map) => map
            .into_iter()
            .find_map(|(_, v)| match v {
                Value::Array(items) if items.iter().any(Value::is_string) => Some(strings(items)),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    })
}

fn strip_pattern_delimiters(raw: &str) -> &str {
    let trimmed = raw.trim();
    for (open, close) in [("/", "/"), ("\"", "\""), ("'", "'"), ("`", "`")] {
        if trimmed.len() >= 2 {
            if let Some(inner) = trimmed
                .strip_prefix(open)
                .and_then(|rest| rest.strip_suffix(close))
            {
                return inner;
            }
        }
    }
    trimmed
}
