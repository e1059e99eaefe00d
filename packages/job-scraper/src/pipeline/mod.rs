//! The extraction pipeline.
//!
//! - [`resolve`]: listing page -> job links
//! - [`detail`]: job page -> record
//! - [`scraper`]: the default [`JobScraper`](crate::traits::scraper::JobScraper)
//! - [`orchestrator`]: drives every source concurrently
//! - [`report`]: per-source and per-run outcomes

pub mod detail;
pub mod orchestrator;
pub mod report;
pub mod resolve;
pub mod scraper;

pub use detail::DetailParser;
pub use orchestrator::Orchestrator;
pub use report::{LinkFailure, RunReport, SourceReport, SourceState};
pub use resolve::{LinkResolution, LinkResolver};
pub use scraper::GenericScraper;
