//! Listing-page source list.
//!
//! One URL per line. Blank lines and `#` comments are ignored; anything that
//! is not an absolute http(s) URL is logged and skipped.

use std::path::Path;

use tracing::warn;
use url::Url;

use crate::error::{Result, ScrapeError};

/// Parse the contents of a sources file.
pub fn parse_sources(contents: &str) -> Vec<String> {
    contents
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            match Url::parse(line) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => Some(line.to_string()),
                Ok(_) => {
                    warn!(line = index + 1, source = %line, "Skipping non-http source");
                    None
                }
                Err(e) => {
                    warn!(line = index + 1, source = %line, error = %e, "Skipping invalid source URL");
                    None
                }
            }
        })
        .collect()
}

/// Read and parse a sources file.
pub async fn load_sources(path: &Path) -> Result<Vec<String>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ScrapeError::Config(format!("cannot read {}: {e}", path.display())))?;
    Ok(parse_sources(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sources_skips_noise() {
        let contents = "\
# career pages
https://acme.test/careers

  https://globex.test/jobs
not a url
ftp://files.test/jobs
# https://commented.test/
";

        assert_eq!(
            parse_sources(contents),
            vec!["https://acme.test/careers", "https://globex.test/jobs"]
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_config_error() {
        let err = load_sources(Path::new("/definitely/not/here.txt"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "config");
    }
}
