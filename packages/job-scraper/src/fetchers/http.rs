//! HTTP page fetcher.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{Result, ScrapeError};
use crate::traits::fetcher::PageFetcher;

const DEFAULT_USER_AGENT: &str = concat!("job-scraper/", env!("CARGO_PKG_VERSION"));

/// Fetches pages over HTTP(S) with reqwest.
///
/// Any transport failure or non-2xx status is a `ScrapeError::Fetch`.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpFetcher {
    /// Create a fetcher with a 30 second timeout and at most 10 redirects.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| ScrapeError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client))
    }

    /// Use a preconfigured HTTP client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!(url = %url, "HTTP fetch starting");
        let fetch_error = |reason: String| ScrapeError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "HTTP request failed");
                fetch_error(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {status}")));
        }

        let body = response.text().await.map_err(|e| fetch_error(e.to_string()))?;
        debug!(url = %url, bytes = body.len(), "HTTP fetch complete");
        Ok(body)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/careers")
            .match_header("user-agent", "test-agent")
            .with_status(200)
            .with_body("<html><body>Jobs</body></html>")
            .create_async()
            .await;

        let fetcher = HttpFetcher::new().unwrap().with_user_agent("test-agent");
        let body = fetcher.fetch(&format!("{}/careers", server.url())).await.unwrap();

        assert_eq!(body, "<html><body>Jobs</body></html>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/gone")
            .with_status(404)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch(&format!("{}/gone", server.url())).await.unwrap_err();

        match err {
            ScrapeError::Fetch { reason, .. } => assert!(reason.contains("404")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_host_is_fetch_error() {
        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch("http://127.0.0.1:9/never").await.unwrap_err();

        assert_eq!(err.kind(), "fetch");
    }
}
