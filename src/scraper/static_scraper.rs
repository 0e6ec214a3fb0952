//! Plain-HTTP scraper backed by `reqwest` (C1, §4.1). Used by Stage 1
//! discovery and the common case of Stage 2 extraction.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::ScrapeError;
use crate::utils::constants::CHROME_USER_AGENT;

use super::{FetchedPage, Scraper};

#[derive(Clone)]
pub struct StaticScraper {
    client: Client,
}

impl StaticScraper {
    pub fn new() -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .user_agent(CHROME_USER_AGENT)
            .build()
            .map_err(|e| ScrapeError::Network {
                url: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    /// Build from an existing `reqwest::Client`, e.g. one shared with
    /// another subsystem.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Scraper for StaticScraper {
    async fn fetch(&self, url: &str, timeout_secs: u64) -> Result<FetchedPage, ScrapeError> {
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(timeout_secs))
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url, &e))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ScrapeError::RateLimited { url: url.to_string() });
        }
        if !status.is_success() {
            return Err(ScrapeError::Api { url: url.to_string(), status: status.as_u16() });
        }

        let html = response.text().await.map_err(|e| ScrapeError::Parse {
            url: url.to_string(),
            message: format!("failed to read response body: {e}"),
        })?;

        Ok(FetchedPage { url: url.to_string(), html, status: status.as_u16() })
    }
}

fn classify_reqwest_error(url: &str, err: &reqwest::Error) -> ScrapeError {
    if err.is_timeout() {
        ScrapeError::Timeout { url: url.to_string(), timeout_secs: 0 }
    } else {
        ScrapeError::Network { url: url.to_string(), message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_returns_parsed_page_on_200() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/section/100")
            .with_status(200)
            .with_body("<html><body>Section 100 text.</body></html>")
            .create_async()
            .await;

        let scraper = StaticScraper::new().unwrap();
        let url = format!("{}/section/100", server.url());
        let page = scraper.fetch(&url, 5).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.status, 200);
        assert!(page.html.contains("Section 100 text."));
    }

    #[tokio::test]
    async fn fetch_maps_429_to_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/busy").with_status(429).create_async().await;

        let scraper = StaticScraper::new().unwrap();
        let url = format!("{}/busy", server.url());
        let err = scraper.fetch(&url, 5).await.unwrap_err();
        assert!(matches!(err, ScrapeError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn fetch_maps_500_to_api_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/down").with_status(500).create_async().await;

        let scraper = StaticScraper::new().unwrap();
        let url = format!("{}/down", server.url());
        let err = scraper.fetch(&url, 5).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Api { status: 500, .. }));
    }
}
