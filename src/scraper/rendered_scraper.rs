//! Headless-browser scraper backed by `chromiumoxide` (C1, §4.1, §4.6).
//!
//! Every fetch launches a brand-new browser in its own disposable profile
//! directory and tears it down afterward. Stage 3's "fresh context per
//! version" invariant (§4.6) needs exactly this: reusing one browser's tabs
//! across version clicks would leak cookies/session state between versions,
//! so there is no long-lived-browser mode here to reach for by mistake.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use tokio::time::timeout;
use tracing::warn;

use crate::browser_profile::create_unique_profile_with_prefix;
use crate::browser_setup::{apply_stealth_measures, launch_browser};
use crate::error::ScrapeError;

use super::{FetchedPage, InteractiveAction, Scraper};

/// Renders pages in a disposable, single-use headless (or headful) browser.
pub struct RenderedScraper {
    headless: bool,
}

impl RenderedScraper {
    #[must_use]
    pub fn new(headless: bool) -> Self {
        Self { headless }
    }

    async fn open_fresh(headless: bool, url: &str) -> Result<(Browser, tokio::task::JoinHandle<()>, PathBuf, Page), ScrapeError> {
        let profile = create_unique_profile_with_prefix("rendered_fresh").map_err(|e| ScrapeError::Network {
            url: url.to_string(),
            message: format!("failed to create browser profile: {e}"),
        })?;
        let (browser, handler, profile_dir) = launch_browser(headless, Some(profile.path().to_path_buf()))
            .await
            .map_err(|e| ScrapeError::Network { url: url.to_string(), message: format!("failed to launch browser: {e}") })?;

        let page = browser.new_page(url).await.map_err(|e| ScrapeError::Network {
            url: url.to_string(),
            message: format!("failed to open page: {e}"),
        })?;
        if let Err(e) = apply_stealth_measures(&page).await {
            warn!("stealth measures failed for {url}: {e}");
        }

        Ok((browser, handler, profile_dir, page))
    }

    async fn drive_fetch(page: &Page, url: &str, timeout_secs: u64) -> Result<FetchedPage, ScrapeError> {
        let wait = page.wait_for_navigation();
        if timeout(Duration::from_secs(timeout_secs), wait).await.is_err() {
            return Err(ScrapeError::Timeout { url: url.to_string(), timeout_secs });
        }

        let html = page.content().await.map_err(|e| ScrapeError::Parse {
            url: url.to_string(),
            message: format!("failed to read rendered content: {e}"),
        })?;
        let _ = page.clone().close().await;

        Ok(FetchedPage { url: url.to_string(), html, status: 200 })
    }

    async fn drive_interactive(
        page: &Page,
        url: &str,
        actions: &[InteractiveAction],
        timeout_secs: u64,
    ) -> Result<FetchedPage, ScrapeError> {
        let wait = page.wait_for_navigation();
        if timeout(Duration::from_secs(timeout_secs), wait).await.is_err() {
            return Err(ScrapeError::Timeout { url: url.to_string(), timeout_secs });
        }

        for action in actions {
            match action {
                InteractiveAction::ClickNth { selector, index } => {
                    let elements = page.find_elements(selector.as_str()).await.map_err(|e| ScrapeError::Parse {
                        url: url.to_string(),
                        message: format!("failed to query selector {selector}: {e}"),
                    })?;
                    let element = elements.get(*index).ok_or_else(|| ScrapeError::Parse {
                        url: url.to_string(),
                        message: format!("selector {selector} index {index} not present"),
                    })?;
                    element.click().await.map_err(|e| ScrapeError::Network {
                        url: url.to_string(),
                        message: format!("click failed: {e}"),
                    })?;

                    let wait = page.wait_for_navigation();
                    if timeout(Duration::from_secs(timeout_secs), wait).await.is_err() {
                        return Err(ScrapeError::Timeout { url: url.to_string(), timeout_secs });
                    }
                }
            }
        }

        let final_url = page.url().await.ok().flatten().unwrap_or_else(|| url.to_string());
        let html = page.content().await.map_err(|e| ScrapeError::Parse {
            url: url.to_string(),
            message: format!("failed to read rendered content: {e}"),
        })?;
        let _ = page.clone().close().await;

        Ok(FetchedPage { url: final_url, html, status: 200 })
    }
}

fn teardown(browser: Browser, profile_dir: PathBuf) {
    drop(browser);
    let _ = std::fs::remove_dir_all(&profile_dir);
}

#[async_trait]
impl Scraper for RenderedScraper {
    async fn fetch(&self, url: &str, timeout_secs: u64) -> Result<FetchedPage, ScrapeError> {
        let (browser, _handler, profile_dir, page) = Self::open_fresh(self.headless, url).await?;
        let result = Self::drive_fetch(&page, url, timeout_secs).await;
        teardown(browser, profile_dir);
        result
    }

    fn is_interactive(&self) -> bool {
        true
    }

    async fn fetch_interactive(
        &self,
        url: &str,
        actions: &[InteractiveAction],
        timeout_secs: u64,
    ) -> Result<FetchedPage, ScrapeError> {
        let (browser, _handler, profile_dir, page) = Self::open_fresh(self.headless, url).await?;
        let result = Self::drive_interactive(&page, url, actions, timeout_secs).await;
        teardown(browser, profile_dir);
        result
    }
}
