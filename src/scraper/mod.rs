//! Fetching abstraction (C1, §4.1): a `Scraper` retrieves raw HTML for a
//! URL, either over plain HTTP or through a headless browser for
//! interactive/multi-version pages.

pub mod rendered_scraper;
pub mod static_scraper;

pub use rendered_scraper::RenderedScraper;
pub use static_scraper::StaticScraper;

use async_trait::async_trait;

use crate::error::ScrapeError;

/// One page fetch, regardless of backend.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub html: String,
    pub status: u16,
}

/// A single browser interaction step for `fetch_interactive` (§4.1): the
/// only path capable of resolving session-gated "select from multiples"
/// links, where the target URL only appears after a click against
/// server-rendered state.
#[derive(Debug, Clone)]
pub enum InteractiveAction {
    /// Click the `index`-th element matching `selector`.
    ClickNth { selector: String, index: usize },
}

/// The fetching seam (C1, §4.1). `StaticScraper` backs Stage 1/Stage 2;
/// `RenderedScraper` backs Stage 3, where content is only present after
/// JavaScript executes.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Fetch a single URL with the given timeout.
    async fn fetch(&self, url: &str, timeout_secs: u64) -> Result<FetchedPage, ScrapeError>;

    /// Whether this scraper renders JavaScript. Multi-version sections
    /// (§4.6) require a renderer; Stage 1/2 content does not.
    fn is_interactive(&self) -> bool {
        false
    }

    /// Fetch a page, replaying `actions` against the live DOM before
    /// reading back the final content (§4.1, §4.6). Only scrapers that
    /// render JavaScript can implement this meaningfully; the default
    /// rejects it.
    async fn fetch_interactive(
        &self,
        url: &str,
        actions: &[InteractiveAction],
        timeout_secs: u64,
    ) -> Result<FetchedPage, ScrapeError> {
        let _ = (actions, timeout_secs);
        Err(ScrapeError::Unsupported {
            url: url.to_string(),
            message: "scraper does not support interactive fetch".to_string(),
        })
    }
}
