//! Exponential-backoff retry wrapper shared by Stage 1 and Stage 2 (§4.5,
//! §7): up to `max_attempts`, doubling from `RETRY_BACKOFF_BASE_SECS` with
//! jitter.

use rand::Rng;
use tracing::warn;

use crate::error::ScrapeError;
use crate::scraper::{FetchedPage, Scraper};
use crate::utils::constants::RETRY_BACKOFF_BASE_SECS;

/// Fetch `url`, retrying transient failures up to `max_attempts` times.
pub async fn fetch_with_backoff(
    scraper: &dyn Scraper,
    url: &str,
    max_attempts: u32,
    timeout_secs: u64,
) -> Result<FetchedPage, ScrapeError> {
    let mut last_err = None;
    for attempt in 1..=max_attempts.max(1) {
        match scraper.fetch(url, timeout_secs).await {
            Ok(page) => return Ok(page),
            Err(e) if !e.is_retriable() || attempt == max_attempts => return Err(e),
            Err(e) => {
                let delay = backoff_delay(attempt);
                warn!(url, attempt, delay_secs = delay.as_secs(), error = %e, "retrying fetch");
                tokio::time::sleep(delay).await;
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| ScrapeError::Network { url: url.to_string(), message: "exhausted retries".into() }))
}

fn backoff_delay(attempt: u32) -> std::time::Duration {
    let base = RETRY_BACKOFF_BASE_SECS.saturating_pow(attempt);
    let jitter_ms = rand::rng().random_range(0..500);
    std::time::Duration::from_secs(base) + std::time::Duration::from_millis(jitter_ms)
}
