//! Typed error taxonomy for the pipeline core.
//!
//! Mirrors the teacher's split between a typed internal error (`CrawlError` in
//! the original crawl engine) and `anyhow::Error` at the orchestration
//! boundary: library seams return `PipelineResult<T>`, the CLI surfaces
//! `anyhow::Error` with added context.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Errors a `Scraper` implementation can surface from a single fetch.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("fetch of {url} did not complete within {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("upstream API error for {url}: status {status}")]
    Api { url: String, status: u16 },

    #[error("rate limited fetching {url}")]
    RateLimited { url: String },

    #[error("failed to parse response for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("interactive fetch of {url} not supported: {message}")]
    Unsupported { url: String, message: String },
}

impl ScrapeError {
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Network { url, .. }
            | Self::Timeout { url, .. }
            | Self::Api { url, .. }
            | Self::RateLimited { url, .. }
            | Self::Parse { url, .. }
            | Self::Unsupported { url, .. } => url,
        }
    }

    /// Whether a fresh attempt is worth making per the retry ladder in §7.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } | Self::RateLimited { .. } => true,
            // Permanent 4xx (other than 429, which is RateLimited) are not retried.
            Self::Api { status, .. } => *status >= 500,
            Self::Parse { .. } => true,
            // Wrong scraper for the URL; retrying against the same scraper can't help.
            Self::Unsupported { .. } => false,
        }
    }
}

/// Errors the `Store` adapter can surface.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Top-level pipeline error, returned by stage/controller entry points.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("scrape error: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("pipeline cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// The failure taxonomy from §4.8/§7, attached to every `FailureRecord`.
///
/// Generalizes the teacher's `FailureKind::classify(&anyhow::Error)`
/// (substring sniffing over an opaque error) into exhaustive matching over
/// the typed errors the scraper and parser already produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    NetworkError,
    Timeout,
    ParseError,
    EmptyContent,
    ApiError,
    MultiVersionTimeout,
    Repealed,
}

impl FailureType {
    /// Classify a scraper-level error (Stage 1/2, static fetch).
    #[must_use]
    pub const fn from_scrape_error(err: &ScrapeError) -> Self {
        match err {
            ScrapeError::Network { .. } => Self::NetworkError,
            ScrapeError::Timeout { .. } => Self::Timeout,
            ScrapeError::RateLimited { .. } | ScrapeError::Api { .. } => Self::ApiError,
            ScrapeError::Parse { .. } | ScrapeError::Unsupported { .. } => Self::ParseError,
        }
    }

    /// Classify a Stage 3 (rendered, multi-version) failure.
    #[must_use]
    pub const fn multi_version_timeout() -> Self {
        Self::MultiVersionTimeout
    }

    /// Default retriability per the classification table in §4.8.
    #[must_use]
    pub const fn is_retriable(self) -> bool {
        !matches!(self, Self::Repealed)
    }

    /// `empty_content` is only retried once; every other retriable class
    /// follows the normal attempt ladder.
    #[must_use]
    pub const fn max_attempts(self, default_max_attempts: u32) -> u32 {
        match self {
            Self::EmptyContent => 1,
            Self::Repealed => 0,
            _ => default_max_attempts,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NetworkError => "network_error",
            Self::Timeout => "timeout",
            Self::ParseError => "parse_error",
            Self::EmptyContent => "empty_content",
            Self::ApiError => "api_error",
            Self::MultiVersionTimeout => "multi_version_timeout",
            Self::Repealed => "repealed",
        }
    }
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_classification_is_total_for_scrape_errors() {
        let cases = [
            ScrapeError::Network { url: "u".into(), message: "m".into() },
            ScrapeError::Timeout { url: "u".into(), timeout_secs: 1 },
            ScrapeError::Api { url: "u".into(), status: 500 },
            ScrapeError::RateLimited { url: "u".into() },
            ScrapeError::Parse { url: "u".into(), message: "m".into() },
            ScrapeError::Unsupported { url: "u".into(), message: "m".into() },
        ];
        for case in cases {
            // Every variant maps to exactly one FailureType - this would not
            // compile if a variant were unhandled.
            let _ = FailureType::from_scrape_error(&case);
        }
    }

    #[test]
    fn empty_content_is_retried_once() {
        assert_eq!(FailureType::EmptyContent.max_attempts(3), 1);
        assert_eq!(FailureType::NetworkError.max_attempts(3), 3);
        assert_eq!(FailureType::Repealed.max_attempts(3), 0);
    }

    #[test]
    fn repealed_is_not_retriable() {
        assert!(!FailureType::Repealed.is_retriable());
        assert!(FailureType::NetworkError.is_retriable());
    }
}
