//! Shared configuration constants for the pipeline.
//!
//! This module contains default values used throughout the codebase to
//! ensure consistency and avoid magic numbers.

/// Default number of concurrent workers (C5, §4.5).
pub const DEFAULT_WORKER_COUNT: u32 = 15;

/// Default batch size for Stage 2 extraction (§4.5).
pub const DEFAULT_BATCH_SIZE: u32 = 50;

/// Default per-fetch request timeout in seconds (§4.5).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Hang-cancellation timeout: 2x the request timeout (§4.5).
pub const DEFAULT_HANG_TIMEOUT_SECS: u64 = DEFAULT_REQUEST_TIMEOUT_SECS * 2;

/// Maximum retry attempts per request before logging a failure (§4.5, §7).
pub const DEFAULT_MAX_ATTEMPTS_PER_REQUEST: u32 = 3;

/// Maximum number of reconciliation passes before giving up (§4.7).
pub const DEFAULT_MAX_RECONCILIATION_ATTEMPTS: u32 = 2;

/// Per-section timeout for Stage 3 rendered multi-version fetches (§4.6).
pub const MULTI_VERSION_FETCH_TIMEOUT_SECS: u64 = 90;

/// Base backoff in seconds for the exponential retry ladder (§4.5): doubles
/// with jitter on each attempt (2s, 4s, 8s, ...).
pub const RETRY_BACKOFF_BASE_SECS: u64 = 2;

/// Failure-log `error_message` values are truncated to this many characters
/// before being persisted, so one runaway error string can't blow up a
/// failure record (§4.8).
pub const MAX_FAILURE_MESSAGE_CHARS: usize = 500;

/// Chrome user agent string used by the rendered scraper and multi-version
/// fetcher for stealth mode.
///
/// Updated: 2025-01-29 to Chrome 132 (current stable).
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Code index page base URL; the code abbreviation is passed as the
/// `tocCode` query parameter (§6).
pub const CODE_INDEX_BASE_URL: &str = "https://leginfo.legislature.ca.gov/faces/codesTOCSelected.xhtml";

/// Build the code index page URL for `code` (e.g. "WIC", "FAM").
#[must_use]
pub fn code_index_url(code: &str) -> String {
    format!("{CODE_INDEX_BASE_URL}?tocCode={code}")
}
