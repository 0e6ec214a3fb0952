//! Core configuration type for the pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::utils::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_HANG_TIMEOUT_SECS, DEFAULT_MAX_ATTEMPTS_PER_REQUEST,
    DEFAULT_MAX_RECONCILIATION_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_WORKER_COUNT,
};

/// Runtime configuration for `PipelineController` (§4.9, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Path to the SQLite store file.
    ///
    /// **INVARIANT:** Always an absolute path (normalized in builder), so
    /// resumed runs always resolve to the same database regardless of the
    /// process's current working directory.
    pub(crate) store_path: PathBuf,

    /// Concurrent worker count for Stage 2 extraction (§4.5).
    pub(crate) worker_count: u32,

    /// Batch size for Stage 2 extraction (§4.5).
    pub(crate) batch_size: u32,

    /// Per-fetch timeout in seconds (§4.5).
    pub(crate) request_timeout_secs: u64,

    /// Hang-cancellation timeout in seconds, normally 2x `request_timeout_secs`.
    pub(crate) hang_timeout_secs: u64,

    /// Maximum attempts per request before logging a failure (§4.5, §7).
    pub(crate) max_attempts_per_request: u32,

    /// Maximum reconciliation passes before giving up (§4.7).
    pub(crate) max_reconciliation_attempts: u32,

    /// Run the rendered scraper/multi-version fetcher headless.
    pub(crate) headless: bool,

    /// Chrome user data directory for browser profile isolation.
    #[serde(skip)]
    pub(crate) chrome_data_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("./ca_code_pipeline.db"),
            worker_count: DEFAULT_WORKER_COUNT,
            batch_size: DEFAULT_BATCH_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            hang_timeout_secs: DEFAULT_HANG_TIMEOUT_SECS,
            max_attempts_per_request: DEFAULT_MAX_ATTEMPTS_PER_REQUEST,
            max_reconciliation_attempts: DEFAULT_MAX_RECONCILIATION_ATTEMPTS,
            headless: true,
            chrome_data_dir: None,
        }
    }
}
