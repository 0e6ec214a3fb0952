//! Accessor methods for `PipelineConfig`.

use std::path::PathBuf;

use super::types::PipelineConfig;

impl PipelineConfig {
    #[must_use]
    pub fn store_path(&self) -> &PathBuf {
        &self.store_path
    }

    #[must_use]
    pub fn worker_count(&self) -> u32 {
        self.worker_count
    }

    #[must_use]
    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    #[must_use]
    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs
    }

    #[must_use]
    pub fn hang_timeout_secs(&self) -> u64 {
        self.hang_timeout_secs
    }

    #[must_use]
    pub fn max_attempts_per_request(&self) -> u32 {
        self.max_attempts_per_request
    }

    #[must_use]
    pub fn max_reconciliation_attempts(&self) -> u32 {
        self.max_reconciliation_attempts
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn chrome_data_dir(&self) -> Option<&PathBuf> {
        self.chrome_data_dir.as_ref()
    }
}
