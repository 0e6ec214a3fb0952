//! Type-safe builder for `PipelineConfig` using the typestate pattern.
//!
//! Mirrors the configuration layering in §6: builder defaults, overridden by
//! `from_env()`, overridden in turn by explicit setters the CLI calls with
//! parsed flag values.

use std::env;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use crate::utils::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_HANG_TIMEOUT_SECS, DEFAULT_MAX_ATTEMPTS_PER_REQUEST,
    DEFAULT_MAX_RECONCILIATION_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_WORKER_COUNT,
};

use super::types::PipelineConfig;

// Type state for the builder: the only required field is `store_path`, so
// reaching `WithStorePath` is sufficient to call `build()`.
pub struct WithStorePath;

pub struct PipelineConfigBuilder<State = ()> {
    pub(crate) store_path: Option<PathBuf>,
    pub(crate) worker_count: u32,
    pub(crate) batch_size: u32,
    pub(crate) request_timeout_secs: u64,
    pub(crate) hang_timeout_secs: u64,
    pub(crate) max_attempts_per_request: u32,
    pub(crate) max_reconciliation_attempts: u32,
    pub(crate) headless: bool,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for PipelineConfigBuilder<()> {
    fn default() -> Self {
        Self {
            store_path: None,
            worker_count: DEFAULT_WORKER_COUNT,
            batch_size: DEFAULT_BATCH_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            hang_timeout_secs: DEFAULT_HANG_TIMEOUT_SECS,
            max_attempts_per_request: DEFAULT_MAX_ATTEMPTS_PER_REQUEST,
            max_reconciliation_attempts: DEFAULT_MAX_RECONCILIATION_ATTEMPTS,
            headless: true,
            _phantom: PhantomData,
        }
    }
}

impl PipelineConfig {
    /// Start a builder with hard-coded defaults only.
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder<()> {
        PipelineConfigBuilder::default()
    }

    /// Start a builder seeded from `CITESCRAPE_*` environment variables,
    /// falling back to hard-coded defaults for anything unset (§6 precedence
    /// tier 2, env overrides builder default).
    #[must_use]
    pub fn builder_from_env() -> PipelineConfigBuilder<()> {
        let mut builder = PipelineConfigBuilder::default();

        if let Some(v) = parse_env("CITESCRAPE_DEFAULT_BATCH_SIZE") {
            builder.batch_size = v;
        }
        if let Some(v) = parse_env("CITESCRAPE_DEFAULT_WORKER_COUNT") {
            builder.worker_count = v;
        }
        if let Some(v) = parse_env("CITESCRAPE_REQUEST_TIMEOUT_SECS") {
            builder.request_timeout_secs = v;
        }
        if let Some(v) = parse_env("CITESCRAPE_HANG_TIMEOUT_SECS") {
            builder.hang_timeout_secs = v;
        }

        builder
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

impl PipelineConfigBuilder<()> {
    /// Set the store path (required to build). `CITESCRAPE_STORE_PATH` is
    /// the env-tier equivalent, read directly by the CLI before this call.
    #[must_use]
    pub fn store_path(self, path: impl AsRef<Path>) -> PipelineConfigBuilder<WithStorePath> {
        let absolute = if path.as_ref().is_absolute() {
            path.as_ref().to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path.as_ref()))
                .unwrap_or_else(|_| path.as_ref().to_path_buf())
        };

        PipelineConfigBuilder {
            store_path: Some(absolute),
            worker_count: self.worker_count,
            batch_size: self.batch_size,
            request_timeout_secs: self.request_timeout_secs,
            hang_timeout_secs: self.hang_timeout_secs,
            max_attempts_per_request: self.max_attempts_per_request,
            max_reconciliation_attempts: self.max_reconciliation_attempts,
            headless: self.headless,
            _phantom: PhantomData,
        }
    }
}

impl PipelineConfigBuilder<WithStorePath> {
    pub fn build(self) -> Result<PipelineConfig> {
        Ok(PipelineConfig {
            store_path: self.store_path.ok_or_else(|| anyhow!("store_path is required"))?,
            worker_count: self.worker_count.max(1),
            batch_size: self.batch_size.max(1),
            request_timeout_secs: self.request_timeout_secs,
            hang_timeout_secs: self.hang_timeout_secs,
            max_attempts_per_request: self.max_attempts_per_request,
            max_reconciliation_attempts: self.max_reconciliation_attempts,
            headless: self.headless,
            chrome_data_dir: None,
        })
    }
}

// Available at any state: these are tier-3 (CLI flag) overrides in §6.
impl<State> PipelineConfigBuilder<State> {
    #[must_use]
    pub fn worker_count(mut self, count: u32) -> Self {
        self.worker_count = count;
        self
    }

    #[must_use]
    pub fn batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }

    #[must_use]
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn hang_timeout_secs(mut self, secs: u64) -> Self {
        self.hang_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn max_attempts_per_request(mut self, attempts: u32) -> Self {
        self.max_attempts_per_request = attempts;
        self
    }

    #[must_use]
    pub fn max_reconciliation_attempts(mut self, attempts: u32) -> Self {
        self.max_reconciliation_attempts = attempts;
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_store_path() {
        let config = PipelineConfig::builder().store_path("./test.db").build().unwrap();
        assert!(config.store_path.is_absolute());
        assert_eq!(config.worker_count, DEFAULT_WORKER_COUNT);
    }

    #[test]
    fn cli_override_wins_over_builder_default() {
        let config = PipelineConfig::builder()
            .store_path("./test.db")
            .worker_count(4)
            .build()
            .unwrap();
        assert_eq!(config.worker_count, 4);
    }
}
