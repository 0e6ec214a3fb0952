//! Pipeline controller (C9, §4.9): sequences Stage 1, Stage 2, Stage 3,
//! reconciliation, and (unless disabled) a single failure-log retry pass.

mod report;

pub use report::PipelineReport;

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::config::PipelineConfig;
use crate::discovery;
use crate::error::PipelineResult;
use crate::extractor::{self, TracingProgressReporter};
use crate::failures;
use crate::multiversion;
use crate::reconcile;
use crate::scraper::Scraper;
use crate::store::{FailureFilter, Stage, Store};

pub use crate::shutdown::ShutdownToken;

/// Options that vary per invocation of `process_code`, layered on top of
/// `PipelineConfig` (§6 CLI surface).
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub code: String,
    pub index_url: String,
    pub resume: bool,
    pub skip_retry: bool,
    pub max_retry_override: Option<u32>,
}

/// Sequences all stages for one code (C9).
pub struct PipelineController {
    scraper: Arc<dyn Scraper>,
    rendered_scraper: Arc<dyn Scraper>,
    store: Arc<dyn Store>,
    config: PipelineConfig,
    shutdown: ShutdownToken,
}

impl PipelineController {
    #[must_use]
    pub fn new(
        scraper: Arc<dyn Scraper>,
        rendered_scraper: Arc<dyn Scraper>,
        store: Arc<dyn Store>,
        config: PipelineConfig,
    ) -> Self {
        Self { scraper, rendered_scraper, store, config, shutdown: ShutdownToken::new() }
    }

    #[must_use]
    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    /// Run the full pipeline for one code and produce a final report.
    pub async fn run(&self, options: RunOptions) -> PipelineResult<PipelineReport> {
        let started_at = Instant::now();
        let code = options.code.as_str();
        info!(code, resume = options.resume, "pipeline: starting run");

        let stage1_start = Instant::now();
        if !options.resume || self.store.get_code_architecture(code).await?.is_none() {
            let result = discovery::discover(
                self.scraper.as_ref(),
                code,
                &options.index_url,
                self.config.max_attempts_per_request(),
                self.config.request_timeout_secs(),
            )
            .await
            .map_err(crate::error::PipelineError::Other)?;

            if !result.failed_text_pages.is_empty() {
                tracing::warn!(code, count = result.failed_text_pages.len(), "stage1: some text pages never succeeded");
            }

            discovery::persist(self.store.as_ref(), code, &uuid::Uuid::new_v4().to_string(), &result).await?;
        } else {
            info!(code, "stage1: skipped, resuming with existing architecture");
        }
        let stage1_duration = stage1_start.elapsed();

        if self.shutdown.is_triggered() {
            return self.interrupted_report(code, started_at, stage1_duration).await;
        }

        let stage2_start = Instant::now();
        let architecture = self
            .store
            .get_code_architecture(code)
            .await?
            .ok_or_else(|| crate::error::PipelineError::Config(format!("no architecture for {code}")))?;

        extractor::run(
            Arc::clone(&self.scraper),
            Arc::clone(&self.store),
            code,
            architecture.url_manifest,
            Stage::Stage2,
            self.config.worker_count(),
            self.config.batch_size(),
            self.config.request_timeout_secs(),
            self.config.hang_timeout_secs(),
            self.config.max_attempts_per_request(),
            &self.shutdown,
            &TracingProgressReporter { code: code.to_string() },
        )
        .await?;
        let stage2_duration = stage2_start.elapsed();

        if self.shutdown.is_triggered() {
            return self.interrupted_report(code, started_at, stage1_duration + stage2_duration).await;
        }

        let stage3_start = Instant::now();
        multiversion::run(
            Arc::clone(&self.rendered_scraper),
            Arc::clone(&self.store),
            code,
            crate::utils::constants::MULTI_VERSION_FETCH_TIMEOUT_SECS,
            &self.shutdown,
        )
        .await?;
        let stage3_duration = stage3_start.elapsed();

        let reconciliation_start = Instant::now();
        let max_reconciliation_attempts =
            options.max_retry_override.unwrap_or_else(|| self.config.max_reconciliation_attempts());
        let remaining_after_reconciliation = reconcile::run(
            Arc::clone(&self.scraper),
            Arc::clone(&self.rendered_scraper),
            Arc::clone(&self.store),
            code,
            self.config.worker_count(),
            self.config.batch_size(),
            self.config.request_timeout_secs(),
            self.config.hang_timeout_secs(),
            self.config.max_attempts_per_request(),
            max_reconciliation_attempts,
            crate::utils::constants::MULTI_VERSION_FETCH_TIMEOUT_SECS,
            &self.shutdown,
        )
        .await?;
        let reconciliation_duration = reconciliation_start.elapsed();

        if !options.skip_retry {
            let (succeeded, total) = failures::retry_all(
                self.scraper.as_ref(),
                Arc::clone(&self.store),
                code,
                FailureFilter::default(),
                self.config.max_attempts_per_request(),
            )
            .await?;
            info!(code, succeeded, total, "pipeline: failure-log retry pass complete");
        }

        let all_sections = self.store.all_sections(code).await?;
        let total_sections = all_sections.len() as u64;
        let completed = all_sections.iter().filter(|s| !s.is_missing()).count() as u64;

        let failures_list = self.store.list_failures(code, FailureFilter::default()).await?;
        let breakdown = failures::breakdown(&failures_list);

        let report = PipelineReport {
            code: code.to_string(),
            total_sections,
            completed_sections: completed,
            remaining_after_reconciliation,
            completion_rate: if total_sections == 0 { 1.0 } else { completed as f64 / total_sections as f64 },
            stage1_duration,
            stage2_duration,
            stage3_duration,
            reconciliation_duration,
            total_duration: started_at.elapsed(),
            failure_breakdown: breakdown,
            interrupted: false,
        };

        info!(
            code,
            completion_rate = %format!("{:.2}%", report.completion_rate * 100.0),
            exit_code = report.exit_code(),
            "pipeline: run complete"
        );

        Ok(report)
    }

    async fn interrupted_report(
        &self,
        code: &str,
        started_at: Instant,
        elapsed_before_interrupt: std::time::Duration,
    ) -> PipelineResult<PipelineReport> {
        let all_sections = self.store.all_sections(code).await?;
        let total_sections = all_sections.len() as u64;
        let completed = all_sections.iter().filter(|s| !s.is_missing()).count() as u64;
        let failures_list = self.store.list_failures(code, FailureFilter::default()).await?;

        info!(code, "pipeline: run interrupted by shutdown signal");

        Ok(PipelineReport {
            code: code.to_string(),
            total_sections,
            completed_sections: completed,
            remaining_after_reconciliation: total_sections - completed,
            completion_rate: if total_sections == 0 { 0.0 } else { completed as f64 / total_sections as f64 },
            stage1_duration: elapsed_before_interrupt,
            stage2_duration: std::time::Duration::ZERO,
            stage3_duration: std::time::Duration::ZERO,
            reconciliation_duration: std::time::Duration::ZERO,
            total_duration: started_at.elapsed(),
            failure_breakdown: failures::breakdown(&failures_list),
            interrupted: true,
        })
    }
}
