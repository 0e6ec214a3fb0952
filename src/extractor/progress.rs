//! Batch-lifecycle progress reporting (§4.5), a direct generalization of
//! the teacher's page-lifecycle `crawl_engine::progress::ProgressReporter`.

use std::time::Duration;

/// A snapshot emitted after each completed batch.
#[derive(Debug, Clone, Copy)]
pub struct BatchProgress {
    pub batch: u32,
    pub total_batches: u32,
    pub processed_count: u64,
    pub successes_this_batch: u64,
    pub batch_size: usize,
    pub elapsed: Duration,
}

impl BatchProgress {
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.batch_size == 0 {
            1.0
        } else {
            self.successes_this_batch as f64 / self.batch_size as f64
        }
    }

    #[must_use]
    pub fn instantaneous_rate_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 { 0.0 } else { self.successes_this_batch as f64 / secs }
    }

    #[must_use]
    pub fn eta(&self) -> Option<Duration> {
        let rate = self.instantaneous_rate_per_sec();
        if rate <= 0.0 {
            return None;
        }
        let remaining_batches = self.total_batches.saturating_sub(self.batch) as f64;
        Some(Duration::from_secs_f64(remaining_batches * self.batch_size as f64 / rate))
    }
}

/// Observer interface for Stage 2 progress (§4.5).
pub trait ProgressReporter: Send + Sync {
    fn on_batch_complete(&self, progress: BatchProgress);
}

/// Discards progress events. Used by tests and by callers that only care
/// about the final `PipelineReport`.
pub struct NoopProgressReporter;

impl ProgressReporter for NoopProgressReporter {
    fn on_batch_complete(&self, _progress: BatchProgress) {}
}

/// Logs each batch via `tracing`, the default reporter for `process_code`.
pub struct TracingProgressReporter {
    pub code: String,
}

impl ProgressReporter for TracingProgressReporter {
    fn on_batch_complete(&self, progress: BatchProgress) {
        tracing::info!(
            code = %self.code,
            batch = progress.batch,
            total_batches = progress.total_batches,
            processed = progress.processed_count,
            success_rate = %format!("{:.1}%", progress.success_rate() * 100.0),
            rate_per_sec = %format!("{:.2}", progress.instantaneous_rate_per_sec()),
            eta_secs = progress.eta().map(|d| d.as_secs()),
            "stage2 batch complete",
        );
    }
}
