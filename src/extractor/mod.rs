//! Concurrent extractor — Stage 2 (C5, §4.5): fetch, parse, and persist
//! content for every leaf URL discovered in Stage 1.

pub mod progress;

pub use progress::{BatchProgress, NoopProgressReporter, ProgressReporter, TracingProgressReporter};

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::discovery::fetch_with_backoff;
use crate::error::{FailureType, PipelineResult};
use crate::parser;
use crate::scraper::Scraper;
use crate::store::{
    Checkpoint, CheckpointStatus, FailureRecord, ManifestEntry, RetryStatus, SectionUpdate, Stage,
    Store,
};
use crate::shutdown::ShutdownToken;
use crate::utils::constants::MAX_FAILURE_MESSAGE_CHARS;
use crate::utils::string_utils::safe_truncate_chars;

/// Outcome of processing a single leaf, before it is folded into the batch
/// write-back.
enum LeafOutcome {
    /// Single-version content extracted and ready to persist.
    Extracted { content: String, raw_html: String, legislative_history: Option<String> },
    /// Multi-version sentinel detected; Stage 3 will fill `versions`.
    FlaggedMultiVersion,
    Failure { failure_type: FailureType, message: String },
}

/// Run an extraction pass over `leaves`, honoring the checkpoint/resume
/// protocol in §4.5. `stage` selects which checkpoint/failure bucket this
/// pass writes to: `Stage::Stage2` for the normal Stage 2 run, or
/// `Stage::Reconciliation` when called from a reconciliation pass (§4.7)
/// restricted to leaves still missing content.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    scraper: Arc<dyn Scraper>,
    store: Arc<dyn Store>,
    code: &str,
    leaves: Vec<ManifestEntry>,
    stage: Stage,
    worker_count: u32,
    batch_size: u32,
    request_timeout_secs: u64,
    hang_timeout_secs: u64,
    max_attempts_per_request: u32,
    shutdown: &ShutdownToken,
    progress: &dyn ProgressReporter,
) -> PipelineResult<()> {
    if leaves.is_empty() {
        return Ok(());
    }

    let total_batches = leaves.len().div_ceil(batch_size.max(1) as usize).max(1) as u32;

    let mut checkpoint = match store.load_checkpoint(code, stage).await? {
        Some(cp) if cp.status != CheckpointStatus::Completed => cp,
        _ => Checkpoint::new(code, stage, total_batches, worker_count),
    };
    checkpoint.worker_count = worker_count;
    checkpoint.total_batches = total_batches;

    let start_batch = checkpoint.start_batch();
    info!(code, stage = stage.as_str(), start_batch, total_batches, "extractor: starting pass");

    for batch_index in start_batch..=total_batches {
        if shutdown.is_triggered() {
            checkpoint.status = CheckpointStatus::Paused;
            checkpoint.updated_at = Utc::now();
            store.save_checkpoint(checkpoint).await?;
            info!(code, stage = stage.as_str(), batch_index, "extractor: paused on shutdown signal");
            return Ok(());
        }

        let start = (batch_index as usize - 1) * batch_size.max(1) as usize;
        let end = (start + batch_size.max(1) as usize).min(leaves.len());
        let batch = &leaves[start..end];

        let started_at = Instant::now();
        let outcomes = run_batch(
            Arc::clone(&scraper),
            batch,
            worker_count,
            request_timeout_secs,
            hang_timeout_secs,
            max_attempts_per_request,
        )
        .await;

        let mut updates = Vec::new();
        let mut failures = Vec::new();
        let mut successes = 0u64;

        for (entry, outcome) in batch.iter().zip(outcomes) {
            match outcome {
                LeafOutcome::Extracted { content, raw_html, legislative_history } => {
                    successes += 1;
                    updates.push((
                        code.to_string(),
                        entry.section_id.clone(),
                        entry.url.clone(),
                        SectionUpdate {
                            content: Some(content),
                            raw_content: Some(raw_html),
                            legislative_history,
                            is_multi_version: Some(false),
                            ..Default::default()
                        },
                    ));
                }
                LeafOutcome::FlaggedMultiVersion => {
                    updates.push((
                        code.to_string(),
                        entry.section_id.clone(),
                        entry.url.clone(),
                        SectionUpdate { is_multi_version: Some(true), ..Default::default() },
                    ));
                }
                LeafOutcome::Failure { failure_type, message } => {
                    checkpoint.failed_section_ids.insert(entry.section_id.clone());
                    failures.push(FailureRecord {
                        code: code.to_string(),
                        section_id: entry.section_id.clone(),
                        attempt_number: 1,
                        url: entry.url.clone(),
                        failure_type,
                        error_message: message,
                        stage,
                        batch_number: Some(batch_index),
                        is_multi_version: false,
                        retry_status: RetryStatus::Pending,
                        retry_attempts: Vec::new(),
                        failed_at: Utc::now(),
                        resolved_at: None,
                    });
                }
            }
        }

        store.bulk_upsert_sections(updates).await?;
        for failure in failures {
            store.log_failure(failure).await?;
        }

        checkpoint.current_batch = batch_index;
        checkpoint.processed_count += batch.len() as u64;
        checkpoint.updated_at = Utc::now();
        store.save_checkpoint(checkpoint.clone()).await?;

        let elapsed = started_at.elapsed();
        progress.on_batch_complete(BatchProgress {
            batch: batch_index,
            total_batches,
            processed_count: checkpoint.processed_count,
            successes_this_batch: successes,
            batch_size: batch.len(),
            elapsed,
        });
    }

    checkpoint.status = CheckpointStatus::Completed;
    checkpoint.updated_at = Utc::now();
    store.save_checkpoint(checkpoint).await?;
    info!(code, stage = stage.as_str(), "extractor: pass complete");
    Ok(())
}

/// Fan a batch out across a bounded `crossbeam_channel` queue consumed by
/// `worker_count` tokio tasks, collecting results on an mpsc channel so the
/// batch boundary is a simple drain (§4.5 grounding).
async fn run_batch(
    scraper: Arc<dyn Scraper>,
    batch: &[ManifestEntry],
    worker_count: u32,
    request_timeout_secs: u64,
    hang_timeout_secs: u64,
    max_attempts_per_request: u32,
) -> Vec<LeafOutcome> {
    if batch.is_empty() {
        return Vec::new();
    }

    let (work_tx, work_rx) = crossbeam_channel::bounded(batch.len());
    for (idx, entry) in batch.iter().enumerate() {
        work_tx.send((idx, entry.clone())).expect("queue sized to batch length");
    }
    drop(work_tx);

    let (result_tx, mut result_rx) = tokio::sync::mpsc::unbounded_channel();
    let effective_workers = worker_count.max(1).min(batch.len() as u32);

    let mut handles = Vec::with_capacity(effective_workers as usize);
    for _ in 0..effective_workers {
        let rx = work_rx.clone();
        let result_tx = result_tx.clone();
        let scraper = Arc::clone(&scraper);

        handles.push(tokio::spawn(async move {
            while let Ok((idx, entry)) = rx.recv() {
                let outcome = process_leaf(
                    scraper.as_ref(),
                    &entry,
                    request_timeout_secs,
                    hang_timeout_secs,
                    max_attempts_per_request,
                )
                .await;
                if result_tx.send((idx, outcome)).is_err() {
                    break;
                }
            }
        }));
    }
    drop(result_tx);

    let mut slots: Vec<Option<LeafOutcome>> = (0..batch.len()).map(|_| None).collect();
    while let Some((idx, outcome)) = result_rx.recv().await {
        slots[idx] = Some(outcome);
    }
    for handle in handles {
        let _ = handle.await;
    }

    slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| LeafOutcome::Failure {
                failure_type: FailureType::NetworkError,
                message: "worker dropped before completing leaf".to_string(),
            })
        })
        .collect()
}

/// Fetch-retry-parse-classify one leaf, bounded by `hang_timeout_secs`
/// (§4.5: a fetch not finished within the hang timeout is cancelled and
/// recorded as `timeout`, the rest of the batch continues).
async fn process_leaf(
    scraper: &dyn Scraper,
    entry: &ManifestEntry,
    request_timeout_secs: u64,
    hang_timeout_secs: u64,
    max_attempts_per_request: u32,
) -> LeafOutcome {
    let work = fetch_and_classify(scraper, entry, request_timeout_secs, max_attempts_per_request);

    match tokio::time::timeout(Duration::from_secs(hang_timeout_secs), work).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(section_id = %entry.section_id, url = %entry.url, "stage2: leaf cancelled at hang timeout");
            LeafOutcome::Failure {
                failure_type: FailureType::Timeout,
                message: format!("exceeded hang timeout of {hang_timeout_secs}s"),
            }
        }
    }
}

async fn fetch_and_classify(
    scraper: &dyn Scraper,
    entry: &ManifestEntry,
    request_timeout_secs: u64,
    max_attempts_per_request: u32,
) -> LeafOutcome {
    let page = match fetch_with_backoff(scraper, &entry.url, max_attempts_per_request, request_timeout_secs).await {
        Ok(page) => page,
        Err(e) => {
            let message = safe_truncate_chars(&e.to_string(), MAX_FAILURE_MESSAGE_CHARS).to_string();
            return LeafOutcome::Failure { failure_type: FailureType::from_scrape_error(&e), message };
        }
    };

    let parsed = parser::parse(&page.url, &page.html);

    if parsed.is_multi_version {
        return LeafOutcome::FlaggedMultiVersion;
    }

    match parsed.content {
        Some(content) => LeafOutcome::Extracted {
            content,
            raw_html: page.html,
            legislative_history: parsed.legislative_history,
        },
        None if parsed.is_repealed => {
            debug!(section_id = %entry.section_id, "stage2: section marked repealed");
            LeafOutcome::Failure {
                failure_type: FailureType::Repealed,
                message: "section marked repealed".to_string(),
            }
        }
        None => {
            debug!(section_id = %entry.section_id, "stage2: parser returned empty content");
            LeafOutcome::Failure {
                failure_type: FailureType::EmptyContent,
                message: "parser returned no body content".to_string(),
            }
        }
    }
}
