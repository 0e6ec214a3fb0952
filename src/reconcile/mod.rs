//! Reconciliation (C7, §4.7): after Stages 2 and 3, retry leaves still
//! missing content with reduced concurrency.

use std::sync::Arc;

use tracing::info;

use crate::error::PipelineResult;
use crate::extractor::{self, NoopProgressReporter};
use crate::multiversion;
use crate::scraper::Scraper;
use crate::shutdown::ShutdownToken;
use crate::store::{ManifestEntry, Stage, Store};

/// Run up to `max_attempts` additional extraction passes restricted to
/// leaves still missing content, halving `worker_count` (floor 1) each
/// pass (§4.7 rationale: reduced fan-out drains a transient-overload tail).
pub async fn run(
    scraper: Arc<dyn Scraper>,
    rendered_scraper: Arc<dyn Scraper>,
    store: Arc<dyn Store>,
    code: &str,
    initial_worker_count: u32,
    batch_size: u32,
    request_timeout_secs: u64,
    hang_timeout_secs: u64,
    max_attempts_per_request: u32,
    max_attempts: u32,
    multi_version_timeout_secs: u64,
    shutdown: &ShutdownToken,
) -> PipelineResult<u64> {
    let mut worker_count = initial_worker_count;

    for attempt in 1..=max_attempts {
        if shutdown.is_triggered() {
            break;
        }

        let missing = missing_sections(store.as_ref(), code).await?;
        if missing.is_empty() {
            info!(code, "reconciliation: no missing sections, nothing to do");
            return Ok(0);
        }

        worker_count = (worker_count / 2).max(1);
        info!(code, attempt, remaining = missing.len(), worker_count, "reconciliation: pass starting");

        let single_version_missing: Vec<ManifestEntry> =
            missing.iter().filter(|s| !s.is_multi_version).map(manifest_entry).collect();

        extractor::run(
            Arc::clone(&scraper),
            Arc::clone(&store),
            code,
            single_version_missing,
            Stage::Reconciliation,
            worker_count,
            batch_size,
            request_timeout_secs,
            hang_timeout_secs,
            max_attempts_per_request,
            shutdown,
            &NoopProgressReporter,
        )
        .await?;

        multiversion::run(Arc::clone(&rendered_scraper), Arc::clone(&store), code, multi_version_timeout_secs, shutdown)
            .await?;
    }

    let still_missing = missing_sections(store.as_ref(), code).await?;
    info!(code, remaining = still_missing.len(), "reconciliation: exhausted attempts");
    Ok(still_missing.len() as u64)
}

async fn missing_sections(store: &dyn Store, code: &str) -> PipelineResult<Vec<crate::store::Section>> {
    let sections = store.all_sections(code).await?;
    Ok(sections.into_iter().filter(crate::store::Section::is_missing).collect())
}

fn manifest_entry(section: &crate::store::Section) -> ManifestEntry {
    ManifestEntry {
        section_id: section.section_id.clone(),
        url: section.url.clone(),
        hierarchy: section.hierarchy.clone(),
    }
}
