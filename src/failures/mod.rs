//! Failure log + retry service (C8, §4.8). Classification itself lives on
//! `FailureType` (error.rs); this module is the retry/abandon service that
//! operates on logged `FailureRecord`s.

use std::sync::Arc;

use chrono::Utc;

use crate::error::PipelineResult;
use crate::scraper::Scraper;
use crate::store::{FailureFilter, FailureRecord, RetryStatus, Store};

/// Retry a single logged failure, honoring `FailureType`'s retry-eligibility
/// classification (§4.8, §7): a failure that has exhausted its class's
/// attempt ladder, or whose class is not retriable at all (e.g. `Repealed`),
/// is abandoned without ever touching the network.
///
/// Succeeds iff the section subsequently satisfies `has_content ∨ versions ≠
/// ∅` (§4.8).
pub async fn retry(
    scraper: &dyn Scraper,
    store: &dyn Store,
    code: &str,
    failure: &FailureRecord,
    default_max_attempts: u32,
) -> PipelineResult<bool> {
    let section_id = failure.section_id.as_str();
    let attempt_number = failure.attempt_number;

    if !failure.failure_type.is_retriable() || attempt_number >= failure.failure_type.max_attempts(default_max_attempts) {
        store.update_retry_status(code, section_id, attempt_number, RetryStatus::Abandoned, false).await?;
        return Ok(false);
    }

    let Some(section) = store.get_section(code, section_id).await? else {
        return Ok(false);
    };

    let page = match scraper.fetch(&section.url, 60).await {
        Ok(page) => page,
        Err(e) => {
            store
                .update_retry_status(code, section_id, attempt_number, RetryStatus::Failed, false)
                .await?;
            return Err(e.into());
        }
    };

    let parsed = crate::parser::parse(&page.url, &page.html);
    let succeeded = parsed.content.is_some() || parsed.is_multi_version;

    if succeeded {
        store
            .upsert_section(
                code,
                section_id,
                &section.url,
                crate::store::SectionUpdate {
                    content: parsed.content,
                    raw_content: Some(page.html),
                    legislative_history: parsed.legislative_history,
                    is_multi_version: Some(parsed.is_multi_version),
                    ..Default::default()
                },
            )
            .await?;
    }

    store
        .update_retry_status(
            code,
            section_id,
            attempt_number,
            if succeeded { RetryStatus::Succeeded } else { RetryStatus::Failed },
            succeeded,
        )
        .await?;

    Ok(succeeded)
}

/// Retry every failure matching `filter` that is still unresolved (`Pending`
/// or `Retrying`); failures already `Succeeded`, `Failed`, or `Abandoned`
/// are left alone rather than re-fetched. Returns `(succeeded, total)`.
pub async fn retry_all(
    scraper: &dyn Scraper,
    store: Arc<dyn Store>,
    code: &str,
    filter: FailureFilter,
    default_max_attempts: u32,
) -> PipelineResult<(usize, usize)> {
    let failures: Vec<_> = store
        .list_failures(code, filter)
        .await?
        .into_iter()
        .filter(|f| matches!(f.retry_status, RetryStatus::Pending | RetryStatus::Retrying))
        .collect();
    let total = failures.len();
    let mut succeeded = 0;

    for failure in &failures {
        if retry(scraper, store.as_ref(), code, failure, default_max_attempts).await? {
            succeeded += 1;
        }
    }

    Ok((succeeded, total))
}

/// Explicitly stop retrying a leaf (e.g. confirmed repealed).
pub async fn abandon(store: &dyn Store, code: &str, section_id: &str, reason: &str) -> PipelineResult<()> {
    let failures = store
        .list_failures(code, FailureFilter::default())
        .await?
        .into_iter()
        .filter(|f| f.section_id == section_id)
        .collect::<Vec<_>>();

    let attempt_number = failures.iter().map(|f| f.attempt_number).max().unwrap_or(0);
    store
        .update_retry_status(code, section_id, attempt_number, RetryStatus::Abandoned, false)
        .await?;
    tracing::info!(code, section_id, reason, "failure abandoned");
    Ok(())
}

/// Build the failure-breakdown portion of the final `PipelineReport`
/// (§4.9): counts grouped by `failure_type` and by `stage`.
#[must_use]
pub fn breakdown(failures: &[FailureRecord]) -> FailureBreakdown {
    let mut by_type = std::collections::BTreeMap::new();
    let mut by_stage = std::collections::BTreeMap::new();

    for failure in failures {
        *by_type.entry(failure.failure_type.as_str()).or_insert(0u64) += 1;
        *by_stage.entry(failure.stage.as_str()).or_insert(0u64) += 1;
    }

    FailureBreakdown { by_type, by_stage, total: failures.len() as u64, generated_at: Utc::now() }
}

#[derive(Debug, Clone)]
pub struct FailureBreakdown {
    pub by_type: std::collections::BTreeMap<&'static str, u64>,
    pub by_stage: std::collections::BTreeMap<&'static str, u64>,
    pub total: u64,
    pub generated_at: chrono::DateTime<Utc>,
}
