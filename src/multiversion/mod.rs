//! Multi-version handler — Stage 3 (C6, §4.6): for sections flagged by
//! Stage 2, render the selector page, click through each offered version in
//! a fresh browser context, and persist the ordered `Version` list.

mod version_label;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use scraper::{Html, Selector};
use tracing::{info, warn};

use crate::error::{FailureType, PipelineResult};
use crate::parser;
use crate::scraper::{InteractiveAction, Scraper};
use crate::shutdown::ShutdownToken;
use crate::store::{FailureRecord, RetryStatus, SectionUpdate, Stage, Store, Version};

use version_label::classify_version_label;

/// Run Stage 3 over every multi-version leaf still missing `versions`
/// (§9 decision: an empty `versions` array is treated as missing, never as
/// "intentionally empty").
pub async fn run(
    scraper: Arc<dyn Scraper>,
    store: Arc<dyn Store>,
    code: &str,
    per_section_timeout_secs: u64,
    shutdown: &ShutdownToken,
) -> PipelineResult<()> {
    let candidates: Vec<_> = store
        .iter_multi_version_sections(code)
        .await?
        .into_iter()
        .filter(|s| s.versions.is_empty())
        .collect();

    info!(code, count = candidates.len(), "stage3: multi-version sections to resolve");

    for section in candidates {
        if shutdown.is_triggered() {
            info!(code, "stage3: stopping on shutdown signal");
            break;
        }

        let outcome = tokio::time::timeout(
            Duration::from_secs(per_section_timeout_secs),
            extract_versions(scraper.as_ref(), &section.url, per_section_timeout_secs),
        )
        .await;

        let failure_message = match outcome {
            Ok(Ok(versions)) if !versions.is_empty() => {
                store
                    .upsert_section(
                        code,
                        &section.section_id,
                        &section.url,
                        SectionUpdate { versions: Some(versions), is_multi_version: Some(true), ..Default::default() },
                    )
                    .await?;
                None
            }
            Ok(Ok(_)) => Some("selector page yielded no version links".to_string()),
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(format!("exceeded per-section timeout of {per_section_timeout_secs}s")),
        };

        if let Some(message) = failure_message {
            warn!(code, section_id = %section.section_id, %message, "stage3: failed to resolve versions");
            store
                .log_failure(FailureRecord {
                    code: code.to_string(),
                    section_id: section.section_id.clone(),
                    attempt_number: 1,
                    url: section.url.clone(),
                    failure_type: FailureType::multi_version_timeout(),
                    error_message: message,
                    stage: Stage::Stage3,
                    batch_number: None,
                    is_multi_version: true,
                    retry_status: RetryStatus::Pending,
                    retry_attempts: Vec::new(),
                    failed_at: Utc::now(),
                    resolved_at: None,
                })
                .await?;
        }
    }

    Ok(())
}

/// One candidate version link scraped from the rendered selector page: its
/// visible label. Presence of an `onclick` handler is what identifies it as
/// a version link in the first place (§4.6); the handler's contents are not
/// otherwise needed since the click itself is replayed against the live
/// rendered DOM, not simulated from the attribute string.
struct VersionLink {
    label: String,
}

async fn extract_versions(scraper: &dyn Scraper, selector_url: &str, timeout_secs: u64) -> anyhow::Result<Vec<Version>> {
    let links = scan_selector_page(scraper, selector_url, timeout_secs).await?;
    let mut versions = Vec::with_capacity(links.len());

    for (index, link) in links.iter().enumerate() {
        match click_through_version(scraper, selector_url, index, link, timeout_secs).await {
            Ok(version) => versions.push(version),
            Err(e) => warn!(selector_url, index, error = %e, "stage3: version click-through failed"),
        }
    }

    Ok(versions)
}

/// Render the selector page once and list its version links, in the page's
/// native order.
async fn scan_selector_page(scraper: &dyn Scraper, selector_url: &str, timeout_secs: u64) -> anyhow::Result<Vec<VersionLink>> {
    let page = scraper.fetch(selector_url, timeout_secs).await?;
    Ok(parse_version_links(&page.html))
}

fn parse_version_links(html: &str) -> Vec<VersionLink> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[onclick]") else { return Vec::new() };

    document
        .select(&selector)
        .filter_map(|el| {
            el.value().attr("onclick")?;
            let label: String = el.text().collect::<String>().trim().to_string();
            if label.is_empty() { None } else { Some(VersionLink { label }) }
        })
        .collect()
}

/// Replay the selector page through a fresh interactive fetch, click the
/// `index`-th version link, and extract its content. Each version drives a
/// fresh browser instance (via `Scraper::fetch_interactive`) so that clicking
/// one version's link can never leak session state into another (§4.6:
/// "fresh context per version avoids session-state bleed").
async fn click_through_version(
    scraper: &dyn Scraper,
    selector_url: &str,
    index: usize,
    link: &VersionLink,
    timeout_secs: u64,
) -> anyhow::Result<Version> {
    let actions = [InteractiveAction::ClickNth { selector: "a[onclick]".to_string(), index }];
    let page = scraper.fetch_interactive(selector_url, &actions, timeout_secs).await?;

    let parsed = parser::parse(&page.url, &page.html);
    let status = classify_version_label(&link.label, index);

    Ok(Version {
        operative_date: extract_operative_date(&link.label),
        content: parsed.content,
        legislative_history: parsed.legislative_history,
        status,
        source_url: page.url,
    })
}

fn extract_operative_date(label: &str) -> Option<String> {
    use once_cell::sync::Lazy;
    use regex::Regex;

    static DATE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)(January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},\s+\d{4}")
            .unwrap()
    });

    DATE.find(label).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_links_from_rendered_html() {
        let html = r#"
            <html><body>
            <a onclick="selectVersion('a')">Current law, operative January 1, 2020</a>
            <a onclick="selectVersion('b')">As it will read on January 1, 2025</a>
            </body></html>
        "#;
        let links = parse_version_links(html);
        assert_eq!(links.len(), 2);
        assert!(links[0].label.contains("Current"));
    }

    #[test]
    fn extracts_operative_date_when_present() {
        assert_eq!(
            extract_operative_date("As it will read on January 1, 2025"),
            Some("January 1, 2025".to_string())
        );
        assert_eq!(extract_operative_date("No date here"), None);
    }
}
