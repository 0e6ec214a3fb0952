//! Content parser (C4, §4.4): a pure function from fetched HTML to section
//! text, legislative history, and a multi-version flag.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

/// Result of parsing one fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSection {
    pub content: Option<String>,
    pub legislative_history: Option<String>,
    pub is_multi_version: bool,
    pub is_repealed: bool,
}

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// Stats. citation, e.g. "(Amended by Stats. 2019, Ch. 497, Sec. 1.)" — the
// legislative action verb is required so plain cross-references to another
// Stats. chapter aren't mistaken for a history citation.
static LEGISLATIVE_HISTORY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\(\s*((?:Amended|Enacted|Added|Repealed|Amended and renumbered|Repealed and added)[^()]*?Stats\.[^()]*?)\)",
    )
    .unwrap()
});

const MULTI_VERSION_SENTINEL: &str = "selectfrommultiples";

// A section body that opens with "Repealed by/on ..." rather than substantive
// text — the section still has a live URL, but there is no content left to
// extract (§4.8: classified as `repealed`, not `empty_content`).
static REPEALED_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*[\d.]*\s*repealed\b").unwrap());

fn normalize_whitespace(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s.trim(), " ").into_owned()
}

/// Parse a fetched page (§4.4). `url` participates in the multi-version
/// sentinel check alongside the body.
#[must_use]
pub fn parse(url: &str, html: &str) -> ParsedSection {
    let is_multi_version = url.to_lowercase().contains(MULTI_VERSION_SENTINEL)
        || html.to_lowercase().contains(MULTI_VERSION_SENTINEL);

    let document = Html::parse_document(html);
    let body_text = extract_body_text(&document);

    if body_text.trim().is_empty() {
        return ParsedSection { content: None, legislative_history: None, is_multi_version, is_repealed: false };
    }

    let legislative_history = extract_legislative_history(&body_text);
    let content = normalize_whitespace(&body_text);

    if REPEALED_MARKER.is_match(&content) {
        return ParsedSection { content: None, legislative_history, is_multi_version, is_repealed: true };
    }

    ParsedSection {
        content: if content.is_empty() { None } else { Some(content) },
        legislative_history,
        is_multi_version,
        is_repealed: false,
    }
}

/// Extract body text, stripping script/style/nav chrome.
fn extract_body_text(document: &Html) -> String {
    let Ok(content_selector) = Selector::parse("#content, .content, main, article, body") else {
        return String::new();
    };
    let skip_selector = Selector::parse("script, style, nav, header, footer").ok();

    let Some(root) = document.select(&content_selector).next() else {
        return String::new();
    };

    let mut text = String::new();
    for node in root.text() {
        text.push_str(node);
        text.push(' ');
    }

    // `.text()` on scraper's ElementRef already skips non-text nodes
    // (script/style content is not exposed as Text nodes by html5ever), so
    // `skip_selector` only guards against inline noscript fallbacks.
    if let Some(sel) = skip_selector {
        for skip in root.select(&sel) {
            let skipped: String = skip.text().collect();
            if !skipped.is_empty() {
                text = text.replacen(&skipped, "", 1);
            }
        }
    }

    text
}

/// Find the LAST `Stats.` legislative-history citation in the body — pages
/// nest ancestor (division/chapter) histories above the section's own, so
/// taking the first match would pick up the wrong level (§4.4).
fn extract_legislative_history(body_text: &str) -> Option<String> {
    LEGISLATIVE_HISTORY
        .captures_iter(body_text)
        .last()
        .map(|caps| normalize_whitespace(&format!("({})", &caps[1])))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_page_yields_no_content() {
        let parsed = parse("https://example.com/100", "<html><body>   </body></html>");
        assert!(parsed.content.is_none());
        assert!(parsed.legislative_history.is_none());
    }

    #[test]
    fn multi_version_sentinel_detected_case_insensitively_in_url() {
        let parsed = parse(
            "https://example.com/selectFromMultiples?section=100",
            "<html><body>text</body></html>",
        );
        assert!(parsed.is_multi_version);
    }

    #[test]
    fn last_stats_citation_wins_over_ancestor_history() {
        let html = r#"<html><body><div id="content">
            Division history (Amended by Stats. 1990, Ch. 1, Sec. 1.)
            Section text follows.
            (Amended by Stats. 2020, Ch. 5, Sec. 2.)
        </div></body></html>"#;
        let parsed = parse("https://example.com/100", html);
        let history = parsed.legislative_history.expect("history present");
        assert!(history.contains("2020"), "expected last citation, got: {history}");
    }

    #[test]
    fn whitespace_is_normalized() {
        let html = "<html><body><div id=\"content\">Line one\n\n\n   Line   two</div></body></html>";
        let parsed = parse("https://example.com/100", html);
        assert_eq!(parsed.content.as_deref(), Some("Line one Line two"));
    }

    #[test]
    fn repealed_marker_detected_as_failure_not_empty_content() {
        let html = r#"<html><body><div id="content">
            100. Repealed by Stats. 2015, Ch. 1, Sec. 2.
        </div></body></html>"#;
        let parsed = parse("https://example.com/100", html);
        assert!(parsed.content.is_none());
        assert!(parsed.is_repealed);
        assert!(!parsed.is_multi_version);
    }

    #[test]
    fn substantive_content_is_not_flagged_repealed() {
        let parsed = parse("https://example.com/100", "<html><body><div id=\"content\">Every person has rights.</div></body></html>");
        assert!(!parsed.is_repealed);
        assert!(parsed.content.is_some());
    }
}
