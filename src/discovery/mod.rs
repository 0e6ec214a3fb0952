//! Tree discovery — Stage 1 (C3, §4.3): crawl a code's index and text
//! pages, building the hierarchical tree and flat URL manifest.

pub mod node_type;
pub mod retry;

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::scraper::Scraper;
use crate::store::{HierarchyTags, ManifestEntry, NodeType, Statistics, Store, TreeNode};

pub use node_type::classify_heading;
pub use retry::fetch_with_backoff;

static SECTION_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)?[a-z]?$").unwrap());
static LOOKS_LIKE_SECTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[a-z0-9.]*$").unwrap());

/// Outcome of a Stage 1 run, ready to persist.
pub struct DiscoveryResult {
    pub tree: TreeNode,
    pub url_manifest: Vec<ManifestEntry>,
    pub statistics: Statistics,
    pub failed_text_pages: Vec<String>,
}

/// One heading encountered while walking a text page, before classification.
#[derive(Debug, Clone)]
struct Heading {
    text: String,
    depth: usize,
}

/// Run Stage 1 discovery for `code`, starting from `index_url`.
///
/// The index page yields the set of "text page" URLs; each is fetched (with
/// exponential-backoff retry) and walked for section headings. A fetch that
/// still fails after retries is recorded in `failed_text_pages` rather than
/// aborting the stage (§4.3 failure semantics) — those leaves surface later
/// via reconciliation (C7).
pub async fn discover(
    scraper: &dyn Scraper,
    code: &str,
    index_url: &str,
    max_attempts: u32,
    request_timeout_secs: u64,
) -> anyhow::Result<DiscoveryResult> {
    info!(code, index_url, "stage1: fetching code index");
    let index_page = fetch_with_backoff(scraper, index_url, max_attempts, request_timeout_secs).await?;
    let text_page_urls = extract_text_page_urls(&index_page.html, index_url);
    debug!(code, count = text_page_urls.len(), "stage1: discovered text pages");

    let mut root = TreeNode::new(NodeType::Code, None, code.to_string());
    let mut url_manifest = Vec::new();
    let mut failed_text_pages = Vec::new();

    for text_url in &text_page_urls {
        match fetch_with_backoff(scraper, text_url, max_attempts, request_timeout_secs).await {
            Ok(page) => {
                let headings = extract_headings(&page.html);
                build_subtree(&mut root, &headings, &mut url_manifest, text_url);
            }
            Err(e) => {
                warn!(code, text_url, error = %e, "stage1: text page failed after retries");
                failed_text_pages.push(text_url.clone());
            }
        }
    }

    let statistics = compute_statistics(&root, url_manifest.len());

    Ok(DiscoveryResult { tree: root, url_manifest, statistics, failed_text_pages })
}

/// Persist discovery output: the architecture document and a pending
/// `Section` row per manifest leaf (§4.3 step 4).
pub async fn persist(
    store: &dyn Store,
    code: &str,
    session_id: &str,
    result: &DiscoveryResult,
) -> crate::error::PipelineResult<()> {
    use crate::store::{CodeArchitecture, SectionUpdate, StageFlags};
    use chrono::Utc;

    let architecture = CodeArchitecture {
        code: code.to_string(),
        tree: result.tree.clone(),
        url_manifest: result.url_manifest.clone(),
        statistics: result.statistics,
        multi_version_sections: Default::default(),
        stage_flags: StageFlags { stage1_done: Some(Utc::now()), ..Default::default() },
        session_id: session_id.to_string(),
        created_at: Utc::now(),
    };
    store.put_code_architecture(architecture).await?;

    let records = result
        .url_manifest
        .iter()
        .map(|entry| {
            (
                code.to_string(),
                entry.section_id.clone(),
                entry.url.clone(),
                SectionUpdate { hierarchy: Some(entry.hierarchy.clone()), ..Default::default() },
            )
        })
        .collect();
    store.bulk_upsert_sections(records).await
}

fn extract_text_page_urls(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else { return Vec::new() };
    let base = url::Url::parse(base_url).ok();

    let mut urls = Vec::new();
    for el in document.select(&selector) {
        let Some(href) = el.value().attr("href") else { continue };
        let resolved = base
            .as_ref()
            .and_then(|b| b.join(href).ok())
            .map(|u| u.to_string())
            .unwrap_or_else(|| href.to_string());
        if crate::utils::is_valid_url(&resolved) && resolved.contains("displayText") {
            urls.push(resolved);
        }
    }
    urls
}

/// Walk a text page's headings into `root`, appending discovered leaves to
/// `url_manifest` in discovery order.
fn extract_headings(html: &str) -> Vec<Heading> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("h1, h2, h3, h4, h5, h6") else { return Vec::new() };

    document
        .select(&selector)
        .filter_map(|el| {
            let depth = el.value().name().chars().last()?.to_digit(10)? as usize;
            let text: String = el.text().collect::<String>().trim().to_string();
            if text.is_empty() { None } else { Some(Heading { text, depth }) }
        })
        .collect()
}

/// One ancestor container on the active heading chain: its depth (so a
/// shallower heading knows how far to pop back out), its place in the tree
/// (`node_type`/`title`, used to walk/insert into `TreeNode.children`), and
/// the `HierarchyTags` accumulated up to and including it.
struct ChainLink {
    depth: usize,
    node_type: NodeType,
    title: String,
    tags: HierarchyTags,
}

fn chain_path(chain: &[ChainLink]) -> Vec<(NodeType, String)> {
    chain.iter().map(|link| (link.node_type, link.title.clone())).collect()
}

fn build_subtree(
    root: &mut TreeNode,
    headings: &[Heading],
    url_manifest: &mut Vec<ManifestEntry>,
    text_url: &str,
) {
    // Active chain of ancestor container nodes by depth, rebuilt per text
    // page. Each heading either starts a new container node nested under
    // the current chain, or, if it parses as a section identifier, becomes
    // a leaf attached under the chain's deepest container (§4.3 step 3).
    let mut chain: Vec<ChainLink> = Vec::new();

    for heading in headings {
        if let Some(section_id) = section_identifier(&heading.text) {
            let hierarchy = chain.last().map(|link| link.tags.clone()).unwrap_or_default();
            let path = chain_path(&chain);
            attach_leaf(root, &path, &section_id, &heading.text);
            url_manifest.push(ManifestEntry {
                section_id,
                url: text_url.to_string(),
                hierarchy,
            });
            continue;
        }

        let Some(node_type) = classify_heading(&heading.text) else {
            debug!(heading = %heading.text, "stage1: unclassified heading, skipping");
            continue;
        };

        while chain.last().is_some_and(|link| link.depth >= heading.depth) {
            chain.pop();
        }
        let mut tags = chain.last().map(|link| link.tags.clone()).unwrap_or_default();
        set_tag(&mut tags, node_type, &heading.text);

        let path = chain_path(&chain);
        attach_container(root, &path, node_type, &heading.text);
        chain.push(ChainLink { depth: heading.depth, node_type, title: heading.text.clone(), tags });
    }
}

fn section_identifier(text: &str) -> Option<String> {
    let candidate = text.split_whitespace().next()?;
    if SECTION_ID.is_match(candidate) {
        return Some(candidate.to_string());
    }
    if LOOKS_LIKE_SECTION.is_match(candidate) {
        debug!(candidate, "stage1: looks like a section id but failed the strict grammar");
    }
    None
}

fn set_tag(tags: &mut HierarchyTags, node_type: NodeType, text: &str) {
    let value = Some(text.to_string());
    match node_type {
        NodeType::Division => tags.division = value,
        NodeType::Part => tags.part = value,
        NodeType::Title => tags.title = value,
        NodeType::Chapter => tags.chapter = value,
        NodeType::Article => tags.article = value,
        NodeType::Code => {}
    }
}

/// Insert (or reuse) a container node nested under the tree node addressed
/// by `path` — a DIVISION's children actually nest under it, a PART's under
/// that DIVISION, and so on (§4.3 step 3), rather than every container
/// landing flat under `root`.
fn attach_container(root: &mut TreeNode, path: &[(NodeType, String)], node_type: NodeType, text: &str) {
    let parent = navigate_to(root, path);
    if !parent.children.iter().any(|c| c.node_type == node_type && c.title == text) {
        parent.children.push(TreeNode::new(node_type, None, text));
    }
}

fn attach_leaf(root: &mut TreeNode, path: &[(NodeType, String)], section_id: &str, title: &str) {
    let parent = navigate_to(root, path);
    if !parent.children.iter().any(|c| c.number.as_deref() == Some(section_id)) {
        parent.children.push(TreeNode::new(NodeType::Article, Some(section_id.to_string()), title));
    }
}

/// Walk `path` from `root`, creating any container segment not already
/// present, and return the deepest node reached.
fn navigate_to<'a>(root: &'a mut TreeNode, path: &[(NodeType, String)]) -> &'a mut TreeNode {
    let mut node = root;
    for (node_type, title) in path {
        let idx = match node.children.iter().position(|c| c.node_type == *node_type && &c.title == title) {
            Some(i) => i,
            None => {
                node.children.push(TreeNode::new(*node_type, None, title.clone()));
                node.children.len() - 1
            }
        };
        node = &mut node.children[idx];
    }
    node
}

/// Compute tree statistics, parallelizing over root-level sibling subtrees
/// when the tree is wide (§4.3 grounding: rayon over sibling subtrees).
fn compute_statistics(root: &TreeNode, total_sections: usize) -> Statistics {
    let max_depth = if root.children.len() > 4 {
        root.children.par_iter().map(TreeNode::max_depth).max().map_or(0, |d| d + 1)
    } else {
        root.max_depth()
    };

    Statistics { total_nodes: root.total_nodes(), max_depth, total_sections }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_identifier_accepts_spec_grammar() {
        assert_eq!(section_identifier("1 . Definitions"), Some("1".to_string()));
        assert_eq!(section_identifier("3044."), None); // trailing dot without text after
        assert_eq!(section_identifier("17404.1 Applicability"), Some("17404.1".to_string()));
        assert_eq!(section_identifier("73d Repealed"), Some("73d".to_string()));
    }

    #[test]
    fn section_identifier_rejects_non_section_text() {
        assert_eq!(section_identifier("PART 1 GENERAL PROVISIONS"), None);
    }

    #[test]
    fn build_subtree_nests_containers_by_heading_depth() {
        let mut root = TreeNode::new(NodeType::Code, None, "WIC");
        let headings = vec![
            Heading { text: "DIVISION 1. General Provisions".to_string(), depth: 2 },
            Heading { text: "PART 1. Civil Rights".to_string(), depth: 3 },
            Heading { text: "ARTICLE 1. Definitions".to_string(), depth: 4 },
            Heading { text: "100. Every person has rights.".to_string(), depth: 5 },
        ];
        let mut manifest = Vec::new();

        build_subtree(&mut root, &headings, &mut manifest, "https://example.com/text1");

        assert_eq!(root.children.len(), 1, "only the DIVISION should hang off root");
        let division = &root.children[0];
        assert_eq!(division.node_type, NodeType::Division);

        assert_eq!(division.children.len(), 1, "PART should nest under DIVISION, not root");
        let part = &division.children[0];
        assert_eq!(part.node_type, NodeType::Part);

        assert_eq!(part.children.len(), 1, "ARTICLE should nest under PART");
        let article = &part.children[0];
        assert_eq!(article.node_type, NodeType::Article);

        assert_eq!(article.children.len(), 1, "the section leaf should nest under ARTICLE");
        let leaf = &article.children[0];
        assert_eq!(leaf.number.as_deref(), Some("100"));

        assert_eq!(root.max_depth(), 4);
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest[0].hierarchy.division.as_deref(), Some("DIVISION 1. General Provisions"));
        assert_eq!(manifest[0].hierarchy.part.as_deref(), Some("PART 1. Civil Rights"));
        assert_eq!(manifest[0].hierarchy.article.as_deref(), Some("ARTICLE 1. Definitions"));
    }

    #[test]
    fn build_subtree_pops_back_out_to_a_sibling_division() {
        let mut root = TreeNode::new(NodeType::Code, None, "WIC");
        let headings = vec![
            Heading { text: "DIVISION 1. General Provisions".to_string(), depth: 2 },
            Heading { text: "PART 1. Civil Rights".to_string(), depth: 3 },
            Heading { text: "100. First section.".to_string(), depth: 4 },
            Heading { text: "DIVISION 2. Remedies".to_string(), depth: 2 },
            Heading { text: "200. Second section.".to_string(), depth: 3 },
        ];
        let mut manifest = Vec::new();

        build_subtree(&mut root, &headings, &mut manifest, "https://example.com/text1");

        assert_eq!(root.children.len(), 2, "sibling DIVISIONs should both hang off root");
        assert_eq!(root.children[0].children[0].number.as_deref(), Some("100"));
        assert_eq!(root.children[1].number.as_deref(), None);
        assert_eq!(root.children[1].children[0].number.as_deref(), Some("200"));
        assert_eq!(manifest.len(), 2);
    }
}
