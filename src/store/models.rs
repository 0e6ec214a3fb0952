//! Data model types from §3: `CodeArchitecture`, `Section`, `Version`,
//! `Checkpoint`, `FailureRecord`.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FailureType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeType {
    Code,
    Division,
    Part,
    Title,
    Chapter,
    Article,
}

impl NodeType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Code => "CODE",
            Self::Division => "DIVISION",
            Self::Part => "PART",
            Self::Title => "TITLE",
            Self::Chapter => "CHAPTER",
            Self::Article => "ARTICLE",
        }
    }
}

/// A node in the recursive hierarchy tree (§3 `CodeArchitecture.tree`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub node_type: NodeType,
    pub number: Option<String>,
    pub title: String,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    #[must_use]
    pub fn new(node_type: NodeType, number: Option<String>, title: impl Into<String>) -> Self {
        Self { node_type, number, title: title.into(), children: Vec::new() }
    }

    /// Count every node in the subtree, including `self`.
    #[must_use]
    pub fn total_nodes(&self) -> usize {
        1 + self.children.iter().map(TreeNode::total_nodes).sum::<usize>()
    }

    /// Depth of the deepest leaf below `self` (`self` alone has depth 0).
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.children.iter().map(TreeNode::max_depth).max().map_or(0, |d| d + 1)
    }

    /// Count of section-identifier leaves reachable below `self`. A node
    /// with no children and a `Some(number)` matching the section grammar
    /// is considered a leaf; `CODE`/`DIVISION`/... container nodes with
    /// children are not leaves themselves.
    #[must_use]
    pub fn count_leaves(&self) -> usize {
        if self.children.is_empty() {
            usize::from(self.number.is_some())
        } else {
            self.children.iter().map(TreeNode::count_leaves).sum()
        }
    }
}

/// Hierarchy tags attached to a leaf URL / Section (§3, §4.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HierarchyTags {
    pub division: Option<String>,
    pub part: Option<String>,
    pub title: Option<String>,
    pub chapter: Option<String>,
    pub article: Option<String>,
}

/// One entry in `CodeArchitecture.url_manifest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub section_id: String,
    pub url: String,
    pub hierarchy: HierarchyTags,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub total_nodes: usize,
    pub max_depth: usize,
    pub total_sections: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageFlags {
    pub stage1_done: Option<DateTime<Utc>>,
    pub stage2_done: Option<DateTime<Utc>>,
    pub stage3_done: Option<DateTime<Utc>>,
}

/// `CodeArchitecture` (§3): one per code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeArchitecture {
    pub code: String,
    pub tree: TreeNode,
    pub url_manifest: Vec<ManifestEntry>,
    pub statistics: Statistics,
    pub multi_version_sections: BTreeSet<String>,
    pub stage_flags: StageFlags,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

impl CodeArchitecture {
    /// §3 invariant: `statistics.total_sections == |url_manifest| == count
    /// of distinct leaves reachable from tree`.
    #[must_use]
    pub fn invariants_hold(&self) -> bool {
        let manifest_len = self.url_manifest.len();
        let tree_leaves = self.tree.count_leaves();
        self.statistics.total_sections == manifest_len
            && manifest_len == tree_leaves
            && self
                .multi_version_sections
                .iter()
                .all(|id| self.url_manifest.iter().any(|e| &e.section_id == id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    Current,
    Future,
    Historical,
}

/// A `Version` of a multi-version section (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub operative_date: Option<String>,
    pub content: Option<String>,
    pub legislative_history: Option<String>,
    pub status: VersionStatus,
    pub source_url: String,
}

/// A field-level sparse-merge update for `Section` (§4.2): `None` means "do
/// not touch", distinct from `Some(None)`-shaped "set to null" which the
/// data model does not need since every nullable field here is an `Option`
/// the caller either supplies or omits.
#[derive(Debug, Clone, Default)]
pub struct SectionUpdate {
    pub url: Option<String>,
    pub content: Option<String>,
    pub raw_content: Option<String>,
    pub legislative_history: Option<String>,
    pub is_multi_version: Option<bool>,
    pub version_number: Option<i64>,
    pub is_current: Option<bool>,
    pub versions: Option<Vec<Version>>,
    pub hierarchy: Option<HierarchyTags>,
}

/// `Section` (§3): keyed by (code, section_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub code: String,
    pub section_id: String,
    pub url: String,
    pub content: Option<String>,
    pub raw_content: Option<String>,
    pub legislative_history: Option<String>,
    pub is_multi_version: bool,
    pub version_number: Option<i64>,
    pub is_current: Option<bool>,
    pub versions: Vec<Version>,
    pub hierarchy: HierarchyTags,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Section {
    /// Derived `has_content` per §3/§8 property 1.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.content.as_ref().is_some_and(|c| !c.is_empty())
    }

    #[must_use]
    pub fn content_length(&self) -> usize {
        self.content.as_ref().map_or(0, String::len)
    }

    /// §8 property 2: `is_multi_version ⇔ versions ≠ ∅`.
    #[must_use]
    pub fn multi_version_invariant_holds(&self) -> bool {
        self.is_multi_version == !self.versions.is_empty()
    }

    /// Whether this leaf still needs work from Stage 2/3 or reconciliation
    /// (§4.7 "missing" definition).
    #[must_use]
    pub fn is_missing(&self) -> bool {
        if self.is_multi_version {
            self.versions.is_empty()
        } else {
            !self.has_content()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Stage1,
    Stage2,
    Stage3,
    Reconciliation,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stage1 => "stage1",
            Self::Stage2 => "stage2",
            Self::Stage3 => "stage3",
            Self::Reconciliation => "reconciliation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    InProgress,
    Paused,
    Completed,
    Failed,
}

/// `Checkpoint` (§3): keyed by (code, stage).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub code: String,
    pub stage: Stage,
    pub status: CheckpointStatus,
    pub current_batch: u32,
    pub total_batches: u32,
    pub processed_count: u64,
    pub failed_section_ids: BTreeSet<String>,
    pub worker_count: u32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl Checkpoint {
    #[must_use]
    pub fn new(code: impl Into<String>, stage: Stage, total_batches: u32, worker_count: u32) -> Self {
        let now = Utc::now();
        Self {
            code: code.into(),
            stage,
            status: CheckpointStatus::InProgress,
            current_batch: 0,
            total_batches,
            processed_count: 0,
            failed_section_ids: BTreeSet::new(),
            worker_count,
            started_at: now,
            updated_at: now,
            error: None,
        }
    }

    /// §3 invariant: resuming skips batches with index <= current_batch.
    #[must_use]
    pub fn start_batch(&self) -> u32 {
        self.current_batch + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStatus {
    Pending,
    Retrying,
    Succeeded,
    Failed,
    Abandoned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryAttempt {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub details: String,
}

/// `FailureRecord` (§3): keyed by (code, section_id, attempt_number).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub code: String,
    pub section_id: String,
    pub attempt_number: u32,
    pub url: String,
    pub failure_type: FailureType,
    pub error_message: String,
    pub stage: Stage,
    pub batch_number: Option<u32>,
    pub is_multi_version: bool,
    pub retry_status: RetryStatus,
    pub retry_attempts: Vec<RetryAttempt>,
    pub failed_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(number: &str) -> TreeNode {
        TreeNode::new(NodeType::Article, Some(number.to_string()), format!("Section {number}"))
    }

    #[test]
    fn tree_statistics_match_leaf_count() {
        let mut chapter = TreeNode::new(NodeType::Chapter, Some("3".into()), "Chapter 3");
        chapter.children.push(leaf("100"));
        chapter.children.push(leaf("101"));
        let mut root = TreeNode::new(NodeType::Code, None, "Code");
        root.children.push(chapter);

        assert_eq!(root.count_leaves(), 2);
        assert_eq!(root.max_depth(), 2);
        assert_eq!(root.total_nodes(), 4);
    }

    #[test]
    fn section_has_content_requires_non_empty_string() {
        let mut s = blank_section();
        assert!(!s.has_content());
        s.content = Some(String::new());
        assert!(!s.has_content());
        s.content = Some("text".into());
        assert!(s.has_content());
    }

    fn blank_section() -> Section {
        let now = Utc::now();
        Section {
            code: "WIC".into(),
            section_id: "100".into(),
            url: "https://example.com/100".into(),
            content: None,
            raw_content: None,
            legislative_history: None,
            is_multi_version: false,
            version_number: None,
            is_current: None,
            versions: Vec::new(),
            hierarchy: HierarchyTags::default(),
            updated_at: now,
            created_at: now,
        }
    }

    #[test]
    fn multi_version_invariant() {
        let mut s = blank_section();
        assert!(s.multi_version_invariant_holds());
        s.is_multi_version = true;
        assert!(!s.multi_version_invariant_holds());
        s.versions.push(Version {
            operative_date: None,
            content: None,
            legislative_history: None,
            status: VersionStatus::Current,
            source_url: "https://example.com/v1".into(),
        });
        assert!(s.multi_version_invariant_holds());
    }
}
