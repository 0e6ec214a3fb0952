//! Store interface (C2, §4.2) and its SQLite-backed implementation.

pub mod models;
pub mod sqlite_store;

pub use models::{
    Checkpoint, CheckpointStatus, CodeArchitecture, FailureRecord, HierarchyTags, ManifestEntry,
    NodeType, RetryAttempt, RetryStatus, Section, SectionUpdate, Stage, Statistics, StageFlags,
    TreeNode, Version, VersionStatus,
};
pub use sqlite_store::SqliteStore;

use async_trait::async_trait;

use crate::error::PipelineResult;

/// A filter for `list_failures`.
#[derive(Debug, Clone, Default)]
pub struct FailureFilter {
    pub stage: Option<Stage>,
    pub retry_status: Option<RetryStatus>,
}

/// The storage adapter (§4.2, §6). Implementations MUST honor the
/// sparse-merge rule on `upsert_section`/`bulk_upsert_sections`: a `None`
/// field in the update never overwrites a persisted non-null value.
#[async_trait]
pub trait Store: Send + Sync {
    async fn upsert_section(
        &self,
        code: &str,
        section_id: &str,
        url: &str,
        update: SectionUpdate,
    ) -> PipelineResult<()>;

    async fn bulk_upsert_sections(
        &self,
        records: Vec<(String, String, String, SectionUpdate)>,
    ) -> PipelineResult<()>;

    async fn get_section(&self, code: &str, section_id: &str) -> PipelineResult<Option<Section>>;

    async fn put_code_architecture(&self, doc: CodeArchitecture) -> PipelineResult<()>;

    async fn get_code_architecture(&self, code: &str) -> PipelineResult<Option<CodeArchitecture>>;

    async fn save_checkpoint(&self, checkpoint: Checkpoint) -> PipelineResult<()>;

    async fn load_checkpoint(&self, code: &str, stage: Stage) -> PipelineResult<Option<Checkpoint>>;

    async fn log_failure(&self, record: FailureRecord) -> PipelineResult<()>;

    async fn list_failures(&self, code: &str, filter: FailureFilter) -> PipelineResult<Vec<FailureRecord>>;

    async fn update_retry_status(
        &self,
        code: &str,
        section_id: &str,
        attempt_number: u32,
        status: RetryStatus,
        resolved: bool,
    ) -> PipelineResult<()>;

    async fn iter_pending_sections(&self, code: &str) -> PipelineResult<Vec<Section>>;

    async fn iter_multi_version_sections(&self, code: &str) -> PipelineResult<Vec<Section>>;

    async fn count_has_content(&self, code: &str) -> PipelineResult<u64>;

    async fn all_sections(&self, code: &str) -> PipelineResult<Vec<Section>>;
}
