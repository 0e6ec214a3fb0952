//! SQLite-backed `Store` implementation.
//!
//! Directly modeled on the teacher's `LinkIndex` (`src/link_index/mod.rs`):
//! a `sqlx::SqlitePool` opened once, WAL journal mode, idempotent schema
//! creation via `CREATE TABLE IF NOT EXISTS`, and a generous `busy_timeout`
//! so Stage 2's worker pool can write concurrently without lock errors.

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::error::{PipelineResult, StoreError};
use crate::store::models::{
    Checkpoint, CheckpointStatus, CodeArchitecture, FailureRecord, RetryStatus, Section,
    SectionUpdate, Stage,
};
use crate::store::{FailureFilter, Store};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS section_contents (
    code TEXT NOT NULL,
    section_id TEXT NOT NULL,
    url TEXT NOT NULL,
    content TEXT,
    raw_content TEXT,
    legislative_history TEXT,
    is_multi_version INTEGER NOT NULL DEFAULT 0,
    version_number INTEGER,
    is_current INTEGER,
    versions_json TEXT NOT NULL DEFAULT '[]',
    hierarchy_json TEXT NOT NULL DEFAULT '{}',
    updated_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (code, section_id)
);

CREATE INDEX IF NOT EXISTS idx_sections_code ON section_contents(code);

CREATE TABLE IF NOT EXISTS code_architectures (
    code TEXT PRIMARY KEY,
    tree_json TEXT NOT NULL,
    manifest_json TEXT NOT NULL,
    statistics_json TEXT NOT NULL,
    multi_version_sections_json TEXT NOT NULL,
    stage_flags_json TEXT NOT NULL,
    session_id TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS processing_checkpoints (
    code TEXT NOT NULL,
    stage TEXT NOT NULL,
    status TEXT NOT NULL,
    current_batch INTEGER NOT NULL,
    total_batches INTEGER NOT NULL,
    processed_count INTEGER NOT NULL,
    failed_section_ids_json TEXT NOT NULL,
    worker_count INTEGER NOT NULL,
    started_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    error TEXT,
    PRIMARY KEY (code, stage)
);

CREATE TABLE IF NOT EXISTS failed_sections (
    code TEXT NOT NULL,
    section_id TEXT NOT NULL,
    attempt_number INTEGER NOT NULL,
    url TEXT NOT NULL,
    failure_type TEXT NOT NULL,
    error_message TEXT NOT NULL,
    stage TEXT NOT NULL,
    batch_number INTEGER,
    is_multi_version INTEGER NOT NULL,
    retry_status TEXT NOT NULL,
    retry_attempts_json TEXT NOT NULL,
    failed_at TEXT NOT NULL,
    resolved_at TEXT,
    PRIMARY KEY (code, section_id, attempt_number)
);

CREATE INDEX IF NOT EXISTS idx_failures_code_section ON failed_sections(code, section_id);

-- failure_reports holds the final PipelineReport JSON per (code, run), used
-- for post-hoc inspection independent of in-process PipelineReport values.
CREATE TABLE IF NOT EXISTS failure_reports (
    code TEXT NOT NULL,
    generated_at TEXT NOT NULL,
    report_json TEXT NOT NULL,
    PRIMARY KEY (code, generated_at)
);
"#;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if absent) the SQLite database at `path`.
    pub async fn open(path: &Path) -> PipelineResult<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Backend(format!("failed to create store directory: {e}")))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .map_err(StoreError::from)?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await.map_err(StoreError::from)?;

        Ok(Self { pool })
    }

    /// In-memory store for tests.
    pub async fn open_in_memory() -> PipelineResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(StoreError::from)?;
        sqlx::query(SCHEMA_SQL).execute(&pool).await.map_err(StoreError::from)?;
        Ok(Self { pool })
    }

    async fn upsert_section_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        code: &str,
        section_id: &str,
        url: &str,
        update: &SectionUpdate,
    ) -> PipelineResult<()> {
        let existing = sqlx::query(
            "SELECT content, raw_content, legislative_history, is_multi_version, \
             version_number, is_current, versions_json, hierarchy_json, created_at \
             FROM section_contents WHERE code = ? AND section_id = ?",
        )
        .bind(code)
        .bind(section_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(StoreError::from)?;

        let now = Utc::now().to_rfc3339();

        if let Some(row) = existing {
            // Sparse merge (§4.2): `None` in `update` keeps the persisted value.
            let content: Option<String> =
                update.content.clone().or_else(|| row.get::<Option<String>, _>("content"));
            let raw_content: Option<String> = update
                .raw_content
                .clone()
                .or_else(|| row.get::<Option<String>, _>("raw_content"));
            let legislative_history: Option<String> = update
                .legislative_history
                .clone()
                .or_else(|| row.get::<Option<String>, _>("legislative_history"));
            let is_multi_version: bool = update
                .is_multi_version
                .unwrap_or_else(|| row.get::<i64, _>("is_multi_version") != 0);
            let version_number: Option<i64> =
                update.version_number.or_else(|| row.get::<Option<i64>, _>("version_number"));
            let is_current: Option<bool> = update
                .is_current
                .or_else(|| row.get::<Option<i64>, _>("is_current").map(|v| v != 0));
            let versions_json = match &update.versions {
                Some(versions) => serde_json::to_string(versions).map_err(StoreError::from)?,
                None => row.get::<String, _>("versions_json"),
            };
            let hierarchy_json = match &update.hierarchy {
                Some(h) => serde_json::to_string(h).map_err(StoreError::from)?,
                None => row.get::<String, _>("hierarchy_json"),
            };
            let created_at: String = row.get("created_at");
            let resolved_url = update.url.clone().unwrap_or_else(|| url.to_string());

            sqlx::query(
                "UPDATE section_contents SET url = ?, content = ?, raw_content = ?, \
                 legislative_history = ?, is_multi_version = ?, version_number = ?, \
                 is_current = ?, versions_json = ?, hierarchy_json = ?, updated_at = ? \
                 WHERE code = ? AND section_id = ?",
            )
            .bind(resolved_url)
            .bind(content)
            .bind(raw_content)
            .bind(legislative_history)
            .bind(i64::from(is_multi_version))
            .bind(version_number)
            .bind(is_current.map(i64::from))
            .bind(versions_json)
            .bind(hierarchy_json)
            .bind(now)
            .bind(code)
            .bind(section_id)
            .execute(&mut **tx)
            .await
            .map_err(StoreError::from)?;
            let _ = created_at;
        } else {
            let versions_json = match &update.versions {
                Some(versions) => serde_json::to_string(versions).map_err(StoreError::from)?,
                None => "[]".to_string(),
            };
            let hierarchy_json = match &update.hierarchy {
                Some(h) => serde_json::to_string(h).map_err(StoreError::from)?,
                None => "{}".to_string(),
            };
            sqlx::query(
                "INSERT INTO section_contents \
                 (code, section_id, url, content, raw_content, legislative_history, \
                  is_multi_version, version_number, is_current, versions_json, \
                  hierarchy_json, updated_at, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(code)
            .bind(section_id)
            .bind(update.url.clone().unwrap_or_else(|| url.to_string()))
            .bind(update.content.clone())
            .bind(update.raw_content.clone())
            .bind(update.legislative_history.clone())
            .bind(i64::from(update.is_multi_version.unwrap_or(false)))
            .bind(update.version_number)
            .bind(update.is_current.map(i64::from))
            .bind(versions_json)
            .bind(hierarchy_json)
            .bind(&now)
            .bind(&now)
            .execute(&mut **tx)
            .await
            .map_err(StoreError::from)?;
        }

        Ok(())
    }

    fn row_to_section(row: &sqlx::sqlite::SqliteRow) -> PipelineResult<Section> {
        let versions_json: String = row.get("versions_json");
        let hierarchy_json: String = row.get("hierarchy_json");
        Ok(Section {
            code: row.get("code"),
            section_id: row.get("section_id"),
            url: row.get("url"),
            content: row.get("content"),
            raw_content: row.get("raw_content"),
            legislative_history: row.get("legislative_history"),
            is_multi_version: row.get::<i64, _>("is_multi_version") != 0,
            version_number: row.get("version_number"),
            is_current: row.get::<Option<i64>, _>("is_current").map(|v| v != 0),
            versions: serde_json::from_str(&versions_json).map_err(StoreError::from)?,
            hierarchy: serde_json::from_str(&hierarchy_json).map_err(StoreError::from)?,
            updated_at: parse_ts(&row.get::<String, _>("updated_at")),
            created_at: parse_ts(&row.get::<String, _>("created_at")),
        })
    }
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_section(
        &self,
        code: &str,
        section_id: &str,
        url: &str,
        update: SectionUpdate,
    ) -> PipelineResult<()> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;
        Self::upsert_section_tx(&mut tx, code, section_id, url, &update).await?;
        tx.commit().await.map_err(StoreError::from)?;
        Ok(())
    }

    async fn bulk_upsert_sections(
        &self,
        records: Vec<(String, String, String, SectionUpdate)>,
    ) -> PipelineResult<()> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;
        for (code, section_id, url, update) in &records {
            Self::upsert_section_tx(&mut tx, code, section_id, url, update).await?;
        }
        tx.commit().await.map_err(StoreError::from)?;
        Ok(())
    }

    async fn get_section(&self, code: &str, section_id: &str) -> PipelineResult<Option<Section>> {
        let row = sqlx::query("SELECT * FROM section_contents WHERE code = ? AND section_id = ?")
            .bind(code)
            .bind(section_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;
        row.as_ref().map(Self::row_to_section).transpose()
    }

    async fn put_code_architecture(&self, doc: CodeArchitecture) -> PipelineResult<()> {
        let existing_multi: Option<String> = sqlx::query(
            "SELECT multi_version_sections_json FROM code_architectures WHERE code = ?",
        )
        .bind(&doc.code)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?
        .map(|r| r.get("multi_version_sections_json"));

        // §3: multi_version_sections is additive across re-crawls.
        let mut merged: BTreeSet<String> = existing_multi
            .map(|j| serde_json::from_str(&j).unwrap_or_default())
            .unwrap_or_default();
        merged.extend(doc.multi_version_sections.iter().cloned());

        sqlx::query(
            "INSERT INTO code_architectures \
             (code, tree_json, manifest_json, statistics_json, multi_version_sections_json, \
              stage_flags_json, session_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(code) DO UPDATE SET \
               tree_json = excluded.tree_json, \
               manifest_json = excluded.manifest_json, \
               statistics_json = excluded.statistics_json, \
               multi_version_sections_json = excluded.multi_version_sections_json, \
               stage_flags_json = excluded.stage_flags_json, \
               session_id = excluded.session_id",
        )
        .bind(&doc.code)
        .bind(serde_json::to_string(&doc.tree).map_err(StoreError::from)?)
        .bind(serde_json::to_string(&doc.url_manifest).map_err(StoreError::from)?)
        .bind(serde_json::to_string(&doc.statistics).map_err(StoreError::from)?)
        .bind(serde_json::to_string(&merged).map_err(StoreError::from)?)
        .bind(serde_json::to_string(&doc.stage_flags).map_err(StoreError::from)?)
        .bind(&doc.session_id)
        .bind(doc.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;
        Ok(())
    }

    async fn get_code_architecture(&self, code: &str) -> PipelineResult<Option<CodeArchitecture>> {
        let row = sqlx::query("SELECT * FROM code_architectures WHERE code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;
        let Some(row) = row else { return Ok(None) };
        Ok(Some(CodeArchitecture {
            code: row.get("code"),
            tree: serde_json::from_str(&row.get::<String, _>("tree_json")).map_err(StoreError::from)?,
            url_manifest: serde_json::from_str(&row.get::<String, _>("manifest_json"))
                .map_err(StoreError::from)?,
            statistics: serde_json::from_str(&row.get::<String, _>("statistics_json"))
                .map_err(StoreError::from)?,
            multi_version_sections: serde_json::from_str(
                &row.get::<String, _>("multi_version_sections_json"),
            )
            .map_err(StoreError::from)?,
            stage_flags: serde_json::from_str(&row.get::<String, _>("stage_flags_json"))
                .map_err(StoreError::from)?,
            session_id: row.get("session_id"),
            created_at: parse_ts(&row.get::<String, _>("created_at")),
        }))
    }

    async fn save_checkpoint(&self, checkpoint: Checkpoint) -> PipelineResult<()> {
        sqlx::query(
            "INSERT INTO processing_checkpoints \
             (code, stage, status, current_batch, total_batches, processed_count, \
              failed_section_ids_json, worker_count, started_at, updated_at, error) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(code, stage) DO UPDATE SET \
               status = excluded.status, \
               current_batch = excluded.current_batch, \
               total_batches = excluded.total_batches, \
               processed_count = excluded.processed_count, \
               failed_section_ids_json = excluded.failed_section_ids_json, \
               worker_count = excluded.worker_count, \
               updated_at = excluded.updated_at, \
               error = excluded.error",
        )
        .bind(&checkpoint.code)
        .bind(checkpoint.stage.as_str())
        .bind(status_str(checkpoint.status))
        .bind(checkpoint.current_batch)
        .bind(checkpoint.total_batches)
        .bind(i64::try_from(checkpoint.processed_count).unwrap_or(i64::MAX))
        .bind(serde_json::to_string(&checkpoint.failed_section_ids).map_err(StoreError::from)?)
        .bind(checkpoint.worker_count)
        .bind(checkpoint.started_at.to_rfc3339())
        .bind(checkpoint.updated_at.to_rfc3339())
        .bind(checkpoint.error)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;
        Ok(())
    }

    async fn load_checkpoint(&self, code: &str, stage: Stage) -> PipelineResult<Option<Checkpoint>> {
        let row = sqlx::query(
            "SELECT * FROM processing_checkpoints WHERE code = ? AND stage = ?",
        )
        .bind(code)
        .bind(stage.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;
        let Some(row) = row else { return Ok(None) };
        Ok(Some(Checkpoint {
            code: row.get("code"),
            stage,
            status: parse_status(&row.get::<String, _>("status")),
            current_batch: row.get::<i64, _>("current_batch") as u32,
            total_batches: row.get::<i64, _>("total_batches") as u32,
            processed_count: row.get::<i64, _>("processed_count") as u64,
            failed_section_ids: serde_json::from_str(
                &row.get::<String, _>("failed_section_ids_json"),
            )
            .map_err(StoreError::from)?,
            worker_count: row.get::<i64, _>("worker_count") as u32,
            started_at: parse_ts(&row.get::<String, _>("started_at")),
            updated_at: parse_ts(&row.get::<String, _>("updated_at")),
            error: row.get("error"),
        }))
    }

    async fn log_failure(&self, record: FailureRecord) -> PipelineResult<()> {
        sqlx::query(
            "INSERT INTO failed_sections \
             (code, section_id, attempt_number, url, failure_type, error_message, stage, \
              batch_number, is_multi_version, retry_status, retry_attempts_json, failed_at, \
              resolved_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(code, section_id, attempt_number) DO UPDATE SET \
               retry_status = excluded.retry_status, \
               retry_attempts_json = excluded.retry_attempts_json, \
               resolved_at = excluded.resolved_at",
        )
        .bind(&record.code)
        .bind(&record.section_id)
        .bind(record.attempt_number)
        .bind(&record.url)
        .bind(record.failure_type.as_str())
        .bind(&record.error_message)
        .bind(record.stage.as_str())
        .bind(record.batch_number)
        .bind(i64::from(record.is_multi_version))
        .bind(retry_status_str(record.retry_status))
        .bind(serde_json::to_string(&record.retry_attempts).map_err(StoreError::from)?)
        .bind(record.failed_at.to_rfc3339())
        .bind(record.resolved_at.map(|d| d.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;
        Ok(())
    }

    async fn list_failures(&self, code: &str, filter: FailureFilter) -> PipelineResult<Vec<FailureRecord>> {
        let rows = sqlx::query("SELECT * FROM failed_sections WHERE code = ?")
            .bind(code)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from)?;
        let mut out = Vec::new();
        for row in rows {
            let stage = parse_stage(&row.get::<String, _>("stage"));
            let retry_status = parse_retry_status(&row.get::<String, _>("retry_status"));
            if filter.stage.is_some_and(|s| s != stage) {
                continue;
            }
            if filter.retry_status.is_some_and(|s| s != retry_status) {
                continue;
            }
            out.push(FailureRecord {
                code: row.get("code"),
                section_id: row.get("section_id"),
                attempt_number: row.get::<i64, _>("attempt_number") as u32,
                url: row.get("url"),
                failure_type: parse_failure_type(&row.get::<String, _>("failure_type")),
                error_message: row.get("error_message"),
                stage,
                batch_number: row.get::<Option<i64>, _>("batch_number").map(|v| v as u32),
                is_multi_version: row.get::<i64, _>("is_multi_version") != 0,
                retry_status,
                retry_attempts: serde_json::from_str(&row.get::<String, _>("retry_attempts_json"))
                    .map_err(StoreError::from)?,
                failed_at: parse_ts(&row.get::<String, _>("failed_at")),
                resolved_at: row
                    .get::<Option<String>, _>("resolved_at")
                    .map(|s| parse_ts(&s)),
            });
        }
        Ok(out)
    }

    async fn update_retry_status(
        &self,
        code: &str,
        section_id: &str,
        attempt_number: u32,
        status: RetryStatus,
        resolved: bool,
    ) -> PipelineResult<()> {
        let resolved_at = if resolved { Some(Utc::now().to_rfc3339()) } else { None };
        sqlx::query(
            "UPDATE failed_sections SET retry_status = ?, resolved_at = ? \
             WHERE code = ? AND section_id = ? AND attempt_number = ?",
        )
        .bind(retry_status_str(status))
        .bind(resolved_at)
        .bind(code)
        .bind(section_id)
        .bind(attempt_number)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;
        Ok(())
    }

    async fn iter_pending_sections(&self, code: &str) -> PipelineResult<Vec<Section>> {
        let rows = sqlx::query(
            "SELECT * FROM section_contents WHERE code = ? AND is_multi_version = 0 \
             AND (content IS NULL OR content = '')",
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;
        rows.iter().map(Self::row_to_section).collect()
    }

    async fn iter_multi_version_sections(&self, code: &str) -> PipelineResult<Vec<Section>> {
        let rows = sqlx::query(
            "SELECT * FROM section_contents WHERE code = ? AND is_multi_version = 1",
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;
        rows.iter().map(Self::row_to_section).collect()
    }

    async fn count_has_content(&self, code: &str) -> PipelineResult<u64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as n FROM section_contents \
             WHERE code = ? AND content IS NOT NULL AND content != ''",
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from)?;
        Ok(row.get::<i64, _>("n") as u64)
    }

    async fn all_sections(&self, code: &str) -> PipelineResult<Vec<Section>> {
        let rows = sqlx::query("SELECT * FROM section_contents WHERE code = ?")
            .bind(code)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from)?;
        rows.iter().map(Self::row_to_section).collect()
    }
}

fn status_str(status: CheckpointStatus) -> &'static str {
    match status {
        CheckpointStatus::InProgress => "in_progress",
        CheckpointStatus::Paused => "paused",
        CheckpointStatus::Completed => "completed",
        CheckpointStatus::Failed => "failed",
    }
}

fn parse_status(s: &str) -> CheckpointStatus {
    match s {
        "paused" => CheckpointStatus::Paused,
        "completed" => CheckpointStatus::Completed,
        "failed" => CheckpointStatus::Failed,
        _ => CheckpointStatus::InProgress,
    }
}

fn retry_status_str(status: RetryStatus) -> &'static str {
    match status {
        RetryStatus::Pending => "pending",
        RetryStatus::Retrying => "retrying",
        RetryStatus::Succeeded => "succeeded",
        RetryStatus::Failed => "failed",
        RetryStatus::Abandoned => "abandoned",
    }
}

fn parse_retry_status(s: &str) -> RetryStatus {
    match s {
        "retrying" => RetryStatus::Retrying,
        "succeeded" => RetryStatus::Succeeded,
        "failed" => RetryStatus::Failed,
        "abandoned" => RetryStatus::Abandoned,
        _ => RetryStatus::Pending,
    }
}

fn parse_stage(s: &str) -> Stage {
    match s {
        "stage2" => Stage::Stage2,
        "stage3" => Stage::Stage3,
        "reconciliation" => Stage::Reconciliation,
        _ => Stage::Stage1,
    }
}

fn parse_failure_type(s: &str) -> crate::error::FailureType {
    use crate::error::FailureType;
    match s {
        "timeout" => FailureType::Timeout,
        "parse_error" => FailureType::ParseError,
        "empty_content" => FailureType::EmptyContent,
        "api_error" => FailureType::ApiError,
        "multi_version_timeout" => FailureType::MultiVersionTimeout,
        "repealed" => FailureType::Repealed,
        _ => FailureType::NetworkError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::HierarchyTags;

    #[tokio::test]
    async fn sparse_merge_preserves_existing_content() -> anyhow::Result<()> {
        let store = SqliteStore::open_in_memory().await?;

        store
            .upsert_section(
                "WIC",
                "100",
                "https://example.com/100",
                SectionUpdate {
                    content: Some("full text".into()),
                    legislative_history: Some("(Stats. 2020 ch. 1)".into()),
                    ..Default::default()
                },
            )
            .await?;

        // Simulate a Stage 1 re-run that only knows the URL.
        store
            .upsert_section(
                "WIC",
                "100",
                "https://example.com/100",
                SectionUpdate { hierarchy: Some(HierarchyTags::default()), ..Default::default() },
            )
            .await?;

        let section = store.get_section("WIC", "100").await?.expect("section exists");
        assert_eq!(section.content.as_deref(), Some("full text"));
        assert_eq!(section.legislative_history.as_deref(), Some("(Stats. 2020 ch. 1)"));
        Ok(())
    }

    #[tokio::test]
    async fn checkpoint_roundtrip() -> anyhow::Result<()> {
        let store = SqliteStore::open_in_memory().await?;
        let mut checkpoint = Checkpoint::new("WIC", Stage::Stage2, 11, 15);
        checkpoint.current_batch = 3;
        store.save_checkpoint(checkpoint.clone()).await?;

        let loaded = store.load_checkpoint("WIC", Stage::Stage2).await?.expect("checkpoint exists");
        assert_eq!(loaded.current_batch, 3);
        assert_eq!(loaded.total_batches, 11);
        Ok(())
    }

    #[tokio::test]
    async fn architecture_multi_version_sections_are_additive() -> anyhow::Result<()> {
        let store = SqliteStore::open_in_memory().await?;
        let mut arch = sample_architecture();
        arch.multi_version_sections.insert("100".into());
        store.put_code_architecture(arch.clone()).await?;

        arch.multi_version_sections.clear();
        arch.multi_version_sections.insert("200".into());
        store.put_code_architecture(arch).await?;

        let loaded = store.get_code_architecture("WIC").await?.expect("architecture exists");
        assert!(loaded.multi_version_sections.contains("100"));
        assert!(loaded.multi_version_sections.contains("200"));
        Ok(())
    }

    fn sample_architecture() -> CodeArchitecture {
        use crate::store::models::{NodeType, Statistics, StageFlags, TreeNode};
        CodeArchitecture {
            code: "WIC".into(),
            tree: TreeNode::new(NodeType::Code, None, "Welfare and Institutions Code"),
            url_manifest: Vec::new(),
            statistics: Statistics::default(),
            multi_version_sections: BTreeSet::new(),
            stage_flags: StageFlags::default(),
            session_id: "session-1".into(),
            created_at: Utc::now(),
        }
    }
}
