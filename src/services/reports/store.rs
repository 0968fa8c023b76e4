use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::types::{ReportJobRow, ReportStatus};

/// Persistence for report job lifecycle records. Terminal transitions only
/// apply to a job that is still running and report whether they did.
#[async_trait]
pub trait ReportJobStore: Send + Sync {
    async fn create_running(&self, report_id: Uuid) -> Result<ReportJobRow, sqlx::Error>;

    async fn get(&self, report_id: Uuid) -> Result<Option<ReportJobRow>, sqlx::Error>;

    async fn mark_complete(&self, report_id: Uuid, artifact_path: &Path)
        -> Result<bool, sqlx::Error>;

    async fn mark_error(&self, report_id: Uuid) -> Result<bool, sqlx::Error>;
}

#[derive(Debug, Clone)]
pub struct PgReportJobStore {
    db: PgPool,
}

impl PgReportJobStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReportJobStore for PgReportJobStore {
    async fn create_running(&self, report_id: Uuid) -> Result<ReportJobRow, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO report_jobs (report_id, status, created_at)
            VALUES ($1, $2, now())
            RETURNING report_id, status, created_at, completed_at, artifact_path
            "#,
        )
        .bind(report_id)
        .bind(ReportStatus::Running.as_str())
        .fetch_one(&self.db)
        .await
    }

    async fn get(&self, report_id: Uuid) -> Result<Option<ReportJobRow>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT report_id, status, created_at, completed_at, artifact_path
            FROM report_jobs
            WHERE report_id = $1
            LIMIT 1
            "#,
        )
        .bind(report_id)
        .fetch_optional(&self.db)
        .await
    }

    async fn mark_complete(
        &self,
        report_id: Uuid,
        artifact_path: &Path,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE report_jobs
            SET status = $2,
                completed_at = now(),
                artifact_path = $3
            WHERE report_id = $1 AND status = $4
            "#,
        )
        .bind(report_id)
        .bind(ReportStatus::Complete.as_str())
        .bind(artifact_path.display().to_string())
        .bind(ReportStatus::Running.as_str())
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_error(&self, report_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE report_jobs
            SET status = $2
            WHERE report_id = $1 AND status = $3
            "#,
        )
        .bind(report_id)
        .bind(ReportStatus::Error.as_str())
        .bind(ReportStatus::Running.as_str())
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryReportJobStore {
    jobs: Arc<RwLock<HashMap<Uuid, ReportJobRow>>>,
}

impl InMemoryReportJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportJobStore for InMemoryReportJobStore {
    async fn create_running(&self, report_id: Uuid) -> Result<ReportJobRow, sqlx::Error> {
        let row = ReportJobRow {
            report_id,
            status: ReportStatus::Running.as_str().to_string(),
            created_at: Utc::now(),
            completed_at: None,
            artifact_path: None,
        };
        self.jobs.write().await.insert(report_id, row.clone());
        Ok(row)
    }

    async fn get(&self, report_id: Uuid) -> Result<Option<ReportJobRow>, sqlx::Error> {
        Ok(self.jobs.read().await.get(&report_id).cloned())
    }

    async fn mark_complete(
        &self,
        report_id: Uuid,
        artifact_path: &Path,
    ) -> Result<bool, sqlx::Error> {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&report_id) else {
            return Ok(false);
        };
        if job.status_enum().is_terminal() {
            return Ok(false);
        }
        job.status = ReportStatus::Complete.as_str().to_string();
        job.completed_at = Some(Utc::now());
        job.artifact_path = Some(artifact_path.display().to_string());
        Ok(true)
    }

    async fn mark_error(&self, report_id: Uuid) -> Result<bool, sqlx::Error> {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&report_id) else {
            return Ok(false);
        };
        if job.status_enum().is_terminal() {
            return Ok(false);
        }
        job.status = ReportStatus::Error.as_str().to_string();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::reports::ReportLookup;

    #[tokio::test]
    async fn terminal_states_are_final() {
        let store = InMemoryReportJobStore::new();
        let id = Uuid::new_v4();
        store.create_running(id).await.expect("create");

        assert!(store
            .mark_complete(id, Path::new("/tmp/report.csv"))
            .await
            .expect("complete"));
        assert!(!store.mark_error(id).await.expect("error"));
        assert!(!store
            .mark_complete(id, Path::new("/tmp/other.csv"))
            .await
            .expect("complete again"));

        let row = store.get(id).await.expect("get").expect("row");
        assert!(row.completed_at.is_some());
        assert_eq!(
            row.lookup(),
            ReportLookup::Complete {
                artifact_path: "/tmp/report.csv".into()
            }
        );
    }

    #[tokio::test]
    async fn unknown_report_cannot_transition() {
        let store = InMemoryReportJobStore::new();
        assert!(!store.mark_error(Uuid::new_v4()).await.expect("error"));
        assert!(store.get(Uuid::new_v4()).await.expect("get").is_none());
    }
}
