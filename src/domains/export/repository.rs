use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::errors::{DbError, DomainError, DomainResult};

use super::types::{ExportJob, ExportStatus};

/// Persistence for the export job state machine.
#[async_trait]
pub trait ExportJobRepository: Send + Sync {
    /// Create a `Pending` job if no live job with this id exists.
    ///
    /// The insert is atomic and doubles as the run-level single-flight guard:
    /// a terminal (`Completed`/`Failed`) row with the same id is replaced,
    /// a live one makes this fail with a conflict.
    async fn schedule(&self, id: &str) -> DomainResult<ExportJob>;

    async fn set_status(
        &self,
        id: &str,
        status: ExportStatus,
        error: Option<String>,
    ) -> DomainResult<()>;

    async fn find_by_id(&self, id: &str) -> DomainResult<ExportJob>;

    /// Remove a terminal job record. Live jobs cannot be removed.
    async fn remove(&self, id: &str) -> DomainResult<()>;
}

pub struct SqliteExportJobRepository {
    pool: SqlitePool,
}

impl SqliteExportJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    status: String,
    error_message: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<JobRow> for ExportJob {
    type Error = DomainError;

    fn try_from(row: JobRow) -> DomainResult<Self> {
        let status = ExportStatus::parse(&row.status).ok_or_else(|| {
            DomainError::Internal(format!("invalid status '{}' in export_jobs", row.status))
        })?;
        let parse_ts = |s: &str| {
            chrono::DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| DomainError::Internal(format!("bad timestamp: {e}")))
        };
        Ok(ExportJob {
            id: row.id,
            status,
            error_message: row.error_message,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

#[async_trait]
impl ExportJobRepository for SqliteExportJobRepository {
    async fn schedule(&self, id: &str) -> DomainResult<ExportJob> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::Database(DbError::Sqlx(e)))?;

        // Terminal rows are reusable; clearing them here keeps the id free
        // for the insert below while the primary key still serializes two
        // racing schedule calls.
        sqlx::query(
            "DELETE FROM export_jobs WHERE id = ? AND status IN ('completed', 'failed')",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::Database(DbError::Sqlx(e)))?;

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO export_jobs (id, status, created_at, updated_at)
             VALUES (?, 'pending', ?, ?)",
        )
        .bind(id)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::Database(DbError::Sqlx(e)))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::Database(DbError::Sqlx(e)))?;

        if inserted.rows_affected() == 0 {
            return Err(DomainError::Database(DbError::Conflict(format!(
                "export job '{id}' is already scheduled"
            ))));
        }

        Ok(ExportJob {
            id: id.to_string(),
            status: ExportStatus::Pending,
            error_message: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn set_status(
        &self,
        id: &str,
        status: ExportStatus,
        error: Option<String>,
    ) -> DomainResult<()> {
        let updated = sqlx::query(
            "UPDATE export_jobs SET status = ?, error_message = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(error)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Database(DbError::Sqlx(e)))?;

        if updated.rows_affected() == 0 {
            return Err(DomainError::Database(DbError::NotFound(
                "export job".to_string(),
                id.to_string(),
            )));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<ExportJob> {
        let row: Option<JobRow> = sqlx::query_as("SELECT * FROM export_jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::Sqlx(e)))?;

        row.ok_or_else(|| {
            DomainError::Database(DbError::NotFound("export job".to_string(), id.to_string()))
        })?
        .try_into()
    }

    async fn remove(&self, id: &str) -> DomainResult<()> {
        let removed = sqlx::query(
            "DELETE FROM export_jobs WHERE id = ? AND status IN ('completed', 'failed')",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Database(DbError::Sqlx(e)))?;

        if removed.rows_affected() == 0 {
            return Err(DomainError::Database(DbError::Conflict(format!(
                "export job '{id}' is not in a terminal state"
            ))));
        }
        Ok(())
    }
}
