use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Job id for a full (non-category-scoped) export.
pub const FULL_EXPORT_JOB_ID: &str = "all";

/// Export job lifecycle: `Pending → InProgress → Completed | Failed`.
/// Terminal rows are replaced on the next schedule of the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ExportStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportStatus::Completed | ExportStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStatus::Pending => "pending",
            ExportStatus::InProgress => "in_progress",
            ExportStatus::Completed => "completed",
            ExportStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ExportStatus::Pending),
            "in_progress" => Some(ExportStatus::InProgress),
            "completed" => Some(ExportStatus::Completed),
            "failed" => Some(ExportStatus::Failed),
            _ => None,
        }
    }
}

/// Row mapped to the `export_jobs` table. The id is the normalized category
/// key being exported, or [`FULL_EXPORT_JOB_ID`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportJob {
    pub id: String,
    pub status: ExportStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of one pipeline run, reported by the synchronous trigger.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub bindings_exported: usize,
    pub categories: usize,
    pub archive_key: String,
    pub archive_bytes: u64,
}
