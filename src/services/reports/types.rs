use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum ReportStatus {
    Running,
    Complete,
    Error,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Running => "Running",
            ReportStatus::Complete => "Complete",
            ReportStatus::Error => "Error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::Complete | ReportStatus::Error)
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct ReportJobRow {
    pub report_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub artifact_path: Option<String>,
}

impl ReportJobRow {
    pub fn status_enum(&self) -> ReportStatus {
        match self.status.as_str() {
            "Running" => ReportStatus::Running,
            "Complete" => ReportStatus::Complete,
            "Error" => ReportStatus::Error,
            other => {
                tracing::warn!(status = %other, report_id = %self.report_id, "unknown report status; treating as error");
                ReportStatus::Error
            }
        }
    }

    pub fn to_public(&self) -> ReportJobPublic {
        ReportJobPublic {
            report_id: self.report_id.to_string(),
            status: self.status_enum(),
            created_at: self.created_at.to_rfc3339(),
            completed_at: self.completed_at.map(|ts| ts.to_rfc3339()),
        }
    }

    pub fn lookup(&self) -> ReportLookup {
        match self.status_enum() {
            ReportStatus::Running => ReportLookup::Running,
            ReportStatus::Error => ReportLookup::Error,
            ReportStatus::Complete => match self.artifact_path.as_deref() {
                Some(path) => ReportLookup::Complete {
                    artifact_path: PathBuf::from(path),
                },
                None => {
                    tracing::warn!(report_id = %self.report_id, "complete report has no artifact path");
                    ReportLookup::Error
                }
            },
        }
    }
}

/// What a caller polling a report id gets back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportLookup {
    Running,
    Complete { artifact_path: PathBuf },
    Error,
    NotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ReportJobPublic {
    pub report_id: String,
    pub status: ReportStatus,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TriggerReportResponse {
    pub report_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ReportStatusResponse {
    pub status: ReportStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, artifact_path: Option<&str>) -> ReportJobRow {
        ReportJobRow {
            report_id: Uuid::new_v4(),
            status: status.to_string(),
            created_at: Utc::now(),
            completed_at: None,
            artifact_path: artifact_path.map(str::to_string),
        }
    }

    #[test]
    fn lookup_follows_stored_status() {
        assert_eq!(row("Running", None).lookup(), ReportLookup::Running);
        assert_eq!(row("Error", None).lookup(), ReportLookup::Error);
        assert_eq!(
            row("Complete", Some("/tmp/r.csv")).lookup(),
            ReportLookup::Complete {
                artifact_path: PathBuf::from("/tmp/r.csv")
            }
        );
    }

    #[test]
    fn complete_without_artifact_or_unknown_status_is_an_error() {
        assert_eq!(row("Complete", None).lookup(), ReportLookup::Error);
        assert_eq!(row("paused", None).status_enum(), ReportStatus::Error);
    }

    #[test]
    fn status_serializes_with_capitalized_names() {
        let body = serde_json::to_value(ReportStatusResponse {
            status: ReportStatus::Running,
        })
        .expect("json");
        assert_eq!(body, serde_json::json!({ "status": "Running" }));
    }
}
