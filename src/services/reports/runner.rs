use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::{StreamExt, TryStreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

use super::artifact;
use super::store::ReportJobStore;
use super::types::{ReportJobRow, ReportLookup};
use crate::config::UptimeConfig;
use crate::services::locations::{DataSourceError, LocationDataSource};
use crate::services::uptime::{compute_location_uptime, UptimeResult};

const MARK_ERROR_ATTEMPTS: u32 = 3;
const MARK_ERROR_RETRY_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, thiserror::Error)]
enum ReportFailure {
    #[error("location data unavailable: {0}")]
    Source(#[from] DataSourceError),
    #[error("report artifact not written: {0:#}")]
    Artifact(anyhow::Error),
    #[error("report task aborted: {0}")]
    Aborted(String),
}

impl ReportFailure {
    fn code(&self) -> &'static str {
        match self {
            ReportFailure::Source(_) => "data_source",
            ReportFailure::Artifact(_) => "artifact",
            ReportFailure::Aborted(_) => "aborted",
        }
    }
}

struct ReportSummary {
    artifact_path: PathBuf,
    reference_instant: DateTime<Utc>,
    locations: usize,
}

/// Runs report jobs in the background and answers status lookups.
pub struct ReportJobService {
    source: Arc<dyn LocationDataSource>,
    jobs: Arc<dyn ReportJobStore>,
    output_dir: PathBuf,
    default_tz: Tz,
    location_concurrency: usize,
}

impl ReportJobService {
    pub fn new(
        source: Arc<dyn LocationDataSource>,
        jobs: Arc<dyn ReportJobStore>,
        config: &UptimeConfig,
    ) -> Self {
        Self {
            source,
            jobs,
            output_dir: config.report_output_path.clone(),
            default_tz: config.default_timezone,
            location_concurrency: config.report_location_concurrency.max(1),
        }
    }

    /// Records a running job and starts generating it. Returns as soon as the
    /// job is persisted; the id is immediately pollable.
    pub async fn trigger_job(self: &Arc<Self>) -> Result<Uuid, sqlx::Error> {
        let report_id = Uuid::new_v4();
        self.jobs.create_running(report_id).await?;

        let service = self.clone();
        let span = tracing::info_span!("report_job", report_id = %report_id);
        tokio::spawn(service.run_one(report_id).instrument(span));

        Ok(report_id)
    }

    pub async fn get_job_status(&self, report_id: Uuid) -> Result<ReportLookup, sqlx::Error> {
        Ok(self
            .jobs
            .get(report_id)
            .await?
            .map(|row| row.lookup())
            .unwrap_or(ReportLookup::NotFound))
    }

    pub async fn get_job(&self, report_id: Uuid) -> Result<Option<ReportJobRow>, sqlx::Error> {
        self.jobs.get(report_id).await
    }

    async fn run_one(self: Arc<Self>, report_id: Uuid) {
        let started = Instant::now();
        tracing::info!(phase = "runner_start", "report generation started");

        // The body runs in its own task so a panic still ends in a terminal state.
        let worker = self.clone();
        let outcome = match tokio::spawn(
            async move { worker.execute(report_id).await }.in_current_span(),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(err) => Err(ReportFailure::Aborted(err.to_string())),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let summary = match outcome {
            Ok(summary) => summary,
            Err(failure) => {
                self.record_error(report_id).await;
                tracing::warn!(
                    phase = "runner_complete",
                    status = "Error",
                    duration_ms,
                    error_code = failure.code(),
                    error_message = %failure,
                    "report generation finished"
                );
                return;
            }
        };

        match self
            .jobs
            .mark_complete(report_id, &summary.artifact_path)
            .await
        {
            Ok(applied) => {
                if !applied {
                    tracing::warn!("report job already terminal; completion ignored");
                }
                tracing::info!(
                    phase = "runner_complete",
                    status = "Complete",
                    duration_ms,
                    locations = summary.locations,
                    reference_instant = %summary.reference_instant.to_rfc3339(),
                    artifact = %summary.artifact_path.display(),
                    "report generation finished"
                );
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to record report completion");
                if let Err(err) = tokio::fs::remove_file(&summary.artifact_path).await {
                    tracing::warn!(
                        error = %err,
                        artifact = %summary.artifact_path.display(),
                        "failed to remove orphaned report artifact"
                    );
                }
                self.record_error(report_id).await;
                tracing::warn!(
                    phase = "runner_complete",
                    status = "Error",
                    duration_ms,
                    error_code = "status_store",
                    "report generation finished"
                );
            }
        }
    }

    /// Moves the job to Error, retrying while the status store is unavailable.
    async fn record_error(&self, report_id: Uuid) {
        for attempt in 1..=MARK_ERROR_ATTEMPTS {
            match self.jobs.mark_error(report_id).await {
                Ok(true) => return,
                Ok(false) => {
                    tracing::warn!("report job already terminal; failure ignored");
                    return;
                }
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "failed to record report error");
                    if attempt < MARK_ERROR_ATTEMPTS {
                        tokio::time::sleep(MARK_ERROR_RETRY_DELAY * attempt).await;
                    }
                }
            }
        }
        tracing::error!(
            attempts = MARK_ERROR_ATTEMPTS,
            "report job status could not be recorded; it stays Running"
        );
    }

    async fn execute(&self, report_id: Uuid) -> Result<ReportSummary, ReportFailure> {
        let reference_instant = self.reference_instant().await?;
        let location_ids = self.source.list_all_location_ids().await?;
        tracing::info!(
            phase = "compute",
            locations = location_ids.len(),
            reference_instant = %reference_instant.to_rfc3339(),
            "computing location uptime"
        );

        let rows = self
            .compute_rows(&location_ids, reference_instant)
            .await?;
        let locations = rows.len();

        let artifact_path = artifact::write_report(&self.output_dir, report_id, rows)
            .await
            .map_err(ReportFailure::Artifact)?;

        Ok(ReportSummary {
            artifact_path,
            reference_instant,
            locations,
        })
    }

    /// The latest observation across all locations, or the wall clock when
    /// there are none. Read once per job.
    async fn reference_instant(&self) -> Result<DateTime<Utc>, DataSourceError> {
        Ok(self
            .source
            .max_observed_timestamp()
            .await?
            .unwrap_or_else(Utc::now))
    }

    async fn compute_rows(
        &self,
        location_ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<Vec<UptimeResult>, DataSourceError> {
        let source = self.source.as_ref();
        let default_tz = self.default_tz;
        futures::stream::iter(location_ids.iter().cloned())
            .map(|location_id| async move {
                compute_location_uptime(source, &location_id, now, default_tz).await
            })
            .buffered(self.location_concurrency)
            .try_collect()
            .await
    }
}
