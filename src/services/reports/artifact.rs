use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::services::uptime::UptimeResult;

pub const REPORT_HEADER: [&str; 7] = [
    "location_id",
    "uptime_last_hour",
    "uptime_last_day",
    "uptime_last_week",
    "downtime_last_hour",
    "downtime_last_day",
    "downtime_last_week",
];

pub fn artifact_path(output_dir: &Path, report_id: Uuid) -> PathBuf {
    output_dir.join(format!("{report_id}.csv"))
}

/// Writes the report CSV next to its final location and renames it into
/// place, so a reader never sees a half-written artifact.
pub async fn write_report(
    output_dir: &Path,
    report_id: Uuid,
    rows: Vec<UptimeResult>,
) -> Result<PathBuf> {
    let output_dir = output_dir.to_path_buf();
    tokio::task::spawn_blocking(move || write_report_blocking(&output_dir, report_id, &rows))
        .await
        .context("report writer task failed")?
}

fn write_report_blocking(
    output_dir: &Path,
    report_id: Uuid,
    rows: &[UptimeResult],
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create report dir {}", output_dir.display()))?;
    let final_path = artifact_path(output_dir, report_id);
    let staging = tempfile::NamedTempFile::new_in(output_dir)
        .with_context(|| format!("failed to stage report in {}", output_dir.display()))?;

    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(staging.as_file());
        writer.write_record(REPORT_HEADER)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    staging.as_file().sync_all()?;

    staging
        .persist(&final_path)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to persist report {}", final_path.display()))?;
    Ok(final_path)
}
