use crate::config::UptimeConfig;
use crate::services::locations::InMemoryLocationData;
use crate::services::reports::{InMemoryReportJobStore, ReportJobService};
use crate::services::uptime::DEFAULT_TIMEZONE;
use crate::state::AppState;
use std::path::Path;
use std::sync::Arc;

pub fn test_config(report_output_path: &Path) -> UptimeConfig {
    UptimeConfig {
        database_url: "postgresql://postgres@localhost/uptime".to_string(),
        data_root: report_output_path.to_path_buf(),
        report_output_path: report_output_path.to_path_buf(),
        default_timezone: DEFAULT_TIMEZONE,
        report_location_concurrency: 2,
    }
}

/// App state backed by in-memory stores; reports land in `report_output_path`.
pub fn test_state(data: InMemoryLocationData, report_output_path: &Path) -> AppState {
    let config = test_config(report_output_path);
    let reports = Arc::new(ReportJobService::new(
        Arc::new(data),
        Arc::new(InMemoryReportJobStore::new()),
        &config,
    ));
    AppState { config, reports }
}
