use crate::config::UptimeConfig;
use crate::services::reports::ReportJobService;
use axum::extract::FromRef;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: UptimeConfig,
    pub reports: Arc<ReportJobService>,
}

impl FromRef<AppState> for Arc<ReportJobService> {
    fn from_ref(state: &AppState) -> Arc<ReportJobService> {
        state.reports.clone()
    }
}
