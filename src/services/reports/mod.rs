mod artifact;
mod runner;
mod store;
mod types;

pub use artifact::{artifact_path, REPORT_HEADER};
pub use runner::ReportJobService;
pub use store::{InMemoryReportJobStore, PgReportJobStore, ReportJobStore};
pub use types::{
    ReportJobPublic, ReportJobRow, ReportLookup, ReportStatus, ReportStatusResponse,
    TriggerReportResponse,
};
