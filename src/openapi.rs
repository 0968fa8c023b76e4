use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(title = "uptime-report-rs", description = "Location uptime report API"),
    paths(
        crate::routes::health::healthz_handler,
        crate::routes::reports::trigger_report,
        crate::routes::reports::get_report,
        crate::routes::reports::get_report_job,
    ),
    components(schemas(
        crate::routes::health::HealthResponse,
        crate::services::reports::ReportStatus,
        crate::services::reports::ReportStatusResponse,
        crate::services::reports::ReportJobPublic,
        crate::services::reports::TriggerReportResponse,
        crate::services::uptime::UptimeResult,
    )),
    tags(
        (name = "health", description = "Liveness"),
        (name = "reports", description = "Uptime report jobs")
    )
)]
pub struct ApiDoc;

pub fn openapi_json() -> serde_json::Value {
    serde_json::to_value(ApiDoc::openapi()).unwrap_or_else(|err| {
        tracing::error!(error = %err, "failed to serialize openapi document");
        serde_json::Value::Null
    })
}

async fn openapi_handler() -> Json<serde_json::Value> {
    Json(openapi_json())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_handler))
}
