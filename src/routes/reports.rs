use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{internal_error, map_db_error, not_found, HandlerError};
use crate::services::reports::{
    ReportJobPublic, ReportLookup, ReportStatus, ReportStatusResponse, TriggerReportResponse,
};
use crate::state::AppState;

const REPORT_NOT_FOUND: &str = "Report not found";

#[derive(Debug, Deserialize)]
pub(crate) struct GetReportQuery {
    report_id: Option<String>,
}

fn parse_report_id(raw: Option<&str>) -> Result<Uuid, HandlerError> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| Uuid::parse_str(value).ok())
        .ok_or_else(|| not_found(REPORT_NOT_FOUND))
}

#[utoipa::path(
    post,
    path = "/api/trigger_report",
    tag = "reports",
    responses(
        (status = 200, description = "Report generation started", body = TriggerReportResponse)
    )
)]
pub(crate) async fn trigger_report(
    State(state): State<AppState>,
) -> Result<Json<TriggerReportResponse>, HandlerError> {
    let report_id = state.reports.trigger_job().await.map_err(map_db_error)?;
    tracing::info!(report_id = %report_id, "report triggered");
    Ok(Json(TriggerReportResponse {
        report_id: report_id.to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/get_report",
    tag = "reports",
    params(
        ("report_id" = String, Query, description = "Report id returned by trigger_report")
    ),
    responses(
        (
            status = 200,
            description = "Report CSV when complete, otherwise the Running or Error status",
            content(("text/csv" = String), ("application/json" = ReportStatusResponse))
        ),
        (status = 404, description = "Report or report file not found")
    )
)]
pub(crate) async fn get_report(
    State(state): State<AppState>,
    Query(query): Query<GetReportQuery>,
) -> Result<Response, HandlerError> {
    let report_id = parse_report_id(query.report_id.as_deref())?;

    match state
        .reports
        .get_job_status(report_id)
        .await
        .map_err(map_db_error)?
    {
        ReportLookup::NotFound => Err(not_found(REPORT_NOT_FOUND)),
        ReportLookup::Running => Ok(status_response(ReportStatus::Running)),
        ReportLookup::Error => Ok(status_response(ReportStatus::Error)),
        ReportLookup::Complete { artifact_path } => {
            let bytes = match tokio::fs::read(&artifact_path).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(
                        report_id = %report_id,
                        path = %artifact_path.display(),
                        error = %err,
                        "report artifact unreadable"
                    );
                    return Err(not_found("Report file not found"));
                }
            };
            csv_attachment(bytes, &format!("report_{report_id}.csv"))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/reports/{report_id}",
    tag = "reports",
    params(
        ("report_id" = String, Path, description = "Report id (uuid)")
    ),
    responses(
        (status = 200, description = "Report job record", body = ReportJobPublic),
        (status = 404, description = "Not found")
    )
)]
pub(crate) async fn get_report_job(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> Result<Json<ReportJobPublic>, HandlerError> {
    let report_id = parse_report_id(Some(&report_id))?;
    let row = state
        .reports
        .get_job(report_id)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| not_found(REPORT_NOT_FOUND))?;
    Ok(Json(row.to_public()))
}

fn status_response(status: ReportStatus) -> Response {
    Json(ReportStatusResponse { status }).into_response()
}

fn csv_attachment(bytes: Vec<u8>, filename: &str) -> Result<Response, HandlerError> {
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    let content_disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        filename.replace('"', "_")
    ))
    .map_err(internal_error)?;
    response
        .headers_mut()
        .insert(header::CONTENT_DISPOSITION, content_disposition);
    Ok(response)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trigger_report", post(trigger_report))
        .route("/get_report", get(get_report))
        .route("/reports/{report_id}", get(get_report_job))
}
