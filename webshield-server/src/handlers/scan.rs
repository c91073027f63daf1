use axum::{
    Json,
    body::Body,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::{error, info};

use webshield_core::{
    report::ReportFormat,
    scan::{JobStatus, ScanJobId, ScanJobSummary, StopOutcome},
};

use crate::{
    AppState,
    errors::{AppError, AppResult},
};

const SCAN_NOT_FOUND: &str = "Scan not found";
const NO_RUNNING_SCAN: &str = "No running scan found with this ID";

#[derive(Debug, Deserialize)]
pub struct StartScanRequest {
    pub scan_type: Option<String>,
    pub target: Option<String>,
    pub scan_option: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartScanResponse {
    pub scan_id: ScanJobId,
    pub status: &'static str,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub last_line: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScanStatusResponse {
    pub status: JobStatus,
    pub new_lines: Vec<String>,
    pub line_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StopScanResponse {
    pub status: JobStatus,
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScanListResponse {
    pub scans: Vec<ScanJobSummary>,
    pub count: usize,
}

pub async fn start_scan_handler(
    State(state): State<AppState>,
    payload: Result<Json<StartScanRequest>, JsonRejection>,
) -> AppResult<Json<StartScanResponse>> {
    let Json(request) = payload?;

    let controller = state.controller().clone();
    // creates the job file and forks the scanner
    let started = tokio::task::spawn_blocking(move || {
        controller.start(
            request.scan_type.as_deref().unwrap_or_default(),
            request.target.as_deref().unwrap_or_default(),
            request.scan_option.as_deref().unwrap_or_default(),
        )
    })
    .await
    .map_err(|err| {
        AppError::internal(format!("Failed to start scan: {err}"))
    })??;

    Ok(Json(StartScanResponse {
        scan_id: started.id,
        status: "started",
        message: started.message(),
    }))
}

pub async fn scan_status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> AppResult<Json<ScanStatusResponse>> {
    let Query(query) = query?;
    let id = parse_scan_id(&id)?;
    // unparseable offsets read from the start
    let from = query
        .last_line
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let tail = state.controller().poll(&id, from)?;
    Ok(Json(ScanStatusResponse {
        status: tail.status,
        new_lines: tail.lines,
        line_count: tail.total,
        error: tail.error,
    }))
}

pub async fn stop_scan_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<StopScanResponse>> {
    let id = parse_scan_id(&id)
        .map_err(|_| AppError::not_found(NO_RUNNING_SCAN))?;

    match state.controller().stop(&id)? {
        StopOutcome::Stopped => {
            info!(scan_id = %id, "scan stopped by request");
            Ok(Json(StopScanResponse {
                status: JobStatus::Stopped,
                message: "Scan stopped successfully",
            }))
        }
        StopOutcome::NothingToStop => Err(AppError::not_found(NO_RUNNING_SCAN)),
    }
}

pub async fn scan_report_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) = query?;
    let id = parse_scan_id(&id)?;
    let format: ReportFormat =
        query.format.as_deref().unwrap_or("txt").parse()?;

    let report = state.controller().report(&id, format).await?;

    let file = tokio::fs::File::open(&report.path).await.map_err(|err| {
        error!(
            scan_id = %id,
            path = %report.path.display(),
            "failed to open report: {err}"
        );
        AppError::internal("Failed to open report")
    })?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        report.file_name
    ))
    .map_err(|_| AppError::internal("Invalid report file name"))?;

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(format.content_type()),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

pub async fn list_scans_handler(
    State(state): State<AppState>,
) -> Json<ScanListResponse> {
    let scans = state.controller().jobs();
    Json(ScanListResponse {
        count: scans.len(),
        scans,
    })
}

fn parse_scan_id(raw: &str) -> AppResult<ScanJobId> {
    raw.parse()
        .map_err(|_| AppError::not_found(SCAN_NOT_FOUND))
}
