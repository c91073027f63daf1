pub mod paths;

use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    AppState,
    handlers::{
        scan::{
            list_scans_handler, scan_report_handler, scan_status_handler,
            start_scan_handler, stop_scan_handler,
        },
        tools::tools_handler,
    },
};

/// Scan and tool routes under `/api`.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route(paths::SCAN_START, post(start_scan_handler))
        .route(paths::SCAN_STATUS, get(scan_status_handler))
        .route(paths::SCAN_STOP, post(stop_scan_handler))
        .route(paths::SCAN_REPORT, get(scan_report_handler))
        .route(paths::SCANS, get(list_scans_handler))
        .route(paths::TOOLS, get(tools_handler))
}
