use axum::{Json, extract::State};
use serde::Serialize;

use webshield_core::tools::{ToolStatus, probe_tools};

use crate::{
    AppState,
    errors::{AppError, AppResult},
};

#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub tools: Vec<ToolStatus>,
    pub all_available: bool,
}

pub async fn tools_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ToolsResponse>> {
    let settings = state.controller().settings().clone();
    // PATH lookups touch the filesystem
    let tools = tokio::task::spawn_blocking(move || probe_tools(&settings))
        .await
        .map_err(|err| {
            AppError::internal(format!("Tool probe failed: {err}"))
        })?;

    Ok(Json(ToolsResponse {
        all_available: tools.iter().all(|tool| tool.available),
        tools,
    }))
}
