use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{Value, json};
use tracing::debug;

use crate::AppState;

pub async fn ping_handler() -> Json<Value> {
    debug!("Ping endpoint called");
    Json(json!({
        "status": "ok",
        "message": "WebShield Scanner is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn health_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<Value>) {
    let controller = state.controller();
    let settings = controller.settings();

    let mut health_status = json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {
            "scans": {
                "running": controller.running_count(),
                "retained": controller.jobs().len(),
            }
        }
    });

    let mut is_unhealthy = false;
    for (name, dir) in [
        ("results_dir", &settings.results_dir),
        ("logs_dir", &settings.logs_dir),
    ] {
        let healthy = tokio::fs::metadata(dir)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        health_status["checks"][name] = json!({
            "status": if healthy { "healthy" } else { "unhealthy" },
            "path": dir.display().to_string(),
        });
        is_unhealthy |= !healthy;
    }

    if is_unhealthy {
        health_status["status"] = json!("unhealthy");
        (StatusCode::SERVICE_UNAVAILABLE, Json(health_status))
    } else {
        (StatusCode::OK, Json(health_status))
    }
}
