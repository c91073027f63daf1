#![cfg(unix)]

use axum::http::StatusCode;
use serde_json::{Value, json};
use webshield_server::routes::paths;

#[path = "support/mod.rs"]
mod support;

use support::{
    build_test_app, build_test_app_with_signaller, wait_for_terminal,
};

const THREE_LINES: &str = concat!(
    r#"echo "Nmap scan report for $1"; "#,
    r#"echo "80/tcp open http"; "#,
    r#"echo "Nmap done""#,
);

async fn start_portscan(
    server: &axum_test::TestServer,
    target: &str,
) -> String {
    let response = server
        .post(paths::SCAN_START)
        .json(&json!({
            "scan_type": "portscan",
            "target": target,
            "scan_option": "open_ports"
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "started");
    body["scan_id"].as_str().expect("scan_id").to_string()
}

#[tokio::test]
async fn scan_output_is_polled_incrementally() {
    let app = build_test_app(THREE_LINES);
    let scan_id = start_portscan(&app.server, "example.com").await;

    let body = wait_for_terminal(&app.server, &scan_id).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(
        body["new_lines"],
        json!([
            "Nmap scan report for example.com",
            "80/tcp open http",
            "Nmap done"
        ])
    );
    assert_eq!(body["line_count"], 3);
    assert!(body.get("error").is_none());

    let response = app
        .server
        .get(&paths::with_id(paths::SCAN_STATUS, &scan_id))
        .add_query_param("last_line", 3)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["new_lines"], json!([]));
    assert_eq!(body["line_count"], 3);

    let body: Value = app.server.get(paths::SCANS).await.json();
    assert_eq!(body["count"], 1);
    assert_eq!(body["scans"][0]["id"], scan_id.as_str());
    assert_eq!(body["scans"][0]["scan_type"], "portscan");
}

#[tokio::test]
async fn start_message_names_the_scan() {
    let app = build_test_app(THREE_LINES);
    let response = app
        .server
        .post(paths::SCAN_START)
        .json(&json!({
            "scan_type": "nmap",
            "target": "10.0.0.1",
            "scan_option": "version_detection"
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["message"], "Portscan scan started for 10.0.0.1");
}

#[tokio::test]
async fn short_target_is_rejected_without_creating_a_job() {
    let app = build_test_app(THREE_LINES);

    let response = app
        .server
        .post(paths::SCAN_START)
        .json(&json!({
            "scan_type": "portscan",
            "target": "ab",
            "scan_option": "open_ports"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body, json!({"error": "Target is too short"}));

    let body: Value = app.server.get(paths::SCANS).await.json();
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn invalid_requests_return_json_errors() {
    let app = build_test_app(THREE_LINES);

    let cases = [
        (
            json!({"scan_type": "portscan"}),
            "Target is required",
        ),
        (
            json!({"scan_type": "sqlmap", "target": "example.com"}),
            "Invalid scan type: sqlmap",
        ),
        (
            json!({
                "scan_type": "portscan",
                "target": "example.com",
                "scan_option": "udp"
            }),
            "Invalid scan option for Nmap: udp",
        ),
        (
            json!({"scan_type": "portscan", "target": "localhost"}),
            "Target does not appear to be a valid domain or IP address",
        ),
    ];

    for (payload, message) in cases {
        let response = app.server.post(paths::SCAN_START).json(&payload).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], message, "{payload}");
    }

    let response = app
        .server
        .post(paths::SCAN_START)
        .json(&json!({"target": 42}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unknown_scans_are_not_found() {
    let app = build_test_app(THREE_LINES);
    let unknown = "8d1f1f0e-3c55-4a6e-9a55-0b4f6c0c2b11";

    for id in [unknown, "not-a-uuid"] {
        let response = app
            .server
            .get(&paths::with_id(paths::SCAN_STATUS, id))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body, json!({"error": "Scan not found"}));
    }

    let response = app
        .server
        .post(&paths::with_id(paths::SCAN_STOP, unknown))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = app
        .server
        .get(&paths::with_id(paths::SCAN_REPORT, unknown))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn running_scan_can_be_stopped_once() {
    let app = build_test_app(r#"echo "scanning $1"; sleep 30"#);
    let scan_id = start_portscan(&app.server, "example.com").await;
    let stop_route = paths::with_id(paths::SCAN_STOP, &scan_id);

    let response = app.server.post(&stop_route).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        body,
        json!({"status": "stopped", "message": "Scan stopped successfully"})
    );

    let body: Value = app
        .server
        .get(&paths::with_id(paths::SCAN_STATUS, &scan_id))
        .await
        .json();
    assert_eq!(body["status"], "stopped");

    let response = app.server.post(&stop_route).await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body, json!({"error": "No running scan found with this ID"}));
}

#[tokio::test]
async fn failed_stop_is_a_server_error() {
    let app = build_test_app_with_signaller("echo begin; sleep 1", |_| {
        Err("operation not permitted".to_string())
    });
    let scan_id = start_portscan(&app.server, "example.com").await;

    let response = app
        .server
        .post(&paths::with_id(paths::SCAN_STOP, &scan_id))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(
        body,
        json!({"error": "Failed to stop scan: operation not permitted"})
    );

    let body: Value = app
        .server
        .get(&paths::with_id(paths::SCAN_STATUS, &scan_id))
        .await
        .json();
    assert_eq!(body["status"], "failed");
    assert_eq!(body["error"], "Failed to stop scan: operation not permitted");
}

#[tokio::test]
async fn failing_scanner_reports_exit_code() {
    let app = build_test_app("echo partial output; exit 2");
    let scan_id = start_portscan(&app.server, "example.com").await;

    let body = wait_for_terminal(&app.server, &scan_id).await;
    assert_eq!(body["status"], "failed");
    assert_eq!(body["new_lines"], json!(["partial output"]));
    assert_eq!(body["error"], "Process exited with code 2");
}

#[tokio::test]
async fn missing_scanner_binary_is_a_server_error() {
    let app = build_test_app(THREE_LINES);

    let response = app
        .server
        .post(paths::SCAN_START)
        .json(&json!({"scan_type": "webscan", "target": "example.com"}))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert!(
        body["error"]
            .as_str()
            .expect("error message")
            .contains("failed to spawn")
    );

    let body: Value = app.server.get(paths::SCANS).await.json();
    assert_eq!(body["count"], 1);
    assert_eq!(body["scans"][0]["status"], "failed");
}

#[tokio::test]
async fn reports_download_as_attachments() {
    let app = build_test_app(THREE_LINES);
    let scan_id = start_portscan(&app.server, "example.com").await;
    wait_for_terminal(&app.server, &scan_id).await;
    let route = paths::with_id(paths::SCAN_REPORT, &scan_id);

    let response = app.server.get(&route).await;
    response.assert_status_ok();
    let disposition = response.header("content-disposition");
    let disposition = disposition.to_str().expect("ascii header");
    assert!(disposition.starts_with("attachment; filename=\"portscan_"));
    assert!(disposition.ends_with(".txt\""));
    assert_eq!(
        response.text(),
        "Nmap scan report for example.com\n80/tcp open http\nNmap done\n"
    );

    let response = app
        .server
        .get(&route)
        .add_query_param("format", "html")
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.header("content-type").to_str().expect("ascii header"),
        "text/html; charset=utf-8"
    );
    assert!(response.text().contains("80/tcp open http"));

    let response = app
        .server
        .get(&route)
        .add_query_param("format", "docx")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Unsupported report format: docx");

    let response = app
        .server
        .get(&route)
        .add_query_param("format", "pdf")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(
        body["error"]
            .as_str()
            .expect("error message")
            .starts_with("PDF generation requires")
    );
}
