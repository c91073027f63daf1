use std::{
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    time::Duration,
};

use axum_test::TestServer;
use serde_json::Value;
use tempfile::TempDir;
use webshield_config::{ConfigLoader, EnvConfig};
use webshield_core::scan::GroupSignaller;
use webshield_server::{AppState, infra::app::create_app, routes::paths};

// Code is used by test modules, but not in this scope
#[allow(unused)]
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub root: TempDir,
}

/// Write an executable shell script standing in for a scanner binary.
pub fn mock_scanner(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))
        .expect("write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("chmod script");
    path
}

/// App whose nmap is the given script body; every other tool is missing.
pub fn build_test_app(nmap_body: &str) -> TestApp {
    build(nmap_body, None)
}

/// Like [`build_test_app`], with stop requests routed through `signaller`.
#[allow(unused)]
pub fn build_test_app_with_signaller(
    nmap_body: &str,
    signaller: GroupSignaller,
) -> TestApp {
    build(nmap_body, Some(signaller))
}

fn build(nmap_body: &str, signaller: Option<GroupSignaller>) -> TestApp {
    let root = tempfile::tempdir().expect("tempdir");
    let nmap = mock_scanner(root.path(), "mock-nmap", nmap_body);
    let missing = root.path().join("missing").display().to_string();

    let env = EnvConfig {
        results_dir: Some(root.path().join("results")),
        logs_dir: Some(root.path().join("logs")),
        nmap_path: Some(nmap.display().to_string()),
        nikto_path: Some(missing.clone()),
        wapiti_path: Some(missing.clone()),
        ffuf_path: Some(missing.clone()),
        wkhtmltopdf_path: Some(missing),
        ..EnvConfig::default()
    };
    let load = ConfigLoader::new()
        .load_with_env(env)
        .expect("load test config");

    let mut state = AppState::new(load.config);
    if let Some(signaller) = signaller {
        state.controller = state.controller.clone().with_signaller(signaller);
    }
    let server =
        TestServer::new(create_app(state.clone())).expect("test server");

    TestApp {
        server,
        state,
        root,
    }
}

/// Poll the status route until the scan leaves `running`.
#[allow(unused)]
pub async fn wait_for_terminal(server: &TestServer, scan_id: &str) -> Value {
    let route = paths::with_id(paths::SCAN_STATUS, scan_id);
    for _ in 0..250 {
        let body: Value = server.get(&route).await.json();
        if body["status"] != "running" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("scan {scan_id} never finished");
}
