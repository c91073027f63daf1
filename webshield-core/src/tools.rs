//! Availability of the external binaries the scanner shells out to.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use crate::scan::{ScanType, ScannerSettings};

#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub name: &'static str,
    pub command: String,
    /// Scan type the tool backs; `None` for report tooling.
    pub scan_type: Option<ScanType>,
    pub path: Option<PathBuf>,
    pub available: bool,
}

/// Resolve every configured tool on `PATH` (or as a direct path).
pub fn probe_tools(settings: &ScannerSettings) -> Vec<ToolStatus> {
    let mut tools: Vec<ToolStatus> = ScanType::ALL
        .iter()
        .map(|scan_type| {
            probe(
                scan_type.label(),
                settings.tools.binary(*scan_type),
                Some(*scan_type),
            )
        })
        .collect();
    tools.push(probe("wkhtmltopdf", &settings.wkhtmltopdf_path, None));
    tools
}

/// Log the probe result once at startup. Missing tools only disable the
/// scan types that need them.
pub fn log_tool_availability(tools: &[ToolStatus]) {
    for tool in tools {
        match (&tool.path, tool.scan_type) {
            (Some(path), _) => {
                info!(
                    tool = tool.name,
                    path = %path.display(),
                    "scanner tool available"
                )
            }
            (None, Some(scan_type)) => warn!(
                tool = tool.name,
                command = %tool.command,
                scan_type = %scan_type,
                "scanner tool not found; scans of this type will fail"
            ),
            (None, None) => warn!(
                tool = tool.name,
                command = %tool.command,
                "report tool not found; PDF reports will not work"
            ),
        }
    }
}

fn probe(
    name: &'static str,
    command: &str,
    scan_type: Option<ScanType>,
) -> ToolStatus {
    let path = which::which(command).ok();
    ToolStatus {
        name,
        command: command.to_string(),
        scan_type,
        available: path.is_some(),
        path,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn probe_reports_each_tool_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = ScannerSettings::with_root(dir.path());
        settings.tools.nmap = "sh".to_string();
        settings.tools.nikto =
            dir.path().join("definitely-missing").display().to_string();

        let tools = probe_tools(&settings);
        assert_eq!(tools.len(), 5);

        let nmap = &tools[0];
        assert_eq!(nmap.scan_type, Some(ScanType::Portscan));
        assert!(nmap.available);
        assert!(nmap.path.is_some());

        let nikto = &tools[1];
        assert!(!nikto.available);
        assert_eq!(tools[4].name, "wkhtmltopdf");
        assert_eq!(tools[4].scan_type, None);
    }
}
