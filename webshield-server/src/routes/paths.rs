pub const SCAN_START: &str = "/api/scan";
pub const SCAN_STATUS: &str = "/api/scan/{id}/status";
pub const SCAN_STOP: &str = "/api/scan/{id}/stop";
pub const SCAN_REPORT: &str = "/api/scan/{id}/report";
pub const SCANS: &str = "/api/scans";
pub const TOOLS: &str = "/api/tools";

/// Substitute the `{id}` segment of a scan route.
pub fn with_id(route: &str, id: impl std::fmt::Display) -> String {
    route.replace("{id}", &id.to_string())
}
