use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ScanError;

/// Unique identifier for a scan job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct ScanJobId(pub Uuid);

impl ScanJobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScanJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScanJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ScanJobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// The closed set of scanner tools a job can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    /// Port scan (nmap).
    #[serde(alias = "nmap")]
    Portscan,
    /// Web server scan (nikto).
    #[serde(alias = "nikto")]
    Webscan,
    /// Web application fuzzing (wapiti).
    #[serde(alias = "wapiti")]
    Fuzzscan,
    /// Hidden directory brute force (ffuf).
    #[serde(alias = "hidi", alias = "ffuf")]
    Dirscan,
}

impl ScanType {
    pub const ALL: [ScanType; 4] = [
        ScanType::Portscan,
        ScanType::Webscan,
        ScanType::Fuzzscan,
        ScanType::Dirscan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::Portscan => "portscan",
            ScanType::Webscan => "webscan",
            ScanType::Fuzzscan => "fuzzscan",
            ScanType::Dirscan => "dirscan",
        }
    }

    /// Human readable label used in start messages and logs.
    pub fn label(&self) -> &'static str {
        match self {
            ScanType::Portscan => "Nmap",
            ScanType::Webscan => "Nikto",
            ScanType::Fuzzscan => "Wapiti",
            ScanType::Dirscan => "Hidi",
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanType {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "portscan" | "nmap" => Ok(ScanType::Portscan),
            "webscan" | "nikto" => Ok(ScanType::Webscan),
            "fuzzscan" | "wapiti" => Ok(ScanType::Fuzzscan),
            "dirscan" | "hidi" | "ffuf" => Ok(ScanType::Dirscan),
            other => {
                Err(ScanError::config(format!("Invalid scan type: {other}")))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
    Stopped,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invocation of a scanning tool, owned by the
/// [`JobRegistry`](super::JobRegistry).
#[derive(Debug, Clone)]
pub struct ScanJob {
    pub id: ScanJobId,
    /// Creation order within the owning registry.
    pub sequence: u64,
    pub scan_type: ScanType,
    pub target: String,
    /// Raw scan option as submitted; only portscan interprets it.
    pub option: String,
    pub status: JobStatus,
    /// Every line seen so far, in arrival order.
    pub output_lines: Vec<String>,
    /// Raw combined stdout/stderr of the scanner.
    pub output_file: PathBuf,
    /// `%Y%m%d_%H%M%S` stamp embedded in file and download names.
    pub timestamp: String,
    pub created_at: DateTime<Utc>,
    /// Set on the single terminal transition.
    pub finished_at: Option<DateTime<Utc>>,
    /// Failure reason; only `failed` jobs carry one.
    pub error: Option<String>,
}

impl ScanJob {
    pub fn summary(&self) -> ScanJobSummary {
        ScanJobSummary {
            id: self.id,
            scan_type: self.scan_type,
            target: self.target.clone(),
            option: self.option.clone(),
            status: self.status,
            line_count: self.output_lines.len(),
            output_file: self.output_file.clone(),
            timestamp: self.timestamp.clone(),
            created_at: self.created_at,
            finished_at: self.finished_at,
            error: self.error.clone(),
        }
    }
}

/// Output-free view of a job, cheap to hand out of the registry lock.
#[derive(Debug, Clone, Serialize)]
pub struct ScanJobSummary {
    pub id: ScanJobId,
    pub scan_type: ScanType,
    pub target: String,
    pub option: String,
    pub status: JobStatus,
    pub line_count: usize,
    #[serde(skip)]
    pub output_file: PathBuf,
    #[serde(skip)]
    pub timestamp: String,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Result of an incremental read of a job's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailRead {
    pub status: JobStatus,
    pub lines: Vec<String>,
    pub total: usize,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_type_accepts_tool_aliases() {
        assert_eq!("nmap".parse::<ScanType>().unwrap(), ScanType::Portscan);
        assert_eq!("hidi".parse::<ScanType>().unwrap(), ScanType::Dirscan);
        assert_eq!(
            "webscan".parse::<ScanType>().unwrap(),
            ScanType::Webscan
        );

        let parsed: ScanType = serde_json::from_str("\"wapiti\"").unwrap();
        assert_eq!(parsed, ScanType::Fuzzscan);
        assert_eq!(
            serde_json::to_string(&ScanType::Fuzzscan).unwrap(),
            "\"fuzzscan\""
        );
    }

    #[test]
    fn unknown_scan_type_is_a_config_error() {
        let err = "sqlmap".parse::<ScanType>().unwrap_err();
        assert!(matches!(err, ScanError::ScanConfig(_)));
        assert_eq!(err.to_string(), "Invalid scan type: sqlmap");
    }

    #[test]
    fn only_running_is_non_terminal() {
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Stopped.is_terminal());
    }
}
