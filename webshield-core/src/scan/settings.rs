use std::path::{Path, PathBuf};

use super::job::ScanType;

pub const DEFAULT_WORDLIST: &str = "/usr/share/wordlists/dirb/common.txt";
pub const DEFAULT_FUZZ_REPORT_NAME: &str = "wapiti_report";
pub const DEFAULT_DIR_REPORT_NAME: &str = "dirResult.html";

/// Executable names or paths for each scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub nmap: String,
    pub nikto: String,
    pub wapiti: String,
    pub ffuf: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            nmap: "nmap".to_string(),
            nikto: "nikto".to_string(),
            wapiti: "wapiti".to_string(),
            ffuf: "ffuf".to_string(),
        }
    }
}

impl ToolPaths {
    pub fn binary(&self, scan_type: ScanType) -> &str {
        match scan_type {
            ScanType::Portscan => &self.nmap,
            ScanType::Webscan => &self.nikto,
            ScanType::Fuzzscan => &self.wapiti,
            ScanType::Dirscan => &self.ffuf,
        }
    }
}

/// Runtime settings for the scan pipeline, resolved by the config crate.
#[derive(Debug, Clone)]
pub struct ScannerSettings {
    /// Per-job output logs, rendered reports and ffuf output.
    pub results_dir: PathBuf,
    /// Wapiti report output.
    pub logs_dir: PathBuf,
    pub tools: ToolPaths,
    pub wordlist: PathBuf,
    pub fuzz_report_path: PathBuf,
    pub dir_report_path: PathBuf,
    /// Build the wapiti and ffuf commands as `sh -c` strings with the target
    /// interpolated verbatim. Injection-prone; off unless explicitly set.
    pub legacy_shell_commands: bool,
    /// Upper bound on jobs kept in memory; `None` keeps every job.
    pub max_retained_jobs: Option<usize>,
    pub wkhtmltopdf_path: String,
}

impl ScannerSettings {
    /// Defaults rooted at `root`: `<root>/results` and `<root>/logs`.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let results_dir = root.join("results");
        let logs_dir = root.join("logs");
        Self {
            fuzz_report_path: logs_dir.join(DEFAULT_FUZZ_REPORT_NAME),
            dir_report_path: results_dir.join(DEFAULT_DIR_REPORT_NAME),
            results_dir,
            logs_dir,
            tools: ToolPaths::default(),
            wordlist: PathBuf::from(DEFAULT_WORDLIST),
            legacy_shell_commands: false,
            max_retained_jobs: None,
            wkhtmltopdf_path: "wkhtmltopdf".to_string(),
        }
    }

    /// Note appended to a job's output once its tool wrote a native report.
    pub fn completion_note(&self, scan_type: ScanType) -> Option<String> {
        match scan_type {
            ScanType::Fuzzscan => Some(format!(
                "Wapiti scan completed. Check {} for full report.",
                self.fuzz_report_path.display()
            )),
            ScanType::Dirscan => Some(format!(
                "Hidi scan completed. Check {} for full report.",
                self.dir_report_path.display()
            )),
            ScanType::Portscan | ScanType::Webscan => None,
        }
    }
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self::with_root(".")
    }
}
