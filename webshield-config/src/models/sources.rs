use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::util::{parse_bool, parse_csv};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub scanner: FileScannerConfig,
    #[serde(default)]
    pub cors: FileCorsConfig,
    pub dev_mode: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileScannerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wordlist: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuzz_report_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir_report_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_shell_commands: Option<bool>,
    /// `0` disables retention.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retained_jobs: Option<usize>,
    #[serde(default)]
    pub tools: FileToolsConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileToolsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nmap: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nikto: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wapiti: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffuf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wkhtmltopdf: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCorsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_origins: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_methods: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_headers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_credentials: Option<bool>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub results_dir: Option<PathBuf>,
    pub logs_dir: Option<PathBuf>,
    pub nmap_path: Option<String>,
    pub nikto_path: Option<String>,
    pub wapiti_path: Option<String>,
    pub ffuf_path: Option<String>,
    pub wkhtmltopdf_path: Option<String>,
    pub wordlist: Option<PathBuf>,
    pub fuzz_report_path: Option<PathBuf>,
    pub dir_report_path: Option<PathBuf>,
    pub legacy_shell_commands: Option<bool>,
    pub max_retained_jobs: Option<usize>,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub cors_allowed_methods: Option<Vec<String>>,
    pub cors_allowed_headers: Option<Vec<String>>,
    pub cors_allow_credentials: Option<bool>,
    pub dev_mode: Option<bool>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let path = |key: &str| var(key).map(PathBuf::from);
        let flag = |key: &str| var(key).and_then(|raw| parse_bool(&raw));
        let list = |key: &str| var(key).map(|raw| parse_csv(&raw));

        Self {
            config_path: path("WEBSHIELD_CONFIG"),
            server_host: var("SERVER_HOST"),
            server_port: var("SERVER_PORT")
                .or_else(|| var("PORT"))
                .and_then(|s| s.trim().parse().ok()),
            results_dir: path("RESULTS_DIR"),
            logs_dir: path("LOGS_DIR"),
            nmap_path: var("NMAP_PATH"),
            nikto_path: var("NIKTO_PATH"),
            wapiti_path: var("WAPITI_PATH"),
            ffuf_path: var("FFUF_PATH"),
            wkhtmltopdf_path: var("WKHTMLTOPDF_PATH"),
            wordlist: path("WORDLIST_PATH"),
            fuzz_report_path: path("WAPITI_REPORT_PATH"),
            dir_report_path: path("FFUF_REPORT_PATH"),
            legacy_shell_commands: flag("LEGACY_SHELL_COMMANDS"),
            max_retained_jobs: var("MAX_RETAINED_JOBS")
                .and_then(|s| s.trim().parse().ok()),
            cors_allowed_origins: list("CORS_ALLOWED_ORIGINS"),
            cors_allowed_methods: list("CORS_ALLOWED_METHODS"),
            cors_allowed_headers: list("CORS_ALLOWED_HEADERS"),
            cors_allow_credentials: flag("CORS_ALLOW_CREDENTIALS"),
            dev_mode: flag("DEV_MODE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> EnvConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn server_port_prefers_explicit_variable() {
        let config = env(&[("SERVER_PORT", "8080"), ("PORT", "9090")]);
        assert_eq!(config.server_port, Some(8080));

        let config = env(&[("PORT", "9090")]);
        assert_eq!(config.server_port, Some(9090));

        let config = env(&[("SERVER_PORT", "not-a-port")]);
        assert_eq!(config.server_port, None);
    }

    #[test]
    fn blank_values_are_unset() {
        let config = env(&[("NMAP_PATH", "  "), ("RESULTS_DIR", "")]);
        assert!(config.nmap_path.is_none());
        assert!(config.results_dir.is_none());
    }

    #[test]
    fn lists_and_flags_are_parsed() {
        let config = env(&[
            ("CORS_ALLOWED_ORIGINS", "http://a.test, http://b.test"),
            ("LEGACY_SHELL_COMMANDS", "on"),
            ("MAX_RETAINED_JOBS", "0"),
        ]);
        assert_eq!(
            config.cors_allowed_origins,
            Some(vec!["http://a.test".into(), "http://b.test".into()])
        );
        assert_eq!(config.legacy_shell_commands, Some(true));
        assert_eq!(config.max_retained_jobs, Some(0));
    }
}
