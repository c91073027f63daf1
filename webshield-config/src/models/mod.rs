pub mod sources;

use std::path::PathBuf;

use webshield_core::scan::ScannerSettings;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_RETAINED_JOBS: usize = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub scanner: ScannerSettings,
    pub cors: CorsConfig,
    pub dev_mode: bool,
    pub metadata: ConfigMetadata,
}

impl Config {
    /// Create the scanner output directories and pin them to absolute paths
    /// so reports and job files do not depend on the working directory.
    pub fn ensure_directories(&mut self) -> std::io::Result<()> {
        let scanner = &mut self.scanner;
        std::fs::create_dir_all(&scanner.results_dir)?;
        std::fs::create_dir_all(&scanner.logs_dir)?;
        scanner.results_dir = std::fs::canonicalize(&scanner.results_dir)?;
        scanner.logs_dir = std::fs::canonicalize(&scanner.logs_dir)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
}

impl CorsConfig {
    pub fn is_wildcard_included(&self) -> bool {
        self.allowed_origins
            .iter()
            .any(|origin| origin.trim() == "*")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
