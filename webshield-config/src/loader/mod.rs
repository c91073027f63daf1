pub mod error;

use std::{fs, path::PathBuf};

use tracing::debug;
use webshield_core::scan::{ScannerSettings, settings};

use self::error::ConfigLoadError;
use crate::models::{
    Config, ConfigMetadata, CorsConfig, DEFAULT_HOST,
    DEFAULT_MAX_RETAINED_JOBS, DEFAULT_PORT, ServerConfig,
    sources::{EnvConfig, FileConfig, FileScannerConfig},
};
use crate::validation::{self, ConfigWarnings};

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] =
    ["webshield.toml", "config/webshield.toml"];

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    /// Load `.env`, read the process environment and resolve the config.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let mut load = self.load_with_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Resolve against an already gathered environment. Environment values
    /// win over the file, which wins over built-in defaults.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let mut warnings = ConfigWarnings::default();

        if config_path.is_none() {
            warnings.push_with_hint(
                "No webshield.toml detected; using defaults and environment variables",
                "Create webshield.toml or set WEBSHIELD_CONFIG to customise scanner paths",
            );
        }

        let FileConfig {
            server: file_server,
            scanner: file_scanner,
            cors: file_cors,
            dev_mode: file_dev_mode,
        } = file_config.unwrap_or_default();

        let server = ServerConfig {
            host: env
                .server_host
                .clone()
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: env.server_port.or(file_server.port).unwrap_or(DEFAULT_PORT),
        };

        let cors = CorsConfig {
            allowed_origins: env
                .cors_allowed_origins
                .clone()
                .or(file_cors.allowed_origins)
                .unwrap_or_else(default_cors_origins),
            allowed_methods: env
                .cors_allowed_methods
                .clone()
                .or(file_cors.allowed_methods)
                .unwrap_or_else(default_cors_methods),
            allowed_headers: env
                .cors_allowed_headers
                .clone()
                .or(file_cors.allowed_headers)
                .unwrap_or_else(default_cors_headers),
            allow_credentials: env
                .cors_allow_credentials
                .or(file_cors.allow_credentials)
                .unwrap_or(false),
        };

        let dev_mode = env.dev_mode.or(file_dev_mode).unwrap_or(false);

        let fuzz_report_override = env
            .fuzz_report_path
            .clone()
            .or(file_scanner.fuzz_report_path.clone());
        let dir_report_override = env
            .dir_report_path
            .clone()
            .or(file_scanner.dir_report_path.clone());

        let mut config = Config {
            server,
            scanner: resolve_scanner(&env, file_scanner),
            cors,
            dev_mode,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded: false,
            },
        };

        config
            .ensure_directories()
            .map_err(|source| ConfigLoadError::Filesystem { source })?;

        let scanner = &mut config.scanner;
        scanner.fuzz_report_path = match fuzz_report_override {
            Some(path) => path,
            None => scanner.logs_dir.join(settings::DEFAULT_FUZZ_REPORT_NAME),
        };
        scanner.dir_report_path = match dir_report_override {
            Some(path) => path,
            None => scanner.results_dir.join(settings::DEFAULT_DIR_REPORT_NAME),
        };

        warnings.extend(validation::apply_guard_rails(&config)?);

        debug!(
            results_dir = %config.scanner.results_dir.display(),
            logs_dir = %config.scanner.logs_dir.display(),
            "scanner configuration resolved"
        );
        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        // An explicitly requested file must exist; defaults are optional.
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigLoadError::MissingConfig { path });
                }
                path
            }
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists())
            {
                Some(path) => path,
                None => return Ok((None, None)),
            },
        };

        let contents =
            fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
                path: path.clone(),
                source,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| {
                ConfigLoadError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;

        Ok((Some(file_config), Some(path)))
    }
}

fn resolve_scanner(
    env: &EnvConfig,
    file: FileScannerConfig,
) -> ScannerSettings {
    let mut scanner = ScannerSettings::default();
    let tools = file.tools;

    if let Some(dir) = env.results_dir.clone().or(file.results_dir) {
        scanner.results_dir = dir;
    }
    if let Some(dir) = env.logs_dir.clone().or(file.logs_dir) {
        scanner.logs_dir = dir;
    }
    if let Some(wordlist) = env.wordlist.clone().or(file.wordlist) {
        scanner.wordlist = wordlist;
    }

    for (slot, env_value, file_value) in [
        (&mut scanner.tools.nmap, &env.nmap_path, tools.nmap),
        (&mut scanner.tools.nikto, &env.nikto_path, tools.nikto),
        (&mut scanner.tools.wapiti, &env.wapiti_path, tools.wapiti),
        (&mut scanner.tools.ffuf, &env.ffuf_path, tools.ffuf),
        (
            &mut scanner.wkhtmltopdf_path,
            &env.wkhtmltopdf_path,
            tools.wkhtmltopdf,
        ),
    ] {
        if let Some(value) = env_value.clone().or(file_value) {
            *slot = value;
        }
    }

    scanner.legacy_shell_commands = env
        .legacy_shell_commands
        .or(file.legacy_shell_commands)
        .unwrap_or(false);

    // 0 disables retention
    scanner.max_retained_jobs = match env
        .max_retained_jobs
        .or(file.max_retained_jobs)
        .unwrap_or(DEFAULT_MAX_RETAINED_JOBS)
    {
        0 => None,
        max => Some(max),
    };

    scanner
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5000".to_string(),
        "http://127.0.0.1:5000".to_string(),
    ]
}

fn default_cors_methods() -> Vec<String> {
    vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()]
}

fn default_cors_headers() -> Vec<String> {
    vec!["Content-Type".to_string()]
}
