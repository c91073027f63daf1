//! Shared configuration library for WebShield.
//!
//! Resolves the server and scanner settings from built-in defaults, an
//! optional `webshield.toml`, a `.env` file and the process environment,
//! then applies guard rails and collects startup warnings.

pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{
    ConfigLoad, ConfigLoader, ConfigLoaderOptions, error::ConfigLoadError,
};
pub use models::sources::{EnvConfig, FileConfig};
pub use models::{Config, ConfigMetadata, CorsConfig, ServerConfig};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
