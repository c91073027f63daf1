use std::{fmt, sync::Arc};

use webshield_config::Config;
use webshield_core::scan::JobController;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub controller: JobController,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire the scan pipeline from a resolved configuration.
    pub fn new(config: Config) -> Self {
        let controller = JobController::new(config.scanner.clone());
        Self {
            config: Arc::new(config),
            controller,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn controller(&self) -> &JobController {
        &self.controller
    }
}
