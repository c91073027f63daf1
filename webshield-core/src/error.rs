use thiserror::Error;

use crate::scan::ScanJobId;

/// Failures surfaced by scan operations. Each variant maps to one class of
/// HTTP response in the server.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The user-supplied target failed the syntactic gate.
    #[error("{0}")]
    Target(String),

    /// Unknown scan type or an option the tool does not accept.
    #[error("{0}")]
    ScanConfig(String),

    /// Spawning, streaming or signalling a scanner process failed.
    #[error("{message}")]
    ScanExecution {
        message: String,
        /// The job that was marked failed, when one exists.
        scan_id: Option<ScanJobId>,
    },

    /// Unsupported format, missing output or a failed PDF render.
    #[error("{0}")]
    ReportGeneration(String),

    /// No job with the requested id.
    #[error("{0}")]
    NotFound(String),
}

impl ScanError {
    pub fn target(message: impl Into<String>) -> Self {
        Self::Target(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ScanConfig(message.into())
    }

    pub fn execution(
        message: impl Into<String>,
        scan_id: Option<ScanJobId>,
    ) -> Self {
        Self::ScanExecution {
            message: message.into(),
            scan_id,
        }
    }

    pub fn report(message: impl Into<String>) -> Self {
        Self::ReportGeneration(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Name of the error class, as surfaced in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::Target(_) => "TargetError",
            ScanError::ScanConfig(_) => "ScanConfigError",
            ScanError::ScanExecution { .. } => "ScanExecutionError",
            ScanError::ReportGeneration(_) => "ReportGenerationError",
            ScanError::NotFound(_) => "NotFoundError",
        }
    }

    pub fn scan_id(&self) -> Option<ScanJobId> {
        match self {
            ScanError::ScanExecution { scan_id, .. } => *scan_id,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
