//! Scan job lifecycle: validation, command construction, the job registry
//! and process supervision.

pub mod command;
pub mod controller;
pub mod job;
pub mod registry;
pub mod settings;
pub mod supervisor;
pub mod target;

pub use command::{CommandBuilder, CommandSpec};
pub use controller::{JobController, StartedScan, StopOutcome};
pub use job::{
    JobStatus, ScanJob, ScanJobId, ScanJobSummary, ScanType, TailRead,
};
pub use registry::JobRegistry;
pub use settings::{ScannerSettings, ToolPaths};
pub use supervisor::{GroupSignaller, ProcessSupervisor, SignalOutcome};
pub use target::{ValidatedTarget, validate_target};
