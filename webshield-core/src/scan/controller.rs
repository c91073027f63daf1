use std::sync::Arc;

use tracing::{info, warn};

use super::command::CommandBuilder;
use super::job::{JobStatus, ScanJobId, ScanJobSummary, ScanType, TailRead};
use super::registry::JobRegistry;
use super::settings::ScannerSettings;
use super::supervisor::{GroupSignaller, ProcessSupervisor};
use super::target::ValidatedTarget;
use crate::error::{Result, ScanError};
use crate::report::{Report, ReportFormat, ReportGenerator};

const SCAN_NOT_FOUND: &str = "Scan not found";

#[derive(Debug, Clone)]
pub struct StartedScan {
    pub id: ScanJobId,
    pub scan_type: ScanType,
    pub target: ValidatedTarget,
}

impl StartedScan {
    pub fn message(&self) -> String {
        let name = self.scan_type.as_str();
        let mut chars = name.chars();
        let capitalized = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        format!("{capitalized} scan started for {}", self.target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    /// The job exists but has no live process.
    NothingToStop,
}

/// Entry point for scan operations; every call returns without waiting on
/// the scanner itself.
#[derive(Debug, Clone)]
pub struct JobController {
    settings: Arc<ScannerSettings>,
    builder: CommandBuilder,
    registry: Arc<JobRegistry>,
    supervisor: ProcessSupervisor,
    reports: ReportGenerator,
}

impl JobController {
    pub fn new(settings: ScannerSettings) -> Self {
        let settings = Arc::new(settings);
        let registry = Arc::new(JobRegistry::new(&settings.results_dir));
        Self {
            builder: CommandBuilder::new(Arc::clone(&settings)),
            supervisor: ProcessSupervisor::new(
                Arc::clone(&registry),
                Arc::clone(&settings),
            ),
            reports: ReportGenerator::new(Arc::clone(&settings)),
            registry,
            settings,
        }
    }

    /// Replace how stop requests reach a scan's process group.
    pub fn with_signaller(mut self, signaller: GroupSignaller) -> Self {
        self.supervisor = self.supervisor.with_signaller(signaller);
        self
    }

    pub fn settings(&self) -> &ScannerSettings {
        &self.settings
    }

    /// Validate the request, register the job and launch its scanner.
    /// Nothing is registered when validation fails.
    pub fn start(
        &self,
        scan_type: &str,
        target: &str,
        option: &str,
    ) -> Result<StartedScan> {
        let (scan_type, target, command) =
            self.builder.prepare(scan_type, target, option)?;

        let job = self.registry.create(scan_type, target.as_str(), option)?;
        self.supervisor.spawn(&command, &job)?;

        if let Some(max) = self.settings.max_retained_jobs {
            self.registry.enforce_retention(max);
        }

        info!(
            scan_id = %job.id,
            scan_type = %scan_type,
            target = %target,
            "scan started"
        );
        Ok(StartedScan {
            id: job.id,
            scan_type,
            target,
        })
    }

    /// Output lines from `from` onward plus the job's status.
    pub fn poll(&self, id: &ScanJobId, from: usize) -> Result<TailRead> {
        self.registry
            .read_tail(id, from)
            .ok_or_else(|| ScanError::not_found(SCAN_NOT_FOUND))
    }

    pub fn stop(&self, id: &ScanJobId) -> Result<StopOutcome> {
        if !self.registry.contains(id) {
            return Err(ScanError::not_found(SCAN_NOT_FOUND));
        }

        match self.supervisor.stop(id) {
            Ok(true) => Ok(StopOutcome::Stopped),
            Ok(false) => Ok(StopOutcome::NothingToStop),
            Err(err) => {
                warn!(scan_id = %id, kind = err.kind(), "{err}");
                self.registry.set_status(
                    id,
                    JobStatus::Failed,
                    Some(err.to_string()),
                );
                Err(err)
            }
        }
    }

    pub async fn report(
        &self,
        id: &ScanJobId,
        format: ReportFormat,
    ) -> Result<Report> {
        let job = self
            .registry
            .get(id)
            .ok_or_else(|| ScanError::not_found(SCAN_NOT_FOUND))?;
        self.reports.generate(&job, format).await
    }

    /// Every retained job, oldest first.
    pub fn jobs(&self) -> Vec<ScanJobSummary> {
        self.registry.list()
    }

    pub fn running_count(&self) -> usize {
        self.supervisor.running_count()
    }

    /// Stop every live scan; used on shutdown. Returns how many were
    /// signalled.
    pub fn stop_all(&self) -> usize {
        let mut stopped = 0;
        for id in self.supervisor.running_ids() {
            match self.supervisor.stop(&id) {
                Ok(true) => stopped += 1,
                Ok(false) => {}
                Err(err) => warn!(scan_id = %id, "{err}"),
            }
        }
        stopped
    }
}
