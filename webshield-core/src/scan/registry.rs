use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info};

use super::job::{
    JobStatus, ScanJob, ScanJobId, ScanJobSummary, ScanType, TailRead,
};
use crate::error::{Result, ScanError};

/// In-memory store of scan jobs and their accumulated output.
///
/// A single registry-wide lock keeps `append_output` and `read_tail`
/// linearizable: a poller never observes a gap or a reordered line.
pub struct JobRegistry {
    results_dir: PathBuf,
    jobs: RwLock<HashMap<ScanJobId, ScanJob>>,
    next_sequence: AtomicU64,
}

impl fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let jobs = self.jobs.try_read().map(|guard| guard.len());
        f.debug_struct("JobRegistry")
            .field("results_dir", &self.results_dir)
            .field("jobs", &jobs)
            .finish()
    }
}

impl JobRegistry {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
            jobs: RwLock::new(HashMap::new()),
            next_sequence: AtomicU64::new(0),
        }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Register a new running job and assign its output file.
    pub fn create(
        &self,
        scan_type: ScanType,
        target: impl Into<String>,
        option: impl Into<String>,
    ) -> Result<ScanJob> {
        std::fs::create_dir_all(&self.results_dir).map_err(|err| {
            ScanError::execution(
                format!(
                    "Failed to start scan: cannot create {}: {err}",
                    self.results_dir.display()
                ),
                None,
            )
        })?;

        let id = ScanJobId::new();
        let created_at = Utc::now();
        let timestamp = created_at.format("%Y%m%d_%H%M%S").to_string();
        let output_file = self
            .results_dir
            .join(format!("{scan_type}_{timestamp}_{id}.txt"));

        let job = ScanJob {
            id,
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
            scan_type,
            target: target.into(),
            option: option.into(),
            status: JobStatus::Running,
            output_lines: Vec::new(),
            output_file,
            timestamp,
            created_at,
            finished_at: None,
            error: None,
        };

        self.jobs.write().insert(id, job.clone());
        debug!(scan_id = %id, scan_type = %scan_type, "registered scan job");
        Ok(job)
    }

    /// Append a line to a running job. Unknown or finished jobs ignore it.
    pub fn append_output(&self, id: &ScanJobId, line: impl Into<String>) {
        let mut jobs = self.jobs.write();
        if let Some(job) = jobs.get_mut(id)
            && !job.status.is_terminal()
        {
            job.output_lines.push(line.into());
        }
    }

    /// Move a running job to `status`. Returns `false` when the job is
    /// unknown, already terminal, or `status` is `Running`.
    pub fn set_status(
        &self,
        id: &ScanJobId,
        status: JobStatus,
        error: Option<String>,
    ) -> bool {
        if !status.is_terminal() {
            return false;
        }

        let mut jobs = self.jobs.write();
        let Some(job) = jobs.get_mut(id) else {
            return false;
        };
        if job.status.is_terminal() {
            debug!(
                scan_id = %id,
                current = %job.status,
                requested = %status,
                "ignoring transition out of terminal status"
            );
            return false;
        }

        job.status = status;
        job.finished_at = Some(Utc::now());
        if status == JobStatus::Failed {
            job.error = error;
        }
        true
    }

    /// Lines from `from` to the end plus the current line count.
    pub fn read_tail(&self, id: &ScanJobId, from: usize) -> Option<TailRead> {
        let jobs = self.jobs.read();
        let job = jobs.get(id)?;
        let lines = job
            .output_lines
            .get(from..)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        Some(TailRead {
            status: job.status,
            lines,
            total: job.output_lines.len(),
            error: job.error.clone(),
        })
    }

    pub fn get(&self, id: &ScanJobId) -> Option<ScanJobSummary> {
        self.jobs.read().get(id).map(ScanJob::summary)
    }

    pub fn status(&self, id: &ScanJobId) -> Option<JobStatus> {
        self.jobs.read().get(id).map(|job| job.status)
    }

    pub fn contains(&self, id: &ScanJobId) -> bool {
        self.jobs.read().contains_key(id)
    }

    pub fn remove(&self, id: &ScanJobId) -> Option<ScanJob> {
        self.jobs.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    /// Summaries of every job, oldest first.
    pub fn list(&self) -> Vec<ScanJobSummary> {
        let jobs = self.jobs.read();
        let mut ordered: Vec<&ScanJob> = jobs.values().collect();
        ordered.sort_by_key(|job| job.sequence);
        ordered.into_iter().map(ScanJob::summary).collect()
    }

    /// Drop finished jobs, oldest first, until at most `max` remain. Running
    /// jobs are never evicted, so the registry may stay above `max`.
    pub fn enforce_retention(&self, max: usize) -> Vec<ScanJobId> {
        let mut jobs = self.jobs.write();
        if jobs.len() <= max {
            return Vec::new();
        }

        let mut finished: Vec<_> = jobs
            .values()
            .filter(|job| job.status.is_terminal())
            .map(|job| (job.sequence, job.id))
            .collect();
        finished.sort_by_key(|(sequence, _)| *sequence);

        let excess = jobs.len() - max;
        let evicted: Vec<ScanJobId> = finished
            .into_iter()
            .take(excess)
            .map(|(_, id)| id)
            .collect();
        for id in &evicted {
            jobs.remove(id);
        }

        if !evicted.is_empty() {
            info!(
                evicted = evicted.len(),
                retained = jobs.len(),
                "evicted finished scan jobs"
            );
        }
        evicted
    }
}
