use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, PipeReader, Write};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::command::CommandSpec;
use super::job::{JobStatus, ScanJob, ScanJobId, ScanType};
use super::registry::JobRegistry;
use super::settings::ScannerSettings;
use crate::error::{Result, ScanError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessState {
    Live,
    /// The stop path signalled the group and recorded `stopped`.
    Stopped,
    /// The child was reaped and its exit status recorded.
    Exited,
}

/// Live OS process behind a running job.
///
/// `state` serializes the stop path against the reaper: whichever takes the
/// lock first decides the job's terminal status and removes the handle.
#[derive(Debug)]
struct ProcessHandle {
    pid: u32,
    state: Mutex<ProcessState>,
}

/// Result of signalling a scan's process group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    Delivered,
    /// The group no longer exists.
    AlreadyGone,
}

/// Sends the stop signal to the process group led by `pid`.
pub type GroupSignaller =
    fn(u32) -> std::result::Result<SignalOutcome, String>;

/// Spawns scanner processes, streams their output into the registry and
/// owns the job id → live process map used for cancellation.
#[derive(Clone)]
pub struct ProcessSupervisor {
    registry: Arc<JobRegistry>,
    settings: Arc<ScannerSettings>,
    running: Arc<DashMap<ScanJobId, Arc<ProcessHandle>>>,
    signal_group: GroupSignaller,
}

impl fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("running", &self.running.len())
            .finish_non_exhaustive()
    }
}

impl ProcessSupervisor {
    pub fn new(
        registry: Arc<JobRegistry>,
        settings: Arc<ScannerSettings>,
    ) -> Self {
        Self {
            registry,
            settings,
            running: Arc::new(DashMap::new()),
            signal_group: terminate_group,
        }
    }

    /// Replace how stop requests reach the process group.
    pub fn with_signaller(mut self, signaller: GroupSignaller) -> Self {
        self.signal_group = signaller;
        self
    }

    pub fn is_running(&self, id: &ScanJobId) -> bool {
        self.running.contains_key(id)
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn running_ids(&self) -> Vec<ScanJobId> {
        self.running.iter().map(|entry| *entry.key()).collect()
    }

    /// Start `command` for `job` and supervise it on a background task.
    ///
    /// The child is spawned before this returns and its handle registered,
    /// so a stop request issued right after `spawn` finds it. Failures mark
    /// the job `failed` before the error is returned.
    pub fn spawn(
        &self,
        command: &CommandSpec,
        job: &ScanJob,
    ) -> Result<JoinHandle<()>> {
        let id = job.id;
        let (child, reader, output) = match self.launch(command, job) {
            Ok(parts) => parts,
            Err(message) => {
                error!(scan_id = %id, command = %command, "{message}");
                self.registry.set_status(
                    &id,
                    JobStatus::Failed,
                    Some(message.clone()),
                );
                return Err(ScanError::execution(message, Some(id)));
            }
        };

        // A freshly spawned child always reports its pid; 0 is never
        // signalled.
        let pid = child.id().unwrap_or_default();
        let handle = Arc::new(ProcessHandle {
            pid,
            state: Mutex::new(ProcessState::Live),
        });
        self.running.insert(id, Arc::clone(&handle));
        info!(scan_id = %id, pid, command = %command, "scan process started");

        let registry = Arc::clone(&self.registry);
        let pump = tokio::task::spawn_blocking(move || {
            pump_output(reader, output, &registry, &id)
        });

        let supervisor = self.clone();
        let scan_type = job.scan_type;
        Ok(tokio::spawn(async move {
            supervisor.reap(id, scan_type, child, handle, pump).await;
        }))
    }

    fn launch(
        &self,
        command: &CommandSpec,
        job: &ScanJob,
    ) -> std::result::Result<(Child, PipeReader, File), String> {
        let output = File::create(&job.output_file).map_err(|err| {
            format!(
                "Error during scan execution: cannot create {}: {err}",
                job.output_file.display()
            )
        })?;

        // stdout and stderr share one pipe so lines keep their original
        // interleaving.
        let (reader, writer) = std::io::pipe().map_err(|err| {
            format!("Error during scan execution: cannot open pipe: {err}")
        })?;
        let stderr_writer = writer.try_clone().map_err(|err| {
            format!("Error during scan execution: cannot open pipe: {err}")
        })?;

        let mut cmd = command.to_command();
        cmd.stdout(Stdio::from(writer))
            .stderr(Stdio::from(stderr_writer));
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|err| {
            format!(
                "Error during scan execution: failed to spawn {command}: {err}"
            )
        });
        // The command still owns the parent's copies of the write end; the
        // reader only sees EOF once they are closed.
        drop(cmd);

        Ok((child?, reader, output))
    }

    async fn reap(
        &self,
        id: ScanJobId,
        scan_type: ScanType,
        mut child: Child,
        handle: Arc<ProcessHandle>,
        pump: JoinHandle<std::io::Result<()>>,
    ) {
        let stream_error = match pump.await {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(format!("Error during scan execution: {err}")),
            Err(err) => Some(format!("Error during scan execution: {err}")),
        };

        if stream_error.is_some() {
            // Nobody drains the pipe any more; make sure the child cannot
            // block on a full buffer.
            let _ = child.start_kill();
        }

        let exit = child.wait().await;

        let mut state = handle.state.lock();
        if *state == ProcessState::Stopped {
            debug!(scan_id = %id, "scan process reaped after stop");
            return;
        }
        *state = ProcessState::Exited;
        self.running.remove(&id);

        let (status, error) = match (stream_error, exit) {
            (Some(message), _) => (JobStatus::Failed, Some(message)),
            (None, Err(err)) => (
                JobStatus::Failed,
                Some(format!("Error during scan execution: {err}")),
            ),
            (None, Ok(exit)) if exit.success() => {
                if let Some(note) = self.settings.completion_note(scan_type) {
                    self.registry.append_output(&id, note);
                }
                (JobStatus::Completed, None)
            }
            (None, Ok(exit)) => (JobStatus::Failed, Some(describe_exit(exit))),
        };

        match &error {
            None => info!(scan_id = %id, "scan completed"),
            Some(reason) => warn!(scan_id = %id, %reason, "scan failed"),
        }
        self.registry.set_status(&id, status, error);
    }

    /// Terminate the process group behind `id`.
    ///
    /// Returns `Ok(false)` when there is nothing to stop: no live handle, or
    /// the process already exited and is being reaped. On success the job is
    /// marked `stopped` before the handle is released.
    pub fn stop(&self, id: &ScanJobId) -> Result<bool> {
        let Some(handle) =
            self.running.get(id).map(|entry| Arc::clone(entry.value()))
        else {
            return Ok(false);
        };

        let mut state = handle.state.lock();
        if *state != ProcessState::Live {
            return Ok(false);
        }

        match (self.signal_group)(handle.pid) {
            Ok(SignalOutcome::Delivered) => {
                *state = ProcessState::Stopped;
                self.running.remove(id);
                self.registry.set_status(id, JobStatus::Stopped, None);
                info!(scan_id = %id, pid = handle.pid, "scan stopped");
                Ok(true)
            }
            Ok(SignalOutcome::AlreadyGone) => {
                debug!(scan_id = %id, "scan process already exited");
                Ok(false)
            }
            Err(reason) => {
                error!(
                    scan_id = %id,
                    pid = handle.pid,
                    %reason,
                    "failed to stop scan"
                );
                Err(ScanError::execution(
                    format!("Failed to stop scan: {reason}"),
                    Some(*id),
                ))
            }
        }
    }
}

/// Copy the child's output into the job file and registry until every
/// writer has closed the pipe. The file keeps the raw bytes; the registry
/// gets one entry per line, where `\r`, `\n` and `\r\n` all end a line.
fn pump_output(
    reader: PipeReader,
    mut output: File,
    registry: &JobRegistry,
    id: &ScanJobId,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    let mut after_cr = false;
    loop {
        let chunk = reader.fill_buf()?;
        if chunk.is_empty() {
            if !line.is_empty() {
                push_line(registry, id, &line);
            }
            return Ok(());
        }

        output.write_all(chunk)?;
        output.flush()?;
        for &byte in chunk {
            match byte {
                // second half of a `\r\n` pair
                b'\n' if after_cr => {}
                b'\r' | b'\n' => {
                    push_line(registry, id, &line);
                    line.clear();
                }
                _ => line.push(byte),
            }
            after_cr = byte == b'\r';
        }

        let consumed = chunk.len();
        reader.consume(consumed);
    }
}

fn push_line(registry: &JobRegistry, id: &ScanJobId, line: &[u8]) {
    registry.append_output(id, String::from_utf8_lossy(line).trim());
}

fn describe_exit(exit: ExitStatus) -> String {
    if let Some(code) = exit.code() {
        return format!("Process exited with code {code}");
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = exit.signal() {
            return format!("Process terminated by signal {signal}");
        }
    }
    "Process exited abnormally".to_string()
}

#[cfg(unix)]
fn terminate_group(pid: u32) -> std::result::Result<SignalOutcome, String> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let pgid = i32::try_from(pid).map_err(|_| format!("invalid pid {pid}"))?;
    if pgid <= 0 {
        // killpg(0) would target our own group
        return Ok(SignalOutcome::AlreadyGone);
    }
    match killpg(Pid::from_raw(pgid), Signal::SIGTERM) {
        Ok(()) => Ok(SignalOutcome::Delivered),
        Err(Errno::ESRCH) => Ok(SignalOutcome::AlreadyGone),
        Err(err) => Err(err.to_string()),
    }
}

#[cfg(windows)]
fn terminate_group(pid: u32) -> std::result::Result<SignalOutcome, String> {
    // taskkill exits with 128 when the process no longer exists
    const NOT_FOUND: i32 = 128;

    let status = std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|err| err.to_string())?;
    match status.code() {
        Some(0) => Ok(SignalOutcome::Delivered),
        Some(NOT_FOUND) => Ok(SignalOutcome::AlreadyGone),
        _ => Err(format!("taskkill failed: {status}")),
    }
}
