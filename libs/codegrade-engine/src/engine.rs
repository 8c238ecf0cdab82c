/// Process Runner - Local Code Execution
///
/// **Core Responsibility:**
/// Spawn one OS process per compile step or test case, feed stdin, capture
/// stdout/stderr and enforce a hard wall-clock timeout.
///
/// **Critical Architectural Boundary:**
/// - Runner knows HOW to execute (commands, process groups, pipes)
/// - Runner does NOT know scoring rules
/// - Runner returns raw outputs for the Evaluator to judge
///
/// **Process Ownership:**
/// Every invocation is placed in its own process group and registered with the
/// `ProcessTracker`. On timeout the whole group receives `SIGKILL`; the sweep
/// uses the tracker to kill groups that outlived their submission.

use crate::config::{CommandSpec, LanguageConfig};
use crate::error::{EngineError, EngineResult};
use crate::evaluator::TestExecutionOutput;
use crate::workspace::Workspace;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Upper bound on draining pipes once the process itself is gone
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
struct TrackedGroup {
    workspace: Uuid,
    started: Instant,
}

/// Registry of live process groups spawned by the runner
#[derive(Debug, Default)]
pub struct ProcessTracker {
    groups: Mutex<HashMap<u32, TrackedGroup>>,
}

/// Removes its process group from the tracker when dropped, unless the group
/// outlived its leader and was retained for later cleanup
#[derive(Debug)]
pub struct TrackedProcess {
    tracker: Arc<ProcessTracker>,
    pgid: u32,
    retained: bool,
}

impl TrackedProcess {
    /// Keep the record after the guard is dropped
    pub fn retain(mut self) {
        self.retained = true;
    }
}

impl Drop for TrackedProcess {
    fn drop(&mut self) {
        if !self.retained {
            self.tracker.lock().remove(&self.pgid);
        }
    }
}

impl ProcessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u32, TrackedGroup>> {
        self.groups.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(self: &Arc<Self>, pgid: u32, workspace: Uuid) -> TrackedProcess {
        self.lock().insert(
            pgid,
            TrackedGroup {
                workspace,
                started: Instant::now(),
            },
        );
        TrackedProcess {
            tracker: Arc::clone(self),
            pgid,
            retained: false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn contains(&self, pgid: u32) -> bool {
        self.lock().contains_key(&pgid)
    }

    /// Drop records whose group has no members left. Once a group is gone its
    /// number may be reused by an unrelated process group.
    /// Returns how many records were dropped.
    pub fn forget_dead(&self) -> usize {
        let mut groups = self.lock();
        let before = groups.len();
        groups.retain(|pgid, _| group_alive(*pgid));
        before - groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Kill and forget every tracked group alive for longer than `age`.
    /// Returns how many groups were signalled.
    pub fn kill_older_than(&self, age: Duration) -> usize {
        self.forget_dead();
        let stale: Vec<(u32, TrackedGroup)> = {
            let mut groups = self.lock();
            let pgids: Vec<u32> = groups
                .iter()
                .filter(|(_, group)| group.started.elapsed() > age)
                .map(|(pgid, _)| *pgid)
                .collect();
            pgids
                .into_iter()
                .filter_map(|pgid| groups.remove(&pgid).map(|group| (pgid, group)))
                .collect()
        };

        let mut killed = 0;
        for (pgid, group) in stale {
            if kill_process_group(pgid) {
                warn!(
                    pgid,
                    workspace = %group.workspace,
                    age_ms = group.started.elapsed().as_millis() as u64,
                    "Killed stray process group"
                );
                killed += 1;
            }
        }
        killed
    }

    /// Kill and forget every group spawned for one workspace
    pub fn kill_workspace(&self, workspace: Uuid) -> usize {
        self.forget_dead();
        let pgids: Vec<u32> = {
            let mut groups = self.lock();
            let pgids: Vec<u32> = groups
                .iter()
                .filter(|(_, group)| group.workspace == workspace)
                .map(|(pgid, _)| *pgid)
                .collect();
            for pgid in &pgids {
                groups.remove(pgid);
            }
            pgids
        };
        pgids.into_iter().filter(|pgid| kill_process_group(*pgid)).count()
    }
}

#[cfg(unix)]
fn signal_group(pgid: u32, signal: i32) -> bool {
    let Ok(pgid) = i32::try_from(pgid) else {
        return false;
    };
    if pgid <= 1 {
        return false;
    }
    // SAFETY: kill(2) has no memory-safety preconditions
    unsafe { libc::kill(-pgid, signal) == 0 }
}

/// Send SIGKILL to a whole process group. False when nothing was signalled.
pub fn kill_process_group(pgid: u32) -> bool {
    #[cfg(unix)]
    {
        signal_group(pgid, libc::SIGKILL)
    }
    #[cfg(not(unix))]
    {
        let _ = pgid;
        false
    }
}

/// Whether any member of the group is still alive
fn group_alive(pgid: u32) -> bool {
    #[cfg(unix)]
    {
        signal_group(pgid, 0)
    }
    #[cfg(not(unix))]
    {
        let _ = pgid;
        false
    }
}

/// How often a retained group is checked for members
const RETAINED_POLL: Duration = Duration::from_millis(250);

/// Drop a retained record as soon as its group dies, or stop once release or
/// the sweep has already taken it
async fn forget_when_gone(tracker: Arc<ProcessTracker>, pgid: u32) {
    loop {
        tokio::time::sleep(RETAINED_POLL).await;
        if !tracker.contains(pgid) {
            return;
        }
        if !group_alive(pgid) {
            tracker.lock().remove(&pgid);
            debug!(pgid, "Retained process group exited");
            return;
        }
    }
}

/// Raw result of one process invocation
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub timed_out: bool,
    pub elapsed: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

/// `./main` style commands refer to workspace artifacts
fn resolve_program(workspace: &Path, command: &str) -> PathBuf {
    if command.starts_with("./") || command.starts_with("../") {
        workspace.join(command)
    } else {
        PathBuf::from(command)
    }
}

/// Bytes read from one pipe so far
#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

/// Pipe contents shared between the reader task and the runner, so output
/// captured before a drain timeout is never lost
#[derive(Debug, Clone, Default)]
struct PipeCapture {
    inner: Arc<Mutex<Captured>>,
}

impl PipeCapture {
    fn lock(&self) -> std::sync::MutexGuard<'_, Captured> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, chunk: &[u8], cap: usize) {
        let mut captured = self.lock();
        let room = cap.saturating_sub(captured.bytes.len());
        captured.bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if chunk.len() > room {
            captured.truncated = true;
        }
    }

    fn text(&self, cap: usize) -> String {
        let captured = self.lock();
        let mut text = String::from_utf8_lossy(&captured.bytes).into_owned();
        if captured.truncated {
            text.push_str(&format!("\n[output truncated at {} bytes]", cap));
        }
        text
    }
}

/// Read a pipe to EOF into `capture`, keeping at most `cap` bytes
async fn read_capped<R>(reader: Option<R>, cap: usize, capture: PipeCapture)
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return;
    };

    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => capture.push(&buf[..n], cap),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
}

/// Spawn a reader for one pipe
fn spawn_reader<R>(reader: Option<R>, cap: usize) -> (JoinHandle<()>, PipeCapture)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let capture = PipeCapture::default();
    let handle = tokio::spawn(read_capped(reader, cap, capture.clone()));
    (handle, capture)
}

/// Wait for a reader to hit EOF. A pipe still held open by a background child
/// after the grace period stops being read, and whatever arrived is kept.
/// Returns the text and whether the pipe reached EOF.
async fn drain_reader(mut handle: JoinHandle<()>, capture: PipeCapture, cap: usize) -> (String, bool) {
    let closed = match tokio::time::timeout(PIPE_DRAIN_GRACE, &mut handle).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(error = %e, "Output reader task failed");
            true
        }
        Err(_) => {
            handle.abort();
            false
        }
    };
    (capture.text(cap), closed)
}

/// Local process runner shared by every submission
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    tracker: Arc<ProcessTracker>,
    max_output_bytes: usize,
}

impl ProcessRunner {
    pub fn new(tracker: Arc<ProcessTracker>, max_output_bytes: usize) -> Self {
        Self {
            tracker,
            max_output_bytes,
        }
    }

    pub fn tracker(&self) -> &Arc<ProcessTracker> {
        &self.tracker
    }

    /// Spawn `spec` inside the workspace, optionally feeding `stdin`, and
    /// wait at most `timeout` for it to exit.
    ///
    /// Only spawn failures are errors; a non-zero exit or a timeout is reported
    /// in the returned `ProcessOutput`.
    pub async fn execute(
        &self,
        workspace: &Workspace,
        spec: &CommandSpec,
        stdin: Option<&str>,
        timeout: Duration,
    ) -> io::Result<ProcessOutput> {
        let program = resolve_program(workspace.path(), &spec.command);
        let mut command = Command::new(&program);
        command
            .args(&spec.args)
            .current_dir(workspace.path())
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let start = Instant::now();
        let mut child = command.spawn()?;
        let pgid = child.id();
        let tracked = pgid.map(|id| self.tracker.register(id, workspace.id()));
        debug!(command = %spec.command, pgid = ?pgid, "Process spawned");

        if let (Some(mut pipe), Some(input)) = (child.stdin.take(), stdin) {
            let bytes = input.as_bytes().to_vec();
            tokio::spawn(async move {
                if let Err(e) = pipe.write_all(&bytes).await {
                    // the program may exit without reading its input
                    if e.kind() != io::ErrorKind::BrokenPipe {
                        debug!(error = %e, "Failed to write stdin");
                    }
                }
                drop(pipe);
            });
        }

        let cap = self.max_output_bytes;
        let (stdout_reader, stdout_capture) = spawn_reader(child.stdout.take(), cap);
        let (stderr_reader, stderr_capture) = spawn_reader(child.stderr.take(), cap);

        let (status, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => (Some(status?), false),
            Err(_) => (None, true),
        };
        let elapsed = start.elapsed();

        let status = match status {
            Some(status) => status,
            None => {
                if let Some(pgid) = pgid {
                    kill_process_group(pgid);
                }
                warn!(
                    command = %spec.command,
                    timeout_ms = timeout.as_millis() as u64,
                    "Process timed out, killed its process group"
                );
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed-out process");
                }
                child.wait().await?
            }
        };

        let ((stdout, stdout_closed), (stderr, stderr_closed)) = tokio::join!(
            drain_reader(stdout_reader, stdout_capture, cap),
            drain_reader(stderr_reader, stderr_capture, cap),
        );
        if !(stdout_closed && stderr_closed) {
            warn!(
                command = %spec.command,
                pgid = ?pgid,
                "Output pipe still held open after process exit, keeping captured output"
            );
        }

        // Background children outlived the leader; release and the sweep kill them
        if let (Some(guard), Some(pgid)) = (tracked, pgid) {
            if !timed_out && group_alive(pgid) {
                debug!(pgid, "Process group outlived its leader, keeping it tracked");
                guard.retain();
                tokio::spawn(forget_when_gone(Arc::clone(&self.tracker), pgid));
            }
        }

        Ok(ProcessOutput {
            stdout,
            stderr,
            exit_code: if timed_out { None } else { status.code() },
            signal: if timed_out { None } else { exit_signal(&status) },
            timed_out,
            elapsed,
        })
    }

    /// Compile the workspace sources. Languages without a compile step succeed
    /// immediately.
    #[instrument(skip(self, workspace, config), fields(workspace = %workspace.id(), language = %config.name))]
    pub async fn compile(
        &self,
        workspace: &Workspace,
        config: &LanguageConfig,
        timeout: Duration,
    ) -> EngineResult<()> {
        let Some(spec) = &config.compile else {
            return Ok(());
        };

        let output = self
            .execute(workspace, spec, None, timeout)
            .await
            .map_err(|e| EngineError::Compile {
                detail: format!("failed to start {}: {}", spec.command, e),
            })?;

        if output.timed_out {
            return Err(EngineError::Compile {
                detail: format!("compilation timed out after {}ms", timeout.as_millis()),
            });
        }

        if !output.success() {
            let detail = if !output.stderr.trim().is_empty() {
                output.stderr.trim().to_string()
            } else if !output.stdout.trim().is_empty() {
                output.stdout.trim().to_string()
            } else {
                format!("{} exited with status {:?}", spec.command, output.exit_code)
            };
            info!(exit_code = ?output.exit_code, "Compilation failed");
            return Err(EngineError::Compile { detail });
        }

        debug!(elapsed_ms = output.elapsed.as_millis() as u64, "Compilation succeeded");
        Ok(())
    }

    /// Run the compiled or interpreted harness once with `input` on stdin
    #[instrument(skip(self, workspace, config, input), fields(workspace = %workspace.id(), language = %config.name))]
    pub async fn run(
        &self,
        workspace: &Workspace,
        config: &LanguageConfig,
        input: &str,
        timeout: Duration,
    ) -> TestExecutionOutput {
        let Some(spec) = &config.run else {
            return TestExecutionOutput::runtime_failure(
                format!("{} has no local run command", config.name),
                0.0,
            );
        };

        let output = match self.execute(workspace, spec, Some(input), timeout).await {
            Ok(output) => output,
            Err(e) => {
                warn!(command = %spec.command, error = %e, "Failed to start process");
                return TestExecutionOutput::runtime_failure(
                    format!("failed to start {}: {}", spec.command, e),
                    0.0,
                );
            }
        };

        let execution_time_ms = output.elapsed.as_secs_f64() * 1000.0;
        let runtime_error = !output.timed_out && !output.success();
        let mut stderr = output.stderr;

        if output.timed_out {
            stderr.push_str(&format!("\n[Execution timed out after {}ms]", timeout.as_millis()));
        } else if runtime_error {
            match (output.exit_code, output.signal) {
                (Some(137), _) | (_, Some(9)) => {
                    stderr.push_str("\n[Process killed: likely exceeded memory limit]")
                }
                (Some(139), _) | (_, Some(11)) => {
                    stderr.push_str("\n[Process killed: segmentation fault]")
                }
                (None, Some(signal)) => {
                    stderr.push_str(&format!("\n[Process terminated by signal {}]", signal))
                }
                _ => {}
            }
        }

        debug!(
            exit_code = ?output.exit_code,
            timed_out = output.timed_out,
            execution_time_ms,
            "Test execution finished"
        );

        TestExecutionOutput {
            stdout: output.stdout,
            stderr,
            execution_time_ms,
            exit_code: output.exit_code,
            timed_out: output.timed_out,
            runtime_error,
            remote_failure: false,
        }
    }
}
