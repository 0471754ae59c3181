//! Background scan worker
//!
//! A worker runs either the external scanner or the simulation generator for
//! one session generation. It is split into two tasks:
//! - the scan task, which owns the child process and appends records
//! - a supervisor, which awaits the scan task and records its outcome
//!
//! A panic or cancellation in the scan task therefore still closes the
//! session as `FAILED` instead of leaving it `RUNNING`.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bts_protocol::parse_output;
use bts_sim::SimulationGenerator;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{sleep, timeout, timeout_at, Instant};
use tracing::{debug, error, info, warn};

#[cfg(unix)]
use libc::{SIGKILL, SIGTERM};
#[cfg(not(unix))]
const SIGTERM: i32 = 15;
#[cfg(not(unix))]
const SIGKILL: i32 = 9;

use crate::audit::AuditSink;
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::state::{ScanParams, ScanSession, ScanSource, ScanState};

pub(crate) type SharedSession = Arc<Mutex<ScanSession>>;

/// Progress once the worker has started
const PROGRESS_STARTED: u8 = 10;
/// Progress once the scanner process is running
const PROGRESS_TOOL_RUNNING: u8 = 30;
/// Highest progress reported before the scan finishes
const PROGRESS_CEILING: u8 = 90;
/// How often a terminating group is checked for survivors
const GROUP_POLL: Duration = Duration::from_millis(20);

/// What a worker will run
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WorkerPlan {
    /// Resolved path of the external scanner
    Tool(PathBuf),
    Simulation,
}

impl WorkerPlan {
    pub(crate) fn source(&self) -> ScanSource {
        match self {
            Self::Tool(_) => ScanSource::Tool,
            Self::Simulation => ScanSource::Simulation,
        }
    }
}

/// Everything a worker needs, owned
pub(crate) struct WorkerContext {
    pub(crate) session: SharedSession,
    pub(crate) generation: u64,
    pub(crate) params: ScanParams,
    pub(crate) config: Arc<ScanConfig>,
    pub(crate) audit: Arc<dyn AuditSink>,
}

impl WorkerContext {
    fn advance(&self, percent: u8, operation: &str) {
        self.session
            .lock()
            .advance(self.generation, percent, operation);
    }

    fn append(&self, records: Vec<bts_protocol::ScanRecord>) -> bool {
        self.session.lock().append(self.generation, records)
    }
}

/// Process group of the running scanner
///
/// Shared by the scan task and the worker handle, so an aborted worker can
/// still reach everything the scanner started. Zero means no group.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScannerGroup(Arc<AtomicI32>);

impl ScannerGroup {
    /// Track the group led by `child` until the guard drops
    fn attach(&self, child: &Child) -> GroupGuard<'_> {
        let pgid = child
            .id()
            .and_then(|pid| i32::try_from(pid).ok())
            .unwrap_or(0);
        self.0.store(pgid, Ordering::SeqCst);
        GroupGuard(self)
    }

    /// True while any member of the group is left
    fn is_alive(&self) -> bool {
        self.send(0)
    }

    fn terminate(&self) {
        self.send(SIGTERM);
    }

    /// Kill whatever is left of the group and forget it
    pub(crate) fn kill(&self) {
        if self.send(SIGKILL) {
            debug!("Killed remaining scanner processes");
        }
        self.0.store(0, Ordering::SeqCst);
    }

    #[cfg(unix)]
    fn send(&self, signal: libc::c_int) -> bool {
        let pgid = self.0.load(Ordering::SeqCst);
        if pgid <= 0 {
            return false;
        }
        // The scanner leads its own group, see `process_group(0)` below
        unsafe { libc::kill(-(pgid as libc::pid_t), signal) == 0 }
    }

    #[cfg(not(unix))]
    fn send(&self, _signal: i32) -> bool {
        false
    }
}

/// Kills the scanner's group when the scan task ends or is cancelled
struct GroupGuard<'a>(&'a ScannerGroup);

impl Drop for GroupGuard<'_> {
    fn drop(&mut self) {
        self.0.kill();
    }
}

/// Handle kept by the orchestrator for the running worker
#[derive(Debug)]
pub(crate) struct WorkerHandle {
    pub(crate) generation: u64,
    stop_tx: Option<oneshot::Sender<()>>,
    supervisor: JoinHandle<()>,
    scan: AbortHandle,
    group: ScannerGroup,
}

impl WorkerHandle {
    /// Ask the worker to terminate its scan
    pub(crate) fn request_stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            // The worker may already have finished
            let _ = tx.send(());
        }
    }

    /// Wait for the worker to wind down, aborting it after `ceiling`
    pub(crate) async fn join(mut self, ceiling: Duration) {
        if timeout(ceiling, &mut self.supervisor).await.is_err() {
            warn!(
                "Scan worker {} did not stop within {:?}, aborting",
                self.generation, ceiling
            );
            self.abort();
        }
    }

    /// Abort without waiting, killing the scanner's whole process group
    pub(crate) fn abort(&self) {
        self.group.kill();
        self.scan.abort();
        self.supervisor.abort();
    }
}

/// How a scan task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed { towers: usize },
    Stopped,
}

/// Start a worker for `plan`
pub(crate) fn spawn(ctx: WorkerContext, plan: WorkerPlan) -> WorkerHandle {
    let (stop_tx, stop_rx) = oneshot::channel();
    let generation = ctx.generation;
    let ctx = Arc::new(ctx);
    let group = ScannerGroup::default();

    let scan_task = tokio::spawn(run(Arc::clone(&ctx), plan, group.clone(), stop_rx));
    let scan = scan_task.abort_handle();
    let supervisor = tokio::spawn(supervise(ctx, scan_task));

    WorkerHandle {
        generation,
        stop_tx: Some(stop_tx),
        supervisor,
        scan,
        group,
    }
}

async fn run(
    ctx: Arc<WorkerContext>,
    plan: WorkerPlan,
    group: ScannerGroup,
    mut stop_rx: oneshot::Receiver<()>,
) -> Result<Outcome, ScanError> {
    ctx.advance(PROGRESS_STARTED, "Preparing scan");
    match plan {
        WorkerPlan::Tool(path) => run_tool(&ctx, path, &group, &mut stop_rx).await,
        WorkerPlan::Simulation => run_simulation(&ctx, &mut stop_rx).await,
    }
}

async fn supervise(ctx: Arc<WorkerContext>, scan_task: JoinHandle<Result<Outcome, ScanError>>) {
    let result = match scan_task.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ScanError::WorkerCrashed(reason))
        }
        Err(_) => Err(ScanError::WorkerCrashed("cancelled".to_string())),
    };

    conclude(&ctx, result);
}

/// Record the outcome of a scan task in the session
///
/// The outcome is audited after the session lock is released, so a slow
/// sink never holds up pollers.
fn conclude(ctx: &WorkerContext, result: Result<Outcome, ScanError>) {
    let params = ctx.params;

    let event = {
        let mut session = ctx.session.lock();

        // A stop request owns the final transition
        if session.generation != ctx.generation || session.state != ScanState::Running {
            debug!(
                "Scan worker {} finished after the session moved on",
                ctx.generation
            );
            return;
        }

        match result {
            Ok(Outcome::Completed { towers }) => {
                let message = if towers > 0 {
                    format!("Scan completed. Found {} BTS towers.", towers)
                } else {
                    "No BTS towers found in scan.".to_string()
                };
                session.finish(ctx.generation, ScanState::Completed, Some(100), message.clone());

                info!("{} scan finished: {}", params.band, message);
                Some(("complete", message))
            }
            Ok(Outcome::Stopped) => {
                session.finish(
                    ctx.generation,
                    ScanState::Completed,
                    Some(0),
                    "Scan stopped".to_string(),
                );
                None
            }
            Err(e) => {
                let message = e.to_string();
                session.finish(ctx.generation, ScanState::Failed, None, message.clone());

                error!(
                    band = %params.band,
                    sample_rate = params.sample_rate,
                    gain = params.gain,
                    "Scan failed: {}",
                    message
                );
                Some((
                    "error",
                    format!(
                        "{} scan failed (sample rate {}, gain {}): {}",
                        params.band, params.sample_rate, params.gain, message
                    ),
                ))
            }
        }
    };

    if let Some((event_type, description)) = event {
        ctx.audit.record("scan", event_type, &description);
    }
}

async fn run_simulation(
    ctx: &WorkerContext,
    stop_rx: &mut oneshot::Receiver<()>,
) -> Result<Outcome, ScanError> {
    let settings = &ctx.config.simulation;
    let band = ctx.params.band;
    let mut generator = match settings.seed {
        Some(seed) => SimulationGenerator::with_seed(seed),
        None => SimulationGenerator::new(),
    };

    info!("Running simulated {} scan", band);
    let operation = format!("Scanning {} (simulated)", band);

    for step in 1..=settings.steps {
        tokio::select! {
            biased;
            _ = &mut *stop_rx => {
                info!("Simulated scan stopped at step {}", step);
                return Ok(Outcome::Stopped);
            }
            _ = sleep(settings.step_delay()) => {}
        }
        let percent = (step.saturating_mul(10)).min(u32::from(PROGRESS_CEILING)) as u8;
        ctx.advance(percent, &operation);
    }

    let records = generator.generate(band);
    let towers = records.len();
    if !ctx.append(records) {
        return Ok(Outcome::Stopped);
    }

    Ok(Outcome::Completed { towers })
}

async fn run_tool(
    ctx: &WorkerContext,
    path: PathBuf,
    group: &ScannerGroup,
    stop_rx: &mut oneshot::Receiver<()>,
) -> Result<Outcome, ScanError> {
    let config = &ctx.config;
    let params = ctx.params;
    let grace = config.stop_grace();
    let program = path.display().to_string();
    let args = config.tool.command_args(&params);

    info!("Running {} {}", program, args.join(" "));

    let mut command = Command::new(&path);
    command
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    // Own process group so terminate reaches everything the scanner started
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn().map_err(|e| ScanError::ProcessSpawn {
        program: program.clone(),
        reason: e.to_string(),
    })?;
    let _group_guard = group.attach(&child);

    let stdout = child.stdout.take().ok_or_else(|| ScanError::ProcessSpawn {
        program: program.clone(),
        reason: "stdout was not captured".to_string(),
    })?;
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(drain_stderr(stderr, program.clone()));
    }

    ctx.advance(PROGRESS_TOOL_RUNNING, &format!("Scanning {}", params.band));

    let deadline = sleep(config.scan_timeout());
    tokio::pin!(deadline);

    let mut segments = BufReader::new(stdout).split(b'\n');
    let mut captured = Vec::new();
    let mut towers = 0usize;

    loop {
        let segment = tokio::select! {
            biased;
            _ = &mut *stop_rx => {
                info!("Stop requested, terminating {}", program);
                terminate(&mut child, group, grace).await;
                return Ok(Outcome::Stopped);
            }
            _ = &mut deadline => {
                warn!("{} exceeded the scan time limit", program);
                terminate(&mut child, group, grace).await;
                return Err(ScanError::Timeout(config.scan_timeout()));
            }
            segment = segments.next_segment() => segment?,
        };

        let Some(bytes) = segment else {
            break;
        };

        let line = String::from_utf8_lossy(&bytes);
        debug!("{}: {}", program, line.trim_end());
        captured.extend_from_slice(&bytes);
        captured.push(b'\n');

        // Progress redraws can join several reports with carriage returns
        let records = parse_output(&line, Some(params.band));
        if records.is_empty() {
            continue;
        }
        towers += records.len();
        if !ctx.append(records) {
            terminate(&mut child, group, grace).await;
            return Ok(Outcome::Stopped);
        }
        let percent = (usize::from(PROGRESS_TOOL_RUNNING) + 10 * towers)
            .min(usize::from(PROGRESS_CEILING)) as u8;
        ctx.advance(percent, "");
    }

    let status = tokio::select! {
        biased;
        _ = &mut *stop_rx => {
            terminate(&mut child, group, grace).await;
            return Ok(Outcome::Stopped);
        }
        _ = &mut deadline => {
            warn!("{} closed its output but did not exit", program);
            terminate(&mut child, group, grace).await;
            return Err(ScanError::Timeout(config.scan_timeout()));
        }
        status = child.wait() => status?,
    };

    // Every segment was already parsed with carriage-return splitting, so
    // this pass over the raw capture cannot find records the stream did not.
    // It stays as a last check before reporting an empty scan.
    if towers == 0 {
        let records = parse_output(&String::from_utf8_lossy(&captured), Some(params.band));
        if !records.is_empty() {
            info!("Recovered {} towers from buffered output", records.len());
            towers = records.len();
            if !ctx.append(records) {
                return Ok(Outcome::Stopped);
            }
        }
    }

    if !status.success() {
        if towers == 0 {
            return Err(ScanError::ToolExited {
                program,
                status: status.to_string(),
            });
        }
        warn!("{} exited with {} after reporting {} towers", program, status, towers);
    }

    Ok(Outcome::Completed { towers })
}

/// Log the scanner's stderr so the pipe never fills
async fn drain_stderr(stderr: ChildStderr, program: String) {
    let mut segments = BufReader::new(stderr).split(b'\n');
    while let Ok(Some(bytes)) = segments.next_segment().await {
        debug!("{} stderr: {}", program, String::from_utf8_lossy(&bytes).trim_end());
    }
}

/// Terminate the scanner's process group, killing it after `grace`
///
/// The group is signalled even if the scanner itself already exited, since
/// anything it started may still hold its output open.
async fn terminate(child: &mut Child, group: &ScannerGroup, grace: Duration) {
    let deadline = Instant::now() + grace;

    group.terminate();
    #[cfg(not(unix))]
    let _ = child.start_kill();

    if !matches!(child.try_wait(), Ok(Some(_))) {
        match timeout_at(deadline, child.wait()).await {
            Ok(Ok(status)) => debug!("Scanner exited with {} after terminate", status),
            Ok(Err(e)) => warn!("Failed waiting for scanner: {}", e),
            Err(_) => {
                warn!("Scanner ignored terminate for {:?}, killing", grace);
                group.kill();
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill scanner: {}", e);
                }
            }
        }
    }

    while group.is_alive() && Instant::now() < deadline {
        sleep(GROUP_POLL).await;
    }
    group.kill();
}
