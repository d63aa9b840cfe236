// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process runners.
//!
//! One runner supervises one configured process: it spawns the child
//! under `sh -c`, captures output line by line, drives the readiness
//! check, applies the restart policy, and emits [`RunnerEvent`]s to
//! subscribers.
//!
//! Lifecycle: `pending -> starting -> running -> stopped|failed`, with
//! `building` as a detour while a bundler rebuilds, and restarts
//! resetting to `starting` with an incremented restart count.

mod build;

pub use build::{deep_mode_command, BuildEvent, BuildParser};

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use ork_core::{
    now_ms, LineFilter, LogStream, ProcessConfig, ReadyStrategy, RunnerEvent, RunnerStatus,
};

use crate::health::{prober_for, wait_for_ready, LogPatternProber, ReadinessError};
use crate::health::Prober;
use crate::hook::{run_hook, HookPhase};

/// SIGTERM-to-SIGKILL grace period on stop.
pub const STOP_GRACE: Duration = Duration::from_secs(10);

/// How long to wait for the child to disappear after SIGKILL.
const KILL_WAIT: Duration = Duration::from_secs(5);

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Errors from runner operations.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("process '{process}' is already {status}")]
    AlreadyActive { process: String, status: RunnerStatus },

    #[error("failed to spawn process '{process}': {source}")]
    SpawnFailed {
        process: String,
        #[source]
        source: std::io::Error,
    },

    #[error("process '{process}' was not ready after {attempts} attempts ({elapsed_ms} ms)")]
    ReadinessTimeout { process: String, attempts: u32, elapsed_ms: u64 },

    #[error("{phase} hook for '{process}' failed: {detail}")]
    HookFailed { phase: HookPhase, process: String, detail: String },

    #[error("process '{process}' exited before becoming ready (code {code:?})")]
    ExitedBeforeReady { process: String, code: Option<i32>, signal: Option<i32> },

    #[error("operation on '{process}' was cancelled")]
    Cancelled { process: String },

    #[error("process '{process}' has an invalid pattern: {detail}")]
    InvalidPattern { process: String, detail: String },
}

/// How one child generation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GenExit {
    code: Option<i32>,
    signal: Option<i32>,
}

#[derive(Default)]
struct RunnerState {
    status: RunnerStatus,
    pid: Option<u32>,
    restart_count: u32,
    started_at_ms: Option<u64>,
    /// Exit notification for the current generation.
    exit_rx: Option<watch::Receiver<Option<GenExit>>>,
    /// Cancels the current generation's readiness loop.
    gen_cancel: Option<CancellationToken>,
}

struct RunnerInner {
    cfg: ProcessConfig,
    /// Command line after deep-mode flag injection.
    command: String,
    state: Mutex<RunnerState>,
    events: broadcast::Sender<RunnerEvent>,
    cancel: CancellationToken,
    log_prober: Option<Arc<LogPatternProber>>,
    filter: LineFilter,
    parser: BuildParser,
    stopping: AtomicBool,
}

/// Handle to one supervised process. Cheap to clone; all clones share
/// the same state and event channel.
#[derive(Clone)]
pub struct ProcessRunner {
    inner: Arc<RunnerInner>,
}

impl ProcessRunner {
    /// Build a runner from validated config. `cancel` is the
    /// orchestrator's shutdown token; cancelling it aborts readiness
    /// loops and pending restarts.
    pub fn new(cfg: ProcessConfig, cancel: CancellationToken) -> Result<Self, RunnerError> {
        let filter = match &cfg.output_filter {
            Some(filter) => filter.compile().map_err(|e| RunnerError::InvalidPattern {
                process: cfg.name.clone(),
                detail: e.to_string(),
            })?,
            None => LineFilter::default(),
        };

        let log_prober = match &cfg.ready_check {
            Some(check) => match &check.strategy {
                ReadyStrategy::LogPattern { pattern } => {
                    let regex =
                        regex::Regex::new(pattern).map_err(|e| RunnerError::InvalidPattern {
                            process: cfg.name.clone(),
                            detail: e.to_string(),
                        })?;
                    Some(Arc::new(LogPatternProber::new(regex)))
                }
                _ => None,
            },
            None => None,
        };

        let command = deep_mode_command(cfg.kind, cfg.integration_mode, &cfg.command);
        let parser = BuildParser::for_process(cfg.kind, cfg.integration_mode);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            inner: Arc::new(RunnerInner {
                cfg,
                command,
                state: Mutex::new(RunnerState::default()),
                events,
                cancel,
                log_prober,
                filter,
                parser,
                stopping: AtomicBool::new(false),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.cfg.name
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.inner.cfg
    }

    pub fn status(&self) -> RunnerStatus {
        self.inner.state.lock().status
    }

    pub fn pid(&self) -> Option<u32> {
        self.inner.state.lock().pid
    }

    pub fn restart_count(&self) -> u32 {
        self.inner.state.lock().restart_count
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunnerEvent> {
        self.inner.events.subscribe()
    }

    /// Start the process and wait for it to become ready.
    ///
    /// Returns once the ready check has passed (or immediately after
    /// spawn when no check is configured). Exit watching and restarts
    /// continue in background tasks after this returns.
    pub async fn start(&self) -> Result<(), RunnerError> {
        let status = self.status();
        if status.is_active() {
            return Err(RunnerError::AlreadyActive {
                process: self.name().to_string(),
                status,
            });
        }

        if let Some(command) = self.inner.cfg.hooks.pre_start.clone() {
            let report = run_hook(
                HookPhase::PreStart,
                &command,
                self.inner.cfg.workdir.as_deref(),
                &self.inner.cfg.env,
                None,
            )
            .await;
            if !report.ok {
                return Err(RunnerError::HookFailed {
                    phase: HookPhase::PreStart,
                    process: self.name().to_string(),
                    detail: report.error.unwrap_or_else(|| "hook failed".to_string()),
                });
            }
        }

        self.inner.stopping.store(false, Ordering::SeqCst);
        if let Some(prober) = &self.inner.log_prober {
            prober.reset();
        }

        self.set_status(RunnerStatus::Starting);
        let exit_rx = match self.spawn_generation() {
            Ok(rx) => rx,
            Err(e) => {
                self.set_status(RunnerStatus::Failed);
                self.emit(RunnerEvent::Failed { reason: e.to_string() });
                return Err(e);
            }
        };
        self.await_ready(exit_rx).await
    }

    /// Stop the process: SIGTERM, grace period, SIGKILL.
    ///
    /// A failing `pre_stop` hook aborts the stop. Idle runners return
    /// `Ok` without side effects.
    pub async fn stop(&self) -> Result<(), RunnerError> {
        let status = self.status();
        let (pid, exit_rx, gen_cancel) = {
            let state = self.inner.state.lock();
            (state.pid, state.exit_rx.clone(), state.gen_cancel.clone())
        };
        // A readiness-timeout leaves the child alive for inspection in a
        // `failed` status; stop still has to reap it.
        let child_alive = match &exit_rx {
            Some(rx) if pid.is_some() => rx.borrow().is_none(),
            _ => false,
        };
        if !status.is_active() && !child_alive {
            return Ok(());
        }

        if let Some(command) = self.inner.cfg.hooks.pre_stop.clone() {
            let report = run_hook(
                HookPhase::PreStop,
                &command,
                self.inner.cfg.workdir.as_deref(),
                &self.inner.cfg.env,
                None,
            )
            .await;
            if !report.ok {
                return Err(RunnerError::HookFailed {
                    phase: HookPhase::PreStop,
                    process: self.name().to_string(),
                    detail: report.error.unwrap_or_else(|| "hook failed".to_string()),
                });
            }
        }

        self.inner.stopping.store(true, Ordering::SeqCst);
        if let Some(token) = gen_cancel {
            token.cancel();
        }

        if child_alive {
            if let Some(pid) = pid {
                self.terminate_child(pid, exit_rx).await;
            }
        }

        self.set_status(RunnerStatus::Stopped);
        {
            let mut state = self.inner.state.lock();
            state.pid = None;
        }

        if let Some(command) = self.inner.cfg.hooks.post_stop.clone() {
            let report = run_hook(
                HookPhase::PostStop,
                &command,
                self.inner.cfg.workdir.as_deref(),
                &self.inner.cfg.env,
                None,
            )
            .await;
            if !report.ok {
                warn!(process = self.name(), error = ?report.error, "post_stop hook failed");
            }
        }

        Ok(())
    }

    /// Stop then start. Each successful call increments the restart
    /// count by exactly one.
    pub async fn restart(&self) -> Result<(), RunnerError> {
        self.stop().await?;
        let attempt = {
            let mut state = self.inner.state.lock();
            state.restart_count += 1;
            state.restart_count
        };
        self.emit(RunnerEvent::Restarting { attempt });
        self.start().await
    }

    // ------------------------------------------------------------------
    // Generation lifecycle
    // ------------------------------------------------------------------

    fn spawn_generation(&self) -> Result<watch::Receiver<Option<GenExit>>, RunnerError> {
        let cfg = &self.inner.cfg;
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.inner.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &cfg.workdir {
            cmd.current_dir(dir);
        }
        for (key, value) in &cfg.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|source| RunnerError::SpawnFailed {
            process: cfg.name.clone(),
            source,
        })?;
        let pid = child.id();
        debug!(process = %cfg.name, ?pid, "spawned child");

        let (exit_tx, exit_rx) = watch::channel(None);
        let gen_cancel = self.inner.cancel.child_token();
        {
            let mut state = self.inner.state.lock();
            state.pid = pid;
            state.started_at_ms = Some(now_ms());
            state.exit_rx = Some(exit_rx.clone());
            state.gen_cancel = Some(gen_cancel);
        }

        if let Some(stdout) = child.stdout.take() {
            let runner = self.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    runner.handle_line(LogStream::Stdout, &line);
                }
            });
        }
        if let Some(stderr) = child.stderr.take() {
            let runner = self.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    runner.handle_line(LogStream::Stderr, &line);
                }
            });
        }

        let runner = self.clone();
        tokio::spawn(async move {
            let exit = match child.wait().await {
                Ok(status) => {
                    use std::os::unix::process::ExitStatusExt;
                    GenExit { code: status.code(), signal: status.signal() }
                }
                Err(e) => {
                    warn!(process = runner.name(), error = %e, "wait on child failed");
                    GenExit { code: None, signal: None }
                }
            };
            runner.on_exit(exit);
            let _ = exit_tx.send(Some(exit));
        });

        Ok(exit_rx)
    }

    fn on_exit(&self, exit: GenExit) {
        self.emit(RunnerEvent::Exited { code: exit.code, signal: exit.signal });

        let clean = exit.code == Some(0);
        if self.inner.stopping.load(Ordering::SeqCst) || self.inner.cancel.is_cancelled() {
            self.set_status(RunnerStatus::Stopped);
            return;
        }

        if clean {
            self.set_status(RunnerStatus::Stopped);
        } else {
            self.set_status(RunnerStatus::Failed);
            self.emit(RunnerEvent::Failed { reason: exit_reason(exit) });
        }

        let restart_count = self.restart_count();
        let cfg = &self.inner.cfg;
        if cfg.restart_policy.wants_restart(clean) && restart_count < cfg.max_retries {
            let runner = self.clone();
            tokio::spawn(async move { runner.restart_after_delay().await });
        }
    }

    async fn restart_after_delay(&self) {
        tokio::select! {
            _ = tokio::time::sleep(self.inner.cfg.restart_delay) => {}
            _ = self.inner.cancel.cancelled() => return,
        }
        if self.inner.stopping.load(Ordering::SeqCst) {
            return;
        }

        let attempt = {
            let mut state = self.inner.state.lock();
            state.restart_count += 1;
            state.restart_count
        };
        self.emit(RunnerEvent::Restarting { attempt });
        if let Some(prober) = &self.inner.log_prober {
            prober.reset();
        }

        self.set_status(RunnerStatus::Starting);
        match self.spawn_generation() {
            Ok(exit_rx) => {
                if let Err(e) = self.await_ready(exit_rx).await {
                    warn!(process = self.name(), error = %e, "restart did not become ready");
                }
            }
            Err(e) => {
                warn!(process = self.name(), error = %e, "restart spawn failed");
                self.set_status(RunnerStatus::Failed);
                self.emit(RunnerEvent::Failed { reason: e.to_string() });
            }
        }
    }

    async fn await_ready(
        &self,
        mut exit_rx: watch::Receiver<Option<GenExit>>,
    ) -> Result<(), RunnerError> {
        let name = self.name().to_string();
        let Some(check) = self.inner.cfg.ready_check.clone() else {
            // No check: the process is running as long as the child is alive.
            let early_exit = *exit_rx.borrow();
            if let Some(exit) = early_exit {
                if exit.code == Some(0) {
                    self.emit(RunnerEvent::Ready);
                    return Ok(());
                }
                return Err(RunnerError::ExitedBeforeReady {
                    process: name,
                    code: exit.code,
                    signal: exit.signal,
                });
            }
            self.transition_running().await;
            return Ok(());
        };

        if let ReadyStrategy::ExitCode {} = check.strategy {
            loop {
                let exit = *exit_rx.borrow_and_update();
                if let Some(exit) = exit {
                    if exit.code == Some(0) {
                        self.emit(RunnerEvent::Ready);
                        self.run_post_start().await;
                        return Ok(());
                    }
                    return Err(RunnerError::ExitedBeforeReady {
                        process: name,
                        code: exit.code,
                        signal: exit.signal,
                    });
                }
                tokio::select! {
                    changed = exit_rx.changed() => {
                        if changed.is_err() {
                            return Err(RunnerError::ExitedBeforeReady {
                                process: name,
                                code: None,
                                signal: None,
                            });
                        }
                    }
                    _ = self.inner.cancel.cancelled() => {
                        return Err(RunnerError::Cancelled { process: name });
                    }
                }
            }
        }

        let Some(prober) = prober_for(&check.strategy, self.inner.log_prober.clone()) else {
            return Err(RunnerError::InvalidPattern {
                process: name,
                detail: "no prober available for ready check".to_string(),
            });
        };
        let gen_cancel = {
            let state = self.inner.state.lock();
            state.gen_cancel.clone()
        }
        .unwrap_or_else(|| self.inner.cancel.child_token());

        let result = wait_for_ready(
            prober.as_ref(),
            check.timeout,
            check.interval,
            check.max_attempts,
            &gen_cancel,
            |attempt, outcome| {
                debug!(
                    process = %name,
                    attempt,
                    ok = outcome.ok,
                    message = %outcome.message,
                    "readiness probe"
                );
            },
        )
        .await;

        match result {
            Ok(attempts) => {
                debug!(process = %name, attempts, "ready");
                self.transition_running().await;
                Ok(())
            }
            Err(ReadinessError::Cancelled) => Err(RunnerError::Cancelled { process: name }),
            Err(ReadinessError::TimedOut { attempts, elapsed_ms }) => {
                self.set_status(RunnerStatus::Failed);
                self.emit(RunnerEvent::Failed {
                    reason: format!("not ready after {attempts} attempts ({elapsed_ms} ms)"),
                });
                Err(RunnerError::ReadinessTimeout { process: name, attempts, elapsed_ms })
            }
        }
    }

    async fn transition_running(&self) {
        let should_promote = {
            let state = self.inner.state.lock();
            state.status == RunnerStatus::Starting
        };
        if should_promote {
            self.set_status(RunnerStatus::Running);
        }
        self.emit(RunnerEvent::Ready);
        self.run_post_start().await;
    }

    async fn run_post_start(&self) {
        if let Some(command) = self.inner.cfg.hooks.post_start.clone() {
            let report = run_hook(
                HookPhase::PostStart,
                &command,
                self.inner.cfg.workdir.as_deref(),
                &self.inner.cfg.env,
                None,
            )
            .await;
            if !report.ok {
                warn!(process = self.name(), error = ?report.error, "post_start hook failed");
            }
        }
    }

    async fn terminate_child(
        &self,
        pid: u32,
        exit_rx: Option<watch::Receiver<Option<GenExit>>>,
    ) {
        let target = Pid::from_raw(pid as i32);
        debug!(process = self.name(), pid, "sending SIGTERM");
        let _ = kill(target, Signal::SIGTERM);

        if wait_for_exit(exit_rx.clone(), STOP_GRACE).await {
            return;
        }

        warn!(process = self.name(), pid, "grace period elapsed, sending SIGKILL");
        let _ = kill(target, Signal::SIGKILL);
        wait_for_exit(exit_rx, KILL_WAIT).await;
    }

    // ------------------------------------------------------------------
    // Output handling
    // ------------------------------------------------------------------

    fn handle_line(&self, stream: LogStream, line: &str) {
        if let Some(prober) = &self.inner.log_prober {
            prober.observe(line);
        }
        for event in self.inner.parser.parse_line(line) {
            self.apply_build_event(event);
        }
        if let Some(filtered) = self.inner.filter.apply(line) {
            self.emit(match stream {
                LogStream::Stdout => RunnerEvent::Stdout { line: filtered },
                LogStream::Stderr => RunnerEvent::Stderr { line: filtered },
            });
        }
    }

    fn apply_build_event(&self, event: BuildEvent) {
        match event {
            BuildEvent::Start => {
                if self.status() == RunnerStatus::Running {
                    self.set_status(RunnerStatus::Building);
                }
                self.emit(RunnerEvent::BuildStart);
            }
            BuildEvent::Progress(value) => {
                self.emit(RunnerEvent::BuildProgress { value });
            }
            BuildEvent::Stats { errors, warnings } => {
                self.emit(RunnerEvent::BuildStats { errors, warnings });
            }
            BuildEvent::Complete { success, duration_ms } => {
                self.emit(RunnerEvent::BuildComplete { success, duration_ms });
                if success && self.status() == RunnerStatus::Building {
                    self.set_status(RunnerStatus::Running);
                }
            }
            BuildEvent::Failed => {
                self.emit(RunnerEvent::BuildFailed);
            }
        }
    }

    // ------------------------------------------------------------------
    // State helpers
    // ------------------------------------------------------------------

    fn set_status(&self, status: RunnerStatus) {
        let changed = {
            let mut state = self.inner.state.lock();
            if state.status == status {
                false
            } else {
                state.status = status;
                true
            }
        };
        if changed {
            self.emit(RunnerEvent::Status { status });
        }
    }

    fn emit(&self, event: RunnerEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }
}

/// Wait until the generation's exit notification fires, up to `timeout`.
/// A dropped sender also counts as "child gone".
async fn wait_for_exit(
    exit_rx: Option<watch::Receiver<Option<GenExit>>>,
    timeout: Duration,
) -> bool {
    let Some(mut rx) = exit_rx else {
        return false;
    };
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);
    loop {
        if rx.borrow_and_update().is_some() {
            return true;
        }
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    return true;
                }
            }
            _ = &mut deadline => return false,
        }
    }
}

fn exit_reason(exit: GenExit) -> String {
    match (exit.code, exit.signal) {
        (Some(code), _) => format!("exited with code {code}"),
        (None, Some(signal)) => format!("terminated by signal {signal}"),
        (None, None) => "exited abnormally".to_string(),
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
