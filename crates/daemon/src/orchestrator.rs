// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestrator: binds config, resolver, runners, monitor, hooks,
//! preflight, and the UI session into one start/serve/shutdown workflow.
//!
//! Startup proceeds wave by wave: every process in a wave starts
//! concurrently, and the next wave begins only after all of them are
//! ready. A failure anywhere aborts the remaining waves and leaves
//! already-started processes running for inspection.

use futures_util::future::join_all;
use indexmap::IndexMap;
use serde_json::json;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ork_adapters::{SessionError, UiSession};
use ork_core::{
    BuildUpdate, Config, HealthState, LogStream, ProcessKind, ReadyStrategy, RunnerEvent,
    RunnerStatus, Snapshot, StartPlan,
};
use ork_core::resolver::{resolve, ResolveError};
use ork_engine::hook::{run_hook, HookPhase};
use ork_engine::preflight::run_preflight;
use ork_engine::{ProcessRunner, RunnerError, StatusMonitor};
use ork_wire::{CommandAction, LogLevel, ServerMessage};

use crate::ipc::{CommandReply, IpcCommand};

/// Default number of log-ring lines returned by the `logs` command.
const DEFAULT_LOGS_TAIL: usize = 100;

/// Errors from orchestrator start/shutdown.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("preflight failed: {}", failed.join(", "))]
    PreflightFailed { failed: Vec<String> },

    #[error("{phase} hook failed: {detail}")]
    HookFailed { phase: HookPhase, detail: String },

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("UI session error: {0}")]
    Session(#[from] SessionError),
}

/// One orchestrated project.
pub struct Orchestrator<U: UiSession> {
    config: Config,
    plan: StartPlan,
    runners: IndexMap<String, ProcessRunner>,
    monitor: StatusMonitor,
    ui: U,
    logs: broadcast::Sender<ServerMessage>,
    cancel: CancellationToken,
}

impl<U: UiSession> Orchestrator<U> {
    /// Resolve the plan and build one runner per process.
    pub fn new(
        config: Config,
        ui: U,
        monitor: StatusMonitor,
        logs: broadcast::Sender<ServerMessage>,
        cancel: CancellationToken,
    ) -> Result<Self, OrchestratorError> {
        let plan = resolve(&config.processes)?;

        let mut runners = IndexMap::with_capacity(config.processes.len());
        for (name, process) in &config.processes {
            let runner = ProcessRunner::new(process.clone(), cancel.child_token())?;
            runners.insert(name.clone(), runner);
        }

        Ok(Self { config, plan, runners, monitor, ui, logs, cancel })
    }

    pub fn plan(&self) -> &StartPlan {
        &self.plan
    }

    pub fn monitor(&self) -> &StatusMonitor {
        &self.monitor
    }

    pub fn runner(&self, name: &str) -> Option<&ProcessRunner> {
        self.runners.get(name)
    }

    /// Run the full startup workflow: preflight, hooks, UI, registration,
    /// and wave-by-wave process start.
    pub async fn start(&self) -> Result<(), OrchestratorError> {
        // Preflight gates everything.
        let reports = run_preflight(&self.config, self.ui.enabled()).await;
        let failed: Vec<String> =
            reports.iter().filter(|r| !r.passed).map(|r| r.name.clone()).collect();
        for report in &reports {
            debug!(
                check = %report.name,
                passed = report.passed,
                duration_ms = report.duration_ms,
                error = ?report.error,
                "preflight"
            );
        }
        if !failed.is_empty() {
            return Err(OrchestratorError::PreflightFailed { failed });
        }

        if let Some(command) = &self.config.hooks.pre_start_all {
            let report = run_hook(
                HookPhase::PreStartAll,
                command,
                None,
                &IndexMap::new(),
                None,
            )
            .await;
            if !report.ok {
                return Err(OrchestratorError::HookFailed {
                    phase: HookPhase::PreStartAll,
                    detail: report.error.unwrap_or_else(|| "hook failed".to_string()),
                });
            }
        }

        self.setup_ui().await?;

        // Register everything before anything starts so the first
        // snapshot already shows the whole project.
        for (name, process) in &self.config.processes {
            self.monitor.register(name, &process.category, None);
            if let Some(filter) = &process.output_filter {
                if let Some(max_lines) = filter.max_lines {
                    self.monitor.set_log_capacity(name, max_lines);
                }
            }
            if process.ready_check.is_some() {
                self.monitor.update_health(name, HealthState::Pending);
            }
            self.spawn_event_pump(name.clone());
        }
        self.monitor.start_sampling();

        // Wave-by-wave start with a barrier between waves.
        for (index, wave) in self.plan.waves.iter().enumerate() {
            info!(wave = index, members = ?wave, "starting wave");
            let starts = wave.iter().filter_map(|name| {
                self.runners.get(name).map(|runner| {
                    let runner = runner.clone();
                    async move { runner.start().await }
                })
            });
            let results = join_all(starts).await;
            for result in results {
                // First failure aborts; later waves never start.
                result?;
            }
        }

        if let Some(command) = &self.config.hooks.post_start_all {
            let report = run_hook(
                HookPhase::PostStartAll,
                command,
                None,
                &IndexMap::new(),
                None,
            )
            .await;
            if !report.ok {
                warn!(error = ?report.error, "post_start_all hook failed");
            }
        }

        let snapshot = self.monitor.snapshot();
        let _ = self.ui.update_overview(&overview_line(&snapshot)).await;
        info!(project = %self.config.project_name, "all processes ready");
        Ok(())
    }

    /// Serve viewer commands until shutdown.
    pub async fn serve(&self, mut commands: mpsc::Receiver<IpcCommand>) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => return,
                },
            }
        }
    }

    /// Dispatch one viewer command and send the reply. Public so the
    /// serve loop and in-process clients (tests, embedders) share one
    /// path.
    pub async fn handle_command(&self, command: IpcCommand) {
        let IpcCommand { action, process_name, options, reply } = command;
        debug!(%action, process = %process_name, "viewer command");

        let Some(runner) = self.runners.get(&process_name) else {
            let _ = reply.send(CommandReply::fail(format!(
                "unknown process '{process_name}'"
            )));
            return;
        };

        let outcome = match action {
            CommandAction::Start => self.command_start(runner).await,
            CommandAction::Stop => match runner.stop().await {
                Ok(()) => CommandReply::ok(format!("stopped {process_name}")),
                Err(e) => CommandReply::fail(e.to_string()),
            },
            CommandAction::Restart => match runner.restart().await {
                Ok(()) => CommandReply::ok(format!("restarted {process_name}")),
                Err(e) => CommandReply::fail(e.to_string()),
            },
            CommandAction::Logs => self.command_logs(&process_name, options.as_ref()),
        };
        let _ = reply.send(outcome);
    }

    async fn command_start(&self, runner: &ProcessRunner) -> CommandReply {
        let name = runner.name().to_string();
        if runner.status().is_active() {
            return CommandReply::fail(format!("{name} is already {}", runner.status()));
        }

        // Dependencies must already be up; a clear rejection beats a
        // start that hangs waiting on a dead dependency.
        for dep in &runner.config().dependencies {
            if let Some(dep_runner) = self.runners.get(dep) {
                if !dependency_satisfied(dep_runner) {
                    return CommandReply::fail(format!(
                        "dependency '{dep}' is not running (status: {})",
                        dep_runner.status()
                    ));
                }
            }
        }

        match runner.start().await {
            Ok(()) => CommandReply::ok(format!("started {name}")),
            Err(e) => CommandReply::fail(e.to_string()),
        }
    }

    fn command_logs(&self, name: &str, options: Option<&serde_json::Value>) -> CommandReply {
        let lines = options
            .and_then(|o| o.get("lines"))
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_LOGS_TAIL);

        match self.monitor.logs_tail(name, lines) {
            Some(tail) => {
                let data = json!({
                    "lines": tail
                        .iter()
                        .map(|l| json!({
                            "stream": l.stream,
                            "content": l.content,
                            "timestamp": l.timestamp_ms,
                        }))
                        .collect::<Vec<_>>(),
                });
                CommandReply::ok(format!("{} lines", tail.len())).with_data(data)
            }
            None => CommandReply::fail(format!("unknown process '{name}'")),
        }
    }

    /// Stop everything in reverse start order, then tear down the
    /// monitor, IPC, and UI session.
    pub async fn shutdown(&self) -> Result<(), OrchestratorError> {
        if let Some(command) = &self.config.hooks.pre_stop_all {
            let report =
                run_hook(HookPhase::PreStopAll, command, None, &IndexMap::new(), None).await;
            if !report.ok {
                return Err(OrchestratorError::HookFailed {
                    phase: HookPhase::PreStopAll,
                    detail: report.error.unwrap_or_else(|| "hook failed".to_string()),
                });
            }
        }

        for name in self.plan.stop_order() {
            if let Some(runner) = self.runners.get(&name) {
                if let Err(e) = runner.stop().await {
                    warn!(process = %name, error = %e, "stop failed during shutdown");
                }
            }
        }

        if let Some(command) = &self.config.hooks.post_stop_all {
            let report =
                run_hook(HookPhase::PostStopAll, command, None, &IndexMap::new(), None).await;
            if !report.ok {
                warn!(error = ?report.error, "post_stop_all hook failed");
            }
        }

        self.monitor.stop();
        self.cancel.cancel();
        if let Err(e) = self.ui.kill_session().await {
            debug!(error = %e, "UI session teardown failed");
        }
        info!(project = %self.config.project_name, "shutdown complete");
        Ok(())
    }

    async fn setup_ui(&self) -> Result<(), OrchestratorError> {
        self.ui.create_session().await?;
        for category in self.categories() {
            self.ui.create_window(&category, &category).await?;
        }
        for (name, process) in &self.config.processes {
            self.ui
                .create_pane(
                    &process.category,
                    name,
                    &process.command,
                    process.workdir.as_deref(),
                )
                .await?;
        }
        Ok(())
    }

    /// Unique categories in config order.
    fn categories(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for process in self.config.processes.values() {
            if !seen.contains(&process.category) {
                seen.push(process.category.clone());
            }
        }
        seen
    }

    /// Forward one runner's events into the monitor and log fan-out.
    fn spawn_event_pump(&self, name: String) {
        let Some(runner) = self.runners.get(&name).cloned() else {
            return;
        };
        let monitor = self.monitor.clone();
        let logs = self.logs.clone();
        let cancel = self.cancel.clone();
        let has_ready_check = runner.config().ready_check.is_some();
        // Subscribe before the task is scheduled so no early event from
        // the first wave is missed.
        let mut events = runner.subscribe();

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = cancel.cancelled() => return,
                    event = events.recv() => match event {
                        Ok(event) => event,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(process = %name, skipped, "event pump lagged");
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    },
                };
                apply_event(&monitor, &logs, &runner, &name, has_ready_check, event);
            }
        });
    }
}

/// A dependency is satisfied while it is running (or rebuilding), or
/// once it has finished cleanly in the run-to-completion case.
fn dependency_satisfied(runner: &ProcessRunner) -> bool {
    match runner.status() {
        RunnerStatus::Running | RunnerStatus::Building => true,
        RunnerStatus::Stopped => {
            runner.config().kind == ProcessKind::BuildOnce
                || matches!(
                    runner.config().ready_check.as_ref().map(|c| &c.strategy),
                    Some(ReadyStrategy::ExitCode {})
                )
        }
        _ => false,
    }
}

fn apply_event(
    monitor: &StatusMonitor,
    logs: &broadcast::Sender<ServerMessage>,
    runner: &ProcessRunner,
    name: &str,
    has_ready_check: bool,
    event: RunnerEvent,
) {
    match event {
        RunnerEvent::Status { status } => {
            monitor.update_status(name, status);
            // `starting` can be observed before the child pid lands, so
            // refresh the pid on every active status.
            if status.is_active() {
                monitor.update_pid(name, runner.pid());
            }
            if status == RunnerStatus::Starting && has_ready_check {
                monitor.update_health(name, HealthState::Checking);
            }
        }
        RunnerEvent::Ready => {
            if has_ready_check {
                monitor.update_health(name, HealthState::Passed);
            }
        }
        RunnerEvent::Failed { .. } => {
            if has_ready_check {
                monitor.update_health(name, HealthState::Failed);
            }
        }
        RunnerEvent::Stdout { line } => {
            monitor.append_log(name, LogStream::Stdout, &line);
            let _ = logs.send(ServerMessage::Log {
                process_name: name.to_string(),
                level: LogLevel::Stdout,
                content: line,
                timestamp: ork_core::now_ms(),
            });
        }
        RunnerEvent::Stderr { line } => {
            monitor.append_log(name, LogStream::Stderr, &line);
            let _ = logs.send(ServerMessage::Log {
                process_name: name.to_string(),
                level: LogLevel::Stderr,
                content: line,
                timestamp: ork_core::now_ms(),
            });
        }
        RunnerEvent::Exited { .. } => {
            monitor.update_pid(name, None);
        }
        RunnerEvent::Restarting { .. } => {
            monitor.increment_restart(name);
        }
        RunnerEvent::BuildStart => {
            monitor.update_build(name, &BuildUpdate { progress: Some(0), ..Default::default() });
        }
        RunnerEvent::BuildProgress { value } => {
            monitor
                .update_build(name, &BuildUpdate { progress: Some(value), ..Default::default() });
        }
        RunnerEvent::BuildStats { errors, warnings } => {
            monitor.update_build(
                name,
                &BuildUpdate {
                    errors: Some(errors),
                    warnings: Some(warnings),
                    ..Default::default()
                },
            );
        }
        RunnerEvent::BuildComplete { success, duration_ms } => {
            monitor.update_build(
                name,
                &BuildUpdate {
                    progress: success.then_some(100),
                    last_build_success: Some(success),
                    last_build_duration_ms: duration_ms,
                    ..Default::default()
                },
            );
        }
        RunnerEvent::BuildFailed => {
            monitor.update_build(
                name,
                &BuildUpdate { last_build_success: Some(false), ..Default::default() },
            );
        }
    }
}

/// One-line status summary for the UI overview.
fn overview_line(snapshot: &Snapshot) -> String {
    let s = &snapshot.summary;
    format!(
        "{} running, {} building, {} failed, {} stopped ({} total)",
        s.running, s.building, s.failed, s.stopped, s.total
    )
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
