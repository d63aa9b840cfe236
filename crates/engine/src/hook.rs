// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle hook execution.
//!
//! Hooks run synchronously around lifecycle edges. `pre_*` failures are
//! fatal for the action they precede; `post_*` failures are logged by the
//! caller and otherwise ignored.

use std::path::Path;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use tokio::process::Command;
use tracing::debug;

use ork_adapters::subprocess::{run_with_timeout, HOOK_TIMEOUT};

/// Which lifecycle edge a hook belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    PreStart,
    PostStart,
    PreStop,
    PostStop,
    PreStartAll,
    PostStartAll,
    PreStopAll,
    PostStopAll,
}

impl HookPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::PreStart => "pre_start",
            HookPhase::PostStart => "post_start",
            HookPhase::PreStop => "pre_stop",
            HookPhase::PostStop => "post_stop",
            HookPhase::PreStartAll => "pre_start_all",
            HookPhase::PostStartAll => "post_start_all",
            HookPhase::PreStopAll => "pre_stop_all",
            HookPhase::PostStopAll => "post_stop_all",
        }
    }

    /// `pre_*` hooks gate the action they precede.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HookPhase::PreStart | HookPhase::PreStop | HookPhase::PreStartAll | HookPhase::PreStopAll
        )
    }
}

impl std::fmt::Display for HookPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one hook execution. Never an `Err`; failures are data.
#[derive(Debug, Clone, PartialEq)]
pub struct HookReport {
    pub ok: bool,
    pub output: String,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Run a hook command under `sh -c` with a deadline.
///
/// The environment is the parent's merged with `env`; `env` wins on
/// conflict, same as the child processes themselves.
pub async fn run_hook(
    phase: HookPhase,
    command: &str,
    workdir: Option<&Path>,
    env: &IndexMap<String, String>,
    timeout: Option<Duration>,
) -> HookReport {
    let timeout = timeout.unwrap_or(HOOK_TIMEOUT);
    debug!(%phase, command, "running hook");

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    if let Some(dir) = workdir {
        cmd.current_dir(dir);
    }
    for (key, value) in env {
        cmd.env(key, value);
    }

    let started = Instant::now();
    let result = run_with_timeout(cmd, timeout, phase.as_str()).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(output) => {
            let mut text = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(stderr.trim_end());
            }
            if output.status.success() {
                HookReport { ok: true, output: text, duration_ms, error: None }
            } else {
                let code = output.status.code();
                HookReport {
                    ok: false,
                    output: text,
                    duration_ms,
                    error: Some(match code {
                        Some(code) => format!("exited with code {code}"),
                        None => "terminated by signal".to_string(),
                    }),
                }
            }
        }
        Err(message) => HookReport { ok: false, output: String::new(), duration_ms, error: Some(message) },
    }
}

#[cfg(test)]
#[path = "hook_tests.rs"]
mod tests;
