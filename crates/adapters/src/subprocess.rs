// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Default timeout for tmux commands.
pub const TMUX_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-attempt deadline for readiness probes (HTTP, TCP, custom).
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for lifecycle hook commands.
pub const HOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// Default deadline for preflight check commands.
pub const PREFLIGHT_TIMEOUT: Duration = Duration::from_secs(30);

/// Run a command to completion under a deadline.
///
/// On success the raw `Output` is returned, whatever the exit status;
/// spawn errors and deadline expiry are flattened into a log-ready
/// message naming `description`. The child is marked kill-on-drop, so a
/// command that outlives its deadline is reaped when the timed-out
/// future is dropped rather than leaking.
pub async fn run_with_timeout(
    mut cmd: Command,
    deadline: Duration,
    description: &str,
) -> Result<Output, String> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(deadline, cmd.output()).await {
        Ok(result) => result.map_err(|e| format!("{description}: {e}")),
        Err(_) => Err(format!("{description}: timed out after {deadline:?}")),
    }
}

/// Run a command line under `sh -c` with a timeout.
pub async fn run_shell_with_timeout(
    command: &str,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    run_with_timeout(cmd, timeout, description).await
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
