// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Port-occupancy diagnostics for failed local probes.

use std::time::Duration;

use tokio::process::Command;

use ork_adapters::subprocess::run_with_timeout;

const LSOF_TIMEOUT: Duration = Duration::from_secs(2);

/// Whether a probe host refers to the local machine.
pub fn is_local_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1" | "0.0.0.0")
}

/// Best-effort description of who is listening on a local TCP port.
///
/// Returns `None` when nothing listens there or `lsof` is unavailable.
pub async fn port_holder(port: u16) -> Option<String> {
    let mut cmd = Command::new("lsof");
    cmd.args(["-nP", &format!("-iTCP:{port}"), "-sTCP:LISTEN"]);
    let output = run_with_timeout(cmd, LSOF_TIMEOUT, "lsof").await.ok()?;
    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().nth(1)?;
    let mut fields = line.split_whitespace();
    let command = fields.next()?;
    let pid = fields.next()?;
    Some(format!("port {port} is in use by {command} (pid {pid})"))
}
