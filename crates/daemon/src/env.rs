// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

/// Directory holding status sockets: `ORCKIT_SOCKET_DIR` > tmpdir.
pub fn socket_dir() -> PathBuf {
    match std::env::var("ORCKIT_SOCKET_DIR") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir(),
    }
}

/// Status socket path for a project.
pub fn socket_path(project: &str) -> PathBuf {
    socket_dir().join(format!("orckit-{project}.sock"))
}

/// Status monitor heartbeat override (`ORCKIT_UPDATE_MS`).
pub fn update_interval() -> Option<Duration> {
    std::env::var("ORCKIT_UPDATE_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
