// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-process info as serialized for IPC clients.

use ork_core::{ProcessInfo, RunnerStatus};
use serde::{Deserialize, Serialize};

/// Build progress subset shipped to viewers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// Last build duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    pub errors: u32,
    pub warnings: u32,
}

/// Viewer-facing process entry.
///
/// Field naming follows the protocol, not Rust convention: `uptime_ms`
/// and `pid` are snake_case, `restartCount`/`buildInfo` camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpcProcessInfo {
    pub name: String,
    pub status: RunnerStatus,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(rename = "restartCount")]
    pub restart_count: u32,
    #[serde(rename = "buildInfo", default, skip_serializing_if = "Option::is_none")]
    pub build_info: Option<BuildInfo>,
}

impl IpcProcessInfo {
    /// Project a monitor-side [`ProcessInfo`] onto the wire shape.
    pub fn from_info(info: &ProcessInfo, now_ms: u64) -> Self {
        let build = &info.build;
        let has_build_data = build.progress > 0
            || build.errors > 0
            || build.warnings > 0
            || build.last_build_success.is_some();

        Self {
            name: info.name.clone(),
            status: info.status,
            category: info.category.clone(),
            uptime_ms: info.uptime_ms(now_ms),
            pid: info.pid,
            restart_count: info.restart_count,
            build_info: has_build_data.then(|| BuildInfo {
                progress: Some(build.progress),
                duration: build.last_build_duration_ms,
                errors: build.errors,
                warnings: build.warnings,
            }),
        }
    }
}

#[cfg(test)]
#[path = "info_tests.rs"]
mod tests;
