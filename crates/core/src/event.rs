// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events emitted by process runners.
//!
//! Serializes with `{"type": "event-name", ...fields}` format, matching
//! the wire protocol's tagged-message convention.

use serde::{Deserialize, Serialize};

use crate::status::RunnerStatus;

/// Everything a runner can tell its subscribers.
///
/// Listeners observe events in emission order; ordering across runners
/// is not defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunnerEvent {
    /// Lifecycle status changed.
    #[serde(rename = "status")]
    Status { status: RunnerStatus },

    #[serde(rename = "stdout")]
    Stdout { line: String },

    #[serde(rename = "stderr")]
    Stderr { line: String },

    /// The child terminated.
    #[serde(rename = "exit")]
    Exited {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signal: Option<i32>,
    },

    #[serde(rename = "failed")]
    Failed { reason: String },

    /// The configured ready check passed (or the child of an exit-code
    /// checked process exited cleanly).
    #[serde(rename = "ready")]
    Ready,

    /// A restart is about to happen; `attempt` counts from 1.
    #[serde(rename = "restarting")]
    Restarting { attempt: u32 },

    #[serde(rename = "build:start")]
    BuildStart,

    #[serde(rename = "build:progress")]
    BuildProgress { value: u8 },

    #[serde(rename = "build:stats")]
    BuildStats { errors: u32, warnings: u32 },

    #[serde(rename = "build:complete")]
    BuildComplete {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
    },

    #[serde(rename = "build:failed")]
    BuildFailed,
}

impl RunnerEvent {
    /// The wire tag for this event.
    pub fn kind(&self) -> &'static str {
        match self {
            RunnerEvent::Status { .. } => "status",
            RunnerEvent::Stdout { .. } => "stdout",
            RunnerEvent::Stderr { .. } => "stderr",
            RunnerEvent::Exited { .. } => "exit",
            RunnerEvent::Failed { .. } => "failed",
            RunnerEvent::Ready => "ready",
            RunnerEvent::Restarting { .. } => "restarting",
            RunnerEvent::BuildStart => "build:start",
            RunnerEvent::BuildProgress { .. } => "build:progress",
            RunnerEvent::BuildStats { .. } => "build:stats",
            RunnerEvent::BuildComplete { .. } => "build:complete",
            RunnerEvent::BuildFailed => "build:failed",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
