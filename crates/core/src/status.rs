// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime status types: per-process state, log rings, and snapshots.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Current epoch time in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Lifecycle status of a supervised process.
///
/// Transitions are strictly monotonic within one generation; a restart
/// increments the restart count and resets to `Starting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerStatus {
    #[default]
    Pending,
    Starting,
    Building,
    Running,
    Failed,
    Stopped,
}

impl RunnerStatus {
    /// Terminal for the current generation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunnerStatus::Failed | RunnerStatus::Stopped)
    }

    /// A child process is expected to be alive in this status.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunnerStatus::Starting | RunnerStatus::Building | RunnerStatus::Running
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerStatus::Pending => "pending",
            RunnerStatus::Starting => "starting",
            RunnerStatus::Building => "building",
            RunnerStatus::Running => "running",
            RunnerStatus::Failed => "failed",
            RunnerStatus::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for RunnerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health-check progress for a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// No ready check configured.
    #[default]
    None,
    Pending,
    Checking,
    Passed,
    Failed,
}

/// Structured build progress extracted from a bundler's output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildMetrics {
    pub errors: u32,
    pub warnings: u32,
    /// 0..=100
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_build_success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_build_duration_ms: Option<u64>,
}

/// Partial update merged into [`BuildMetrics`] by the status monitor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildUpdate {
    pub errors: Option<u32>,
    pub warnings: Option<u32>,
    pub progress: Option<u8>,
    pub last_build_success: Option<bool>,
    pub last_build_duration_ms: Option<u64>,
}

impl BuildMetrics {
    pub fn merge(&mut self, update: &BuildUpdate) {
        if let Some(v) = update.errors {
            self.errors = v;
        }
        if let Some(v) = update.warnings {
            self.warnings = v;
        }
        if let Some(v) = update.progress {
            self.progress = v.min(100);
        }
        if let Some(v) = update.last_build_success {
            self.last_build_success = Some(v);
        }
        if let Some(v) = update.last_build_duration_ms {
            self.last_build_duration_ms = Some(v);
        }
    }
}

/// Which stream a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// One retained (already filtered) output line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub stream: LogStream,
    pub content: String,
    pub timestamp_ms: u64,
}

/// Default log ring capacity when the output filter does not set one.
pub const DEFAULT_LOG_RING_CAPACITY: usize = 500;

/// Bounded buffer of recent output lines.
#[derive(Debug, Clone)]
pub struct LogRing {
    lines: VecDeque<LogLine>,
    capacity: usize,
}

impl Default for LogRing {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_RING_CAPACITY)
    }
}

impl LogRing {
    pub fn new(capacity: usize) -> Self {
        Self { lines: VecDeque::with_capacity(capacity.min(64)), capacity: capacity.max(1) }
    }

    pub fn push(&mut self, line: LogLine) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Most recent `n` lines, oldest first.
    pub fn tail(&self, n: usize) -> Vec<LogLine> {
        let skip = self.lines.len().saturating_sub(n);
        self.lines.iter().skip(skip).cloned().collect()
    }
}

/// Aggregated view of one process, as held by the status monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub name: String,
    pub category: String,
    pub status: RunnerStatus,
    pub health: HealthState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub restart_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default)]
    pub build: BuildMetrics,
    /// Best-effort resource sample; absent when sampling failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rss_bytes: Option<u64>,
}

impl ProcessInfo {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            status: RunnerStatus::Pending,
            health: HealthState::None,
            pid: None,
            restart_count: 0,
            started_at_ms: None,
            build: BuildMetrics::default(),
            cpu_percent: None,
            rss_bytes: None,
        }
    }

    /// Milliseconds since the current generation started, while active.
    pub fn uptime_ms(&self, now: u64) -> Option<u64> {
        if !self.status.is_active() {
            return None;
        }
        self.started_at_ms.map(|t| now.saturating_sub(t))
    }
}

/// Counts of processes by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub running: usize,
    pub building: usize,
    pub failed: usize,
    pub stopped: usize,
    pub total: usize,
}

impl StatusSummary {
    pub fn count(processes: &[ProcessInfo]) -> Self {
        let mut summary = Self { total: processes.len(), ..Self::default() };
        for p in processes {
            match p.status {
                RunnerStatus::Running => summary.running += 1,
                RunnerStatus::Building => summary.building += 1,
                RunnerStatus::Failed => summary.failed += 1,
                RunnerStatus::Stopped => summary.stopped += 1,
                RunnerStatus::Pending | RunnerStatus::Starting => {}
            }
        }
        summary
    }
}

/// Host-level metrics attached to snapshots when available.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_average_1m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_used_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_total_bytes: Option<u64>,
}

impl SystemMetrics {
    pub fn is_empty(&self) -> bool {
        self.load_average_1m.is_none()
            && self.memory_used_bytes.is_none()
            && self.memory_total_bytes.is_none()
    }
}

/// Immutable, timestamped view of all registered processes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp_ms: u64,
    pub processes: Vec<ProcessInfo>,
    pub summary: StatusSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemMetrics>,
}

impl Snapshot {
    pub fn get(&self, name: &str) -> Option<&ProcessInfo> {
        self.processes.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
