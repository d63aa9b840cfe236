// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status aggregation.
//!
//! The monitor owns the `name -> ProcessInfo` map. All mutations go
//! through its methods (single writer); every mutation publishes a fresh
//! snapshot. A sampling task additionally publishes heartbeat snapshots
//! with resource usage at a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use ork_core::{
    now_ms, BuildUpdate, HealthState, LogLine, LogRing, LogStream, ProcessInfo, RunnerStatus,
    Snapshot, StatusSummary,
};

use crate::metrics::{system_metrics, ProcSampler};

/// Default heartbeat interval.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(1);

const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

struct ProcessEntry {
    info: ProcessInfo,
    ring: LogRing,
}

struct MonitorInner {
    processes: Mutex<IndexMap<String, ProcessEntry>>,
    snapshots: broadcast::Sender<Snapshot>,
    update_interval: Duration,
    sampling: Mutex<Option<CancellationToken>>,
}

/// Aggregated per-process state with snapshot fan-out.
#[derive(Clone)]
pub struct StatusMonitor {
    inner: Arc<MonitorInner>,
}

impl Default for StatusMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_UPDATE_INTERVAL)
    }
}

impl StatusMonitor {
    pub fn new(update_interval: Duration) -> Self {
        let (snapshots, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(MonitorInner {
                processes: Mutex::new(IndexMap::new()),
                snapshots,
                update_interval,
                sampling: Mutex::new(None),
            }),
        }
    }

    /// Subscribe to snapshot broadcasts. Slow consumers lag and miss
    /// intermediate snapshots rather than blocking the monitor.
    pub fn subscribe(&self) -> broadcast::Receiver<Snapshot> {
        self.inner.snapshots.subscribe()
    }

    pub fn register(&self, name: &str, category: &str, pid: Option<u32>) {
        {
            let mut processes = self.inner.processes.lock();
            let mut info = ProcessInfo::new(name, category);
            info.pid = pid;
            processes.insert(
                name.to_string(),
                ProcessEntry { info, ring: LogRing::default() },
            );
        }
        self.publish();
    }

    pub fn unregister(&self, name: &str) {
        let removed = self.inner.processes.lock().shift_remove(name).is_some();
        if removed {
            self.publish();
        }
    }

    pub fn clear(&self) {
        self.inner.processes.lock().clear();
        self.publish();
    }

    /// Cap the retained log ring for one process.
    pub fn set_log_capacity(&self, name: &str, capacity: usize) {
        let mut processes = self.inner.processes.lock();
        if let Some(entry) = processes.get_mut(name) {
            entry.ring = LogRing::new(capacity);
        }
    }

    pub fn update_status(&self, name: &str, status: RunnerStatus) {
        self.mutate(name, |info| {
            if status == RunnerStatus::Starting {
                info.started_at_ms = Some(now_ms());
            }
            info.status = status;
        });
    }

    pub fn update_pid(&self, name: &str, pid: Option<u32>) {
        self.mutate(name, |info| info.pid = pid);
    }

    pub fn update_health(&self, name: &str, health: HealthState) {
        self.mutate(name, |info| info.health = health);
    }

    pub fn increment_restart(&self, name: &str) {
        self.mutate(name, |info| info.restart_count += 1);
    }

    pub fn update_build(&self, name: &str, update: &BuildUpdate) {
        self.mutate(name, |info| info.build.merge(update));
    }

    /// Append an already-filtered output line to the process's ring.
    pub fn append_log(&self, name: &str, stream: LogStream, content: &str) {
        let mut processes = self.inner.processes.lock();
        if let Some(entry) = processes.get_mut(name) {
            entry.ring.push(LogLine {
                stream,
                content: content.to_string(),
                timestamp_ms: now_ms(),
            });
        }
        // Log lines are not snapshot-worthy on their own; the heartbeat
        // carries the ring length implicitly via the IPC log channel.
    }

    /// Most recent `n` retained lines for a process.
    pub fn logs_tail(&self, name: &str, n: usize) -> Option<Vec<LogLine>> {
        let processes = self.inner.processes.lock();
        processes.get(name).map(|entry| entry.ring.tail(n))
    }

    /// Deep copy of the current state.
    pub fn snapshot(&self) -> Snapshot {
        self.build_snapshot(None)
    }

    /// Start the heartbeat sampling task. Idempotent.
    pub fn start_sampling(&self) {
        let mut sampling = self.inner.sampling.lock();
        if sampling.is_some() {
            return;
        }
        let token = CancellationToken::new();
        *sampling = Some(token.clone());
        drop(sampling);

        let monitor = self.clone();
        tokio::spawn(async move {
            let mut sampler = ProcSampler::new();
            let mut ticker = tokio::time::interval(monitor.inner.update_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => monitor.heartbeat(&mut sampler).await,
                    _ = token.cancelled() => return,
                }
            }
        });
    }

    /// Stop the heartbeat task. Registered state is kept.
    pub fn stop(&self) {
        if let Some(token) = self.inner.sampling.lock().take() {
            token.cancel();
        }
    }

    async fn heartbeat(&self, sampler: &mut ProcSampler) {
        let pids: Vec<(String, u32)> = {
            let processes = self.inner.processes.lock();
            processes
                .values()
                .filter(|e| e.info.status.is_active())
                .filter_map(|e| e.info.pid.map(|pid| (e.info.name.clone(), pid)))
                .collect()
        };
        sampler.retain(&pids.iter().map(|(_, pid)| *pid).collect::<Vec<_>>());

        let mut samples = Vec::with_capacity(pids.len());
        for (name, pid) in pids {
            if let Some(stats) = sampler.sample(pid).await {
                samples.push((name, stats));
            }
        }

        {
            let mut processes = self.inner.processes.lock();
            for (name, stats) in samples {
                if let Some(entry) = processes.get_mut(&name) {
                    entry.info.cpu_percent = Some(stats.cpu_percent);
                    entry.info.rss_bytes = Some(stats.rss_bytes);
                }
            }
        }

        trace!("heartbeat snapshot");
        self.publish_with_system(system_metrics());
    }

    fn mutate(&self, name: &str, f: impl FnOnce(&mut ProcessInfo)) {
        let known = {
            let mut processes = self.inner.processes.lock();
            match processes.get_mut(name) {
                Some(entry) => {
                    f(&mut entry.info);
                    true
                }
                None => false,
            }
        };
        if known {
            self.publish();
        }
    }

    fn publish(&self) {
        self.publish_with_system(None);
    }

    fn publish_with_system(&self, system: Option<ork_core::SystemMetrics>) {
        let snapshot = self.build_snapshot(system);
        // No receivers is fine; snapshots are fire-and-forget.
        let _ = self.inner.snapshots.send(snapshot);
    }

    fn build_snapshot(&self, system: Option<ork_core::SystemMetrics>) -> Snapshot {
        let processes: Vec<ProcessInfo> = {
            let map = self.inner.processes.lock();
            map.values().map(|e| e.info.clone()).collect()
        };
        let summary = StatusSummary::count(&processes);
        Snapshot { timestamp_ms: now_ms(), processes, summary, system }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
