// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort per-process and host resource sampling.
//!
//! Linux reads `/proc`; elsewhere `ps` is used. Sampling failures are
//! silent; a missing sample never disturbs supervision.

use std::collections::HashMap;
use std::time::Instant;

use ork_core::SystemMetrics;

/// One CPU/RSS sample for a child process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessStats {
    pub cpu_percent: f32,
    pub rss_bytes: u64,
}

#[derive(Debug, Clone, Copy)]
struct CpuSample {
    total_ticks: u64,
    at: Instant,
}

/// Stateful sampler; CPU percentages are derived from tick deltas
/// between consecutive samples of the same pid.
#[derive(Debug, Default)]
pub struct ProcSampler {
    prev: HashMap<u32, CpuSample>,
}

impl ProcSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop state for pids that are no longer supervised.
    pub fn retain(&mut self, pids: &[u32]) {
        self.prev.retain(|pid, _| pids.contains(pid));
    }

    pub async fn sample(&mut self, pid: u32) -> Option<ProcessStats> {
        #[cfg(target_os = "linux")]
        {
            self.sample_proc(pid)
        }
        #[cfg(not(target_os = "linux"))]
        {
            let _ = &self.prev;
            sample_ps(pid).await
        }
    }

    #[cfg(target_os = "linux")]
    fn sample_proc(&mut self, pid: u32) -> Option<ProcessStats> {
        let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
        // Fields after the parenthesized comm; utime/stime are fields 14
        // and 15 of the full line, i.e. 12 and 13 after the comm.
        let rest = stat.rsplit_once(')')?.1;
        let fields: Vec<&str> = rest.split_whitespace().collect();
        let utime: u64 = fields.get(11)?.parse().ok()?;
        let stime: u64 = fields.get(12)?.parse().ok()?;
        let total_ticks = utime + stime;
        let now = Instant::now();

        let cpu_percent = match self.prev.insert(pid, CpuSample { total_ticks, at: now }) {
            Some(prev) => {
                let elapsed = now.duration_since(prev.at).as_secs_f64();
                if elapsed > 0.0 {
                    let ticks = total_ticks.saturating_sub(prev.total_ticks) as f64;
                    // CLK_TCK is 100 on every supported Linux target.
                    ((ticks / 100.0) / elapsed * 100.0) as f32
                } else {
                    0.0
                }
            }
            None => 0.0,
        };

        let statm = std::fs::read_to_string(format!("/proc/{pid}/statm")).ok()?;
        let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
        let rss_bytes = resident_pages * 4096;

        Some(ProcessStats { cpu_percent, rss_bytes })
    }
}

#[cfg(not(target_os = "linux"))]
async fn sample_ps(pid: u32) -> Option<ProcessStats> {
    use ork_adapters::subprocess::run_with_timeout;
    use std::time::Duration;
    use tokio::process::Command;

    let mut cmd = Command::new("ps");
    cmd.args(["-o", "%cpu=,rss=", "-p", &pid.to_string()]);
    let output = run_with_timeout(cmd, Duration::from_secs(2), "ps").await.ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout);
    let mut fields = text.split_whitespace();
    let cpu_percent: f32 = fields.next()?.parse().ok()?;
    let rss_kb: u64 = fields.next()?.parse().ok()?;
    Some(ProcessStats { cpu_percent, rss_bytes: rss_kb * 1024 })
}

/// Host-level load and memory, when the platform exposes them.
pub fn system_metrics() -> Option<SystemMetrics> {
    #[cfg(target_os = "linux")]
    {
        let load_average_1m = std::fs::read_to_string("/proc/loadavg")
            .ok()
            .and_then(|s| s.split_whitespace().next().map(str::to_string))
            .and_then(|s| s.parse::<f64>().ok());

        let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
        let mut total_kb: Option<u64> = None;
        let mut available_kb: Option<u64> = None;
        for line in meminfo.lines() {
            if let Some(rest) = line.strip_prefix("MemTotal:") {
                total_kb = rest.split_whitespace().next().and_then(|v| v.parse().ok());
            } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
                available_kb = rest.split_whitespace().next().and_then(|v| v.parse().ok());
            }
        }

        let memory_total_bytes = total_kb.map(|kb| kb * 1024);
        let memory_used_bytes = match (total_kb, available_kb) {
            (Some(total), Some(available)) => Some(total.saturating_sub(available) * 1024),
            _ => None,
        };

        Some(SystemMetrics { load_average_1m, memory_used_bytes, memory_total_bytes })
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
