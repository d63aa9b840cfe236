// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Preflight environment validation.
//!
//! Built-in checks plus user-defined shell checks from the config. The
//! orchestrator refuses to start anything when a check fails.

use std::time::Instant;

use tokio::net::TcpListener;
use tokio::process::Command;
use tracing::debug;

use ork_adapters::subprocess::{run_shell_with_timeout, run_with_timeout, PREFLIGHT_TIMEOUT};
use ork_core::{Config, CustomCheck, ProcessKind, ReadyStrategy};

use crate::health::port_holder;

/// Minimum supported Node.js major version.
pub const NODE_MAJOR_REQUIRED: u32 = 18;

/// Outcome of one preflight check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub name: String,
    pub passed: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub fix_hint: Option<String>,
}

impl CheckReport {
    fn passed(name: impl Into<String>, started: Instant) -> Self {
        Self {
            name: name.into(),
            passed: true,
            duration_ms: started.elapsed().as_millis() as u64,
            error: None,
            fix_hint: None,
        }
    }

    fn failed(
        name: impl Into<String>,
        started: Instant,
        error: String,
        fix_hint: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            passed: false,
            duration_ms: started.elapsed().as_millis() as u64,
            error: Some(error),
            fix_hint,
        }
    }
}

/// Run every applicable check. The result always contains one report per
/// executed check; skipped checks (unmet `condition`, inapplicable
/// built-ins) produce no report.
///
/// `require_multiplexer` comes from the UI adapter: headless runs do not
/// need tmux installed.
pub async fn run_preflight(config: &Config, require_multiplexer: bool) -> Vec<CheckReport> {
    let mut reports = Vec::new();

    if require_multiplexer {
        reports.push(check_tmux().await);
    }

    if config.has_container_processes() {
        reports.push(check_container_daemon().await);
    }
    if config.has_node_processes() {
        reports.push(check_node_version().await);
    }

    for port in extract_ports(config) {
        reports.push(check_port_free(port).await);
    }

    if let Some(preflight) = &config.preflight {
        for check in &preflight.checks {
            if let Some(report) = run_custom_check(check).await {
                reports.push(report);
            }
        }
    }

    reports
}

/// TCP ports the orchestration will need: ready-check targets and
/// container `-p` host mappings.
pub fn extract_ports(config: &Config) -> Vec<u16> {
    let mut ports = Vec::new();

    for process in config.processes.values() {
        if let Some(check) = &process.ready_check {
            match &check.strategy {
                ReadyStrategy::Tcp { port, .. } => ports.push(*port),
                ReadyStrategy::Http { url, .. } => {
                    if let Some(port) = url_port(url) {
                        ports.push(port);
                    }
                }
                _ => {}
            }
        }
        if process.kind == ProcessKind::Container {
            ports.extend(container_host_ports(&process.command));
        }
    }

    ports.sort_unstable();
    ports.dedup();
    ports
}

/// Host side of `-p HOST:CONTAINER` publish flags.
fn container_host_ports(command: &str) -> Vec<u16> {
    let mut ports = Vec::new();
    let mut tokens = command.split_whitespace().peekable();
    while let Some(token) = tokens.next() {
        let mapping = match token {
            "-p" | "--publish" => tokens.next(),
            _ => token
                .strip_prefix("-p=")
                .or_else(|| token.strip_prefix("--publish=")),
        };
        if let Some(mapping) = mapping {
            // `8080:80` or `127.0.0.1:8080:80`; the host port is the
            // second-to-last segment.
            let parts: Vec<&str> = mapping.split(':').collect();
            if parts.len() >= 2 {
                if let Ok(port) = parts[parts.len() - 2].parse::<u16>() {
                    ports.push(port);
                }
            }
        }
    }
    ports
}

/// Port of an http(s) URL without pulling in a URL parser.
fn url_port(url: &str) -> Option<u16> {
    let (scheme, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit('@').next()?;
    match host_port.rsplit_once(':') {
        Some((_, port)) => port.parse().ok(),
        None => match scheme {
            "http" => Some(80),
            "https" => Some(443),
            _ => None,
        },
    }
}

async fn check_tmux() -> CheckReport {
    let started = Instant::now();
    let mut cmd = Command::new("tmux");
    cmd.arg("-V");
    match run_with_timeout(cmd, PREFLIGHT_TIMEOUT, "tmux -V").await {
        Ok(output) if output.status.success() => CheckReport::passed("tmux", started),
        Ok(_) => CheckReport::failed(
            "tmux",
            started,
            "tmux exited with an error".to_string(),
            Some("install tmux".to_string()),
        ),
        Err(e) => CheckReport::failed("tmux", started, e, Some("install tmux".to_string())),
    }
}

async fn check_container_daemon() -> CheckReport {
    let started = Instant::now();
    let mut cmd = Command::new("docker");
    cmd.arg("info");
    match run_with_timeout(cmd, PREFLIGHT_TIMEOUT, "docker info").await {
        Ok(output) if output.status.success() => CheckReport::passed("container-daemon", started),
        Ok(output) => CheckReport::failed(
            "container-daemon",
            started,
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
            Some("start the container daemon".to_string()),
        ),
        Err(e) => CheckReport::failed(
            "container-daemon",
            started,
            e,
            Some("install a container engine".to_string()),
        ),
    }
}

async fn check_node_version() -> CheckReport {
    let started = Instant::now();
    let mut cmd = Command::new("node");
    cmd.arg("--version");
    let output = match run_with_timeout(cmd, PREFLIGHT_TIMEOUT, "node --version").await {
        Ok(output) if output.status.success() => output,
        Ok(_) | Err(_) => {
            return CheckReport::failed(
                "node-version",
                started,
                "node is not available".to_string(),
                Some(format!("install Node.js >= {NODE_MAJOR_REQUIRED}")),
            )
        }
    };

    let text = String::from_utf8_lossy(&output.stdout);
    let major = text
        .trim()
        .trim_start_matches('v')
        .split('.')
        .next()
        .and_then(|v| v.parse::<u32>().ok());

    match major {
        Some(major) if major >= NODE_MAJOR_REQUIRED => CheckReport::passed("node-version", started),
        Some(major) => CheckReport::failed(
            "node-version",
            started,
            format!("node v{major} found, v{NODE_MAJOR_REQUIRED}+ required"),
            Some(format!("upgrade Node.js to {NODE_MAJOR_REQUIRED} or newer")),
        ),
        None => CheckReport::failed(
            "node-version",
            started,
            format!("could not parse node version from '{}'", text.trim()),
            None,
        ),
    }
}

async fn check_port_free(port: u16) -> CheckReport {
    let name = format!("port-{port}");
    let started = Instant::now();
    match TcpListener::bind(("127.0.0.1", port)).await {
        Ok(listener) => {
            drop(listener);
            CheckReport::passed(name, started)
        }
        Err(_) => {
            let detail = port_holder(port)
                .await
                .unwrap_or_else(|| format!("port {port} is already in use"));
            CheckReport::failed(name, started, detail, Some("stop the conflicting process".into()))
        }
    }
}

async fn run_custom_check(check: &CustomCheck) -> Option<CheckReport> {
    if let Some(condition) = &check.condition {
        match run_shell_with_timeout(condition, PREFLIGHT_TIMEOUT, "check condition").await {
            Ok(output) if output.status.success() => {}
            _ => {
                debug!(check = %check.name, "condition not met, skipping");
                return None;
            }
        }
    }

    let started = Instant::now();
    let report = match run_shell_with_timeout(&check.command, PREFLIGHT_TIMEOUT, &check.name).await
    {
        Ok(output) if output.status.success() => CheckReport::passed(check.name.clone(), started),
        Ok(output) => {
            let error = check.error_msg.clone().unwrap_or_else(|| {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                if stderr.is_empty() {
                    format!("'{}' failed", check.command)
                } else {
                    stderr
                }
            });
            CheckReport::failed(check.name.clone(), started, error, check.fix_hint.clone())
        }
        Err(e) => CheckReport::failed(check.name.clone(), started, e, check.fix_hint.clone()),
    };
    Some(report)
}

#[cfg(test)]
#[path = "preflight_tests.rs"]
mod tests;
