// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build-output parsing for bundler processes.
//!
//! Deep mode extracts structured events from the child's output; surface
//! mode falls back to text patterns where the tool prints recognizable
//! lines. Malformed structured lines are dropped, never an error.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use ork_core::{IntegrationMode, ProcessKind};

/// Sentinel prefixing structured webpack plugin output.
const WEBPACK_EVENT_SENTINEL: &str = "[EVENT] ";

/// Angular CLI percentage lines, e.g. `35% building modules`.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static ANGULAR_PROGRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)% building").expect("constant regex pattern is valid"));

/// Vite startup banner, e.g. `ready in 432 ms`.
#[allow(clippy::expect_used)]
static VITE_READY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ready in (\d+)\s*ms").expect("constant regex pattern is valid"));

/// Structured build happenings extracted from one output line.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent {
    Start,
    Progress(u8),
    Stats { errors: u32, warnings: u32 },
    Complete { success: bool, duration_ms: Option<u64> },
    Failed,
}

/// Per-kind line parser. Stateless; safe to call from the reader task.
pub enum BuildParser {
    Webpack { deep: bool },
    Angular { deep: bool },
    Vite,
    None,
}

impl BuildParser {
    pub fn for_process(kind: ProcessKind, mode: IntegrationMode) -> Self {
        let deep = mode == IntegrationMode::Deep;
        match kind {
            ProcessKind::BundlerWebpack => BuildParser::Webpack { deep },
            ProcessKind::BundlerAngular => BuildParser::Angular { deep },
            ProcessKind::BundlerVite => BuildParser::Vite,
            _ => BuildParser::None,
        }
    }

    /// Events triggered by one output line. Usually empty.
    pub fn parse_line(&self, line: &str) -> Vec<BuildEvent> {
        match self {
            BuildParser::Webpack { deep } => parse_webpack(line, *deep),
            BuildParser::Angular { deep } => parse_angular(line, *deep),
            BuildParser::Vite => parse_vite(line),
            BuildParser::None => Vec::new(),
        }
    }
}

/// Webpack: a companion plugin prefixes structured lines with
/// `[EVENT] {"kind": ..., "payload": ...}`. Surface mode has no
/// recognizable text output.
fn parse_webpack(line: &str, deep: bool) -> Vec<BuildEvent> {
    if !deep {
        return Vec::new();
    }
    let Some(json) = line.trim_start().strip_prefix(WEBPACK_EVENT_SENTINEL) else {
        return Vec::new();
    };
    let Ok(value) = serde_json::from_str::<Value>(json) else {
        return Vec::new();
    };
    let payload = &value["payload"];
    match value["kind"].as_str() {
        Some("build-start") => vec![BuildEvent::Start],
        Some("build-progress") => payload["value"]
            .as_u64()
            .or_else(|| payload["progress"].as_u64())
            .map(|v| vec![BuildEvent::Progress(v.min(100) as u8)])
            .unwrap_or_default(),
        Some("build-stats") => vec![BuildEvent::Stats {
            errors: payload["errors"].as_u64().unwrap_or(0) as u32,
            warnings: payload["warnings"].as_u64().unwrap_or(0) as u32,
        }],
        Some("build-complete") => vec![BuildEvent::Complete {
            success: payload["success"].as_bool().unwrap_or(true),
            duration_ms: payload["duration_ms"].as_u64().or_else(|| payload["time"].as_u64()),
        }],
        Some("build-failed") => vec![BuildEvent::Failed],
        _ => Vec::new(),
    }
}

/// Angular: deep mode is one JSON object per line; surface mode matches
/// the CLI's human-readable progress lines.
fn parse_angular(line: &str, deep: bool) -> Vec<BuildEvent> {
    if deep {
        let Ok(value) = serde_json::from_str::<Value>(line.trim()) else {
            return Vec::new();
        };
        return match value["type"].as_str() {
            Some("build-start") => vec![BuildEvent::Start],
            Some("build-progress") => value["progress"]
                .as_u64()
                .map(|v| vec![BuildEvent::Progress(v.min(100) as u8)])
                .unwrap_or_default(),
            Some("build-complete") => {
                let errors = value["errors"].as_array().map(Vec::len).unwrap_or(0) as u32;
                let warnings = value["warnings"].as_array().map(Vec::len).unwrap_or(0) as u32;
                vec![
                    BuildEvent::Stats { errors, warnings },
                    BuildEvent::Complete {
                        success: value["success"].as_bool().unwrap_or(errors == 0),
                        duration_ms: value["time"].as_u64(),
                    },
                ]
            }
            Some("build-error") => vec![BuildEvent::Failed],
            _ => Vec::new(),
        };
    }

    if let Some(caps) = ANGULAR_PROGRESS.captures(line) {
        if let Some(value) = caps.get(1).and_then(|m| m.as_str().parse::<u64>().ok()) {
            return vec![BuildEvent::Progress(value.min(100) as u8)];
        }
    }
    if line.contains("Compiled successfully.") {
        return vec![BuildEvent::Complete { success: true, duration_ms: None }];
    }
    if line.contains("ERROR in") || line.contains("Failed to compile") {
        return vec![BuildEvent::Failed];
    }
    if line.contains("Compiling") || line.contains("Building") {
        return vec![BuildEvent::Start];
    }
    Vec::new()
}

/// Vite prints the same patterns in both modes.
fn parse_vite(line: &str) -> Vec<BuildEvent> {
    if let Some(caps) = VITE_READY.captures(line) {
        let duration_ms = caps.get(1).and_then(|m| m.as_str().parse::<u64>().ok());
        return vec![BuildEvent::Complete { success: true, duration_ms }];
    }
    if line.contains("Local:") {
        return vec![BuildEvent::Complete { success: true, duration_ms: None }];
    }
    if line.contains("hmr update") || line.contains("page reload") {
        return vec![BuildEvent::Start];
    }
    if line.to_ascii_lowercase().contains("error") {
        return vec![BuildEvent::Failed];
    }
    Vec::new()
}

/// Deep-mode flag injection: webpack and angular commands get their
/// structured-output flag appended, but only when the user's command does
/// not already mention the flag.
pub fn deep_mode_command(kind: ProcessKind, mode: IntegrationMode, command: &str) -> String {
    if mode != IntegrationMode::Deep {
        return command.to_string();
    }
    match kind {
        ProcessKind::BundlerAngular => append_flag_if_absent(command, "--json"),
        ProcessKind::BundlerWebpack => append_flag_if_absent(command, "--progress=false"),
        _ => command.to_string(),
    }
}

fn append_flag_if_absent(command: &str, flag: &str) -> String {
    let name = flag.split('=').next().unwrap_or(flag);
    let mentioned = command
        .split_whitespace()
        .any(|token| token == name || token.starts_with(&format!("{name}=")));
    if mentioned {
        command.to_string()
    } else {
        format!("{command} {flag}")
    }
}

#[cfg(test)]
#[path = "build_tests.rs"]
mod tests;
