// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-process declarative configuration.

use std::path::PathBuf;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::filter::OutputFilter;
use crate::ready::ReadyCheck;

/// Kind of process being supervised. Picks the runner behavior and,
/// for bundlers, which build-output parser is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessKind {
    Shell,
    Container,
    Node,
    BundlerWebpack,
    BundlerAngular,
    BundlerVite,
    BuildOnce,
}

impl ProcessKind {
    /// True for kinds that can emit structured build events.
    pub fn is_bundler(&self) -> bool {
        matches!(
            self,
            ProcessKind::BundlerWebpack | ProcessKind::BundlerAngular | ProcessKind::BundlerVite
        )
    }

    /// True for kinds that require a Node.js runtime.
    pub fn needs_node(&self) -> bool {
        matches!(self, ProcessKind::Node) || self.is_bundler()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessKind::Shell => "shell",
            ProcessKind::Container => "container",
            ProcessKind::Node => "node",
            ProcessKind::BundlerWebpack => "bundler-webpack",
            ProcessKind::BundlerAngular => "bundler-angular",
            ProcessKind::BundlerVite => "bundler-vite",
            ProcessKind::BuildOnce => "build-once",
        }
    }
}

impl std::fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the runner does when the child exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    #[default]
    Never,
    OnFailure,
    Always,
}

impl RestartPolicy {
    /// Whether an exit with the given success flag is eligible for restart.
    /// The retry budget is checked by the runner, not here.
    pub fn wants_restart(&self, exited_clean: bool) -> bool {
        match self {
            RestartPolicy::Never => false,
            RestartPolicy::OnFailure => !exited_clean,
            RestartPolicy::Always => true,
        }
    }
}

/// How much the runner understands of the child's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntegrationMode {
    /// Output is opaque text.
    #[default]
    Surface,
    /// Structured build events are extracted from the output stream.
    Deep,
}

/// Shell commands run synchronously around a process's lifecycle edges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessHooks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_stop: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_stop: Option<String>,
}

impl ProcessHooks {
    pub fn is_empty(&self) -> bool {
        self.pre_start.is_none()
            && self.post_start.is_none()
            && self.pre_stop.is_none()
            && self.post_stop.is_none()
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_restart_delay() -> Duration {
    Duration::from_secs(1)
}

/// One supervised process. Immutable once the config is validated.
///
/// The `name` field is filled in from the map key during
/// [`Config::validate`](crate::Config::validate) and is not expected in
/// the source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    #[serde(default)]
    pub name: String,

    /// Grouping key for status output and the external UI.
    #[serde(default)]
    pub category: String,

    #[serde(rename = "type")]
    pub kind: ProcessKind,

    /// Shell command line, run under `sh -c`.
    pub command: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,

    /// Extra environment; merged over the parent's, config wins on conflict.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, String>,

    /// Names of processes that must be running before this one starts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub restart_policy: RestartPolicy,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_restart_delay", with = "crate::duration::serde_ms")]
    pub restart_delay: Duration,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_check: Option<ReadyCheck>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_filter: Option<OutputFilter>,

    #[serde(default, skip_serializing_if = "ProcessHooks::is_empty")]
    pub hooks: ProcessHooks,

    #[serde(default)]
    pub integration_mode: IntegrationMode,
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
