// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level supervisor configuration and validation.
//!
//! The external front-end may parse YAML or JSON; this crate accepts the
//! canonical TOML form and validates the resulting graph either way.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::process::ProcessConfig;
use crate::ready::ReadyStrategy;
use crate::resolver::{self, ResolveError};

/// Shell commands run at the edges of the whole orchestration run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalHooks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_start_all: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_start_all: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_stop_all: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_stop_all: Option<String>,
}

/// A user-defined preflight check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCheck {
    pub name: String,
    /// Shell command; non-zero exit fails the check.
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_hint: Option<String>,
    /// Shell command gating the check; skipped unless it exits 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreflightConfig {
    #[serde(default)]
    pub checks: Vec<CustomCheck>,
}

/// Errors surfaced by config load/validation. All are fatal for the run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("project_name must not be empty")]
    EmptyProjectName,

    #[error("process name must not be empty")]
    EmptyName,

    #[error("process '{name}': command must not be empty")]
    EmptyCommand { name: String },

    #[error("process '{name}': expected_status {status} is not a valid HTTP status (100-599)")]
    InvalidExpectedStatus { name: String, status: u16 },

    #[error("process '{name}': {field} must be greater than zero")]
    ZeroDuration { name: String, field: &'static str },

    #[error("process '{name}': log pattern '{pattern}' is not a valid regex")]
    InvalidPattern { name: String, pattern: String },

    #[error("process '{name}': output filter pattern '{pattern}' is not a valid regex")]
    InvalidFilterPattern { name: String, pattern: String },

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// The validated declarative graph handed to the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub project_name: String,

    /// Ordered process map; the key is the process name.
    #[serde(default)]
    pub processes: IndexMap<String, ProcessConfig>,

    #[serde(default, skip_serializing_if = "is_default_hooks")]
    pub hooks: GlobalHooks,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preflight: Option<PreflightConfig>,
}

fn is_default_hooks(hooks: &GlobalHooks) -> bool {
    *hooks == GlobalHooks::default()
}

impl Config {
    /// Parse and validate the canonical TOML form.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the graph invariants and fill in derived fields.
    ///
    /// Checks every invariant the data model promises: non-empty names
    /// and commands, HTTP status range, positive timeouts, valid regex
    /// patterns, known dependency targets, and an acyclic graph.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.project_name.trim().is_empty() {
            return Err(ConfigError::EmptyProjectName);
        }

        for (name, process) in self.processes.iter_mut() {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyName);
            }
            process.name = name.clone();

            if process.command.trim().is_empty() {
                return Err(ConfigError::EmptyCommand { name: name.clone() });
            }

            if let Some(check) = &process.ready_check {
                if check.timeout.is_zero() {
                    return Err(ConfigError::ZeroDuration {
                        name: name.clone(),
                        field: "ready_check.timeout",
                    });
                }
                if check.interval.is_zero() {
                    return Err(ConfigError::ZeroDuration {
                        name: name.clone(),
                        field: "ready_check.interval",
                    });
                }
                match &check.strategy {
                    ReadyStrategy::Http { expected_status, .. } => {
                        if !(100..=599).contains(expected_status) {
                            return Err(ConfigError::InvalidExpectedStatus {
                                name: name.clone(),
                                status: *expected_status,
                            });
                        }
                    }
                    ReadyStrategy::LogPattern { pattern } => {
                        if regex::Regex::new(pattern).is_err() {
                            return Err(ConfigError::InvalidPattern {
                                name: name.clone(),
                                pattern: pattern.clone(),
                            });
                        }
                    }
                    _ => {}
                }
            }

            if let Some(filter) = &process.output_filter {
                if let Some(pattern) = filter.first_invalid_pattern() {
                    return Err(ConfigError::InvalidFilterPattern {
                        name: name.clone(),
                        pattern: pattern.to_string(),
                    });
                }
            }
        }

        // Unknown dependencies and cycles surface here.
        resolver::resolve(&self.processes)?;

        Ok(())
    }

    /// True when any process runs under a container engine.
    pub fn has_container_processes(&self) -> bool {
        self.processes
            .values()
            .any(|p| p.kind == crate::process::ProcessKind::Container)
    }

    /// True when any process needs a Node.js runtime.
    pub fn has_node_processes(&self) -> bool {
        self.processes.values().any(|p| p.kind.needs_node())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
