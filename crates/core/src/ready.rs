// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Readiness check configuration.
//!
//! A process with no ready check is considered ready as soon as its child
//! is alive; otherwise one of the strategies below gates the transition
//! from `starting` to `running`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_expected_status() -> u16 {
    200
}

/// Strategy used to decide that a process is ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ReadyStrategy {
    /// GET `url` and compare the response status.
    Http {
        url: String,
        #[serde(default = "default_expected_status")]
        expected_status: u16,
    },
    /// Open a TCP connection to `host:port`.
    Tcp { host: String, port: u16 },
    /// Ready once a log line has matched `pattern`.
    LogPattern { pattern: String },
    /// Run a shell command; ready iff it exits 0.
    Custom { command: String },
    /// Ready iff the child itself terminates with exit code 0.
    ExitCode {},
}

impl ReadyStrategy {
    pub fn kind(&self) -> &'static str {
        match self {
            ReadyStrategy::Http { .. } => "http",
            ReadyStrategy::Tcp { .. } => "tcp",
            ReadyStrategy::LogPattern { .. } => "log-pattern",
            ReadyStrategy::Custom { .. } => "custom",
            ReadyStrategy::ExitCode {} => "exit-code",
        }
    }

    /// Whether readiness is driven by a polling loop (as opposed to the
    /// runner observing child exit).
    pub fn is_polled(&self) -> bool {
        !matches!(self, ReadyStrategy::ExitCode {})
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_max_attempts() -> u32 {
    60
}

/// A readiness strategy plus the polling knobs shared by all strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyCheck {
    #[serde(flatten)]
    pub strategy: ReadyStrategy,

    /// Overall deadline for the readiness loop.
    #[serde(default = "default_timeout", with = "crate::duration::serde_ms")]
    pub timeout: Duration,

    /// Delay between probe attempts.
    #[serde(default = "default_interval", with = "crate::duration::serde_ms")]
    pub interval: Duration,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl ReadyCheck {
    pub fn new(strategy: ReadyStrategy) -> Self {
        Self {
            strategy,
            timeout: default_timeout(),
            interval: default_interval(),
            max_attempts: default_max_attempts(),
        }
    }
}

#[cfg(test)]
#[path = "ready_tests.rs"]
mod tests;
