// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Custom shell-command readiness probe.

use async_trait::async_trait;

use ork_adapters::subprocess::{run_shell_with_timeout, PROBE_TIMEOUT};

use super::{ProbeOutcome, Prober};

/// Ready once the configured command exits 0.
pub struct CustomProber {
    command: String,
}

impl CustomProber {
    pub fn new(command: String) -> Self {
        Self { command }
    }
}

#[async_trait]
impl Prober for CustomProber {
    async fn probe(&self) -> ProbeOutcome {
        match run_shell_with_timeout(&self.command, PROBE_TIMEOUT, "ready check").await {
            Ok(output) if output.status.success() => ProbeOutcome::ready("check passed"),
            Ok(output) => ProbeOutcome::not_ready(match output.status.code() {
                Some(code) => format!("check exited with code {code}"),
                None => "check terminated by signal".to_string(),
            }),
            Err(message) => ProbeOutcome::not_ready(message),
        }
    }
}

#[cfg(test)]
#[path = "custom_tests.rs"]
mod tests;
