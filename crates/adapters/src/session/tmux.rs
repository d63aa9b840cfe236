// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux-backed UI session.
//!
//! Windows map to process categories, panes to processes. All tmux
//! invocations go through [`run_with_timeout`] so a wedged tmux server
//! cannot stall the orchestrator.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::subprocess::{run_with_timeout, TMUX_TIMEOUT};

use super::{SessionError, UiSession};

/// UI session driven by the `tmux` binary.
#[derive(Debug, Clone)]
pub struct TmuxUiSession {
    session: String,
}

impl TmuxUiSession {
    /// Session names are prefixed so `tmux kill-session` can never hit a
    /// user's own session by accident.
    pub fn new(project: &str) -> Self {
        Self { session: format!("orckit-{project}") }
    }

    pub fn session_name(&self) -> &str {
        &self.session
    }

    async fn tmux(&self, args: &[&str], description: &str) -> Result<(), SessionError> {
        let mut cmd = Command::new("tmux");
        cmd.args(args);
        let output = run_with_timeout(cmd, TMUX_TIMEOUT, description)
            .await
            .map_err(SessionError::CommandFailed)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SessionError::CommandFailed(format!(
                "{description}: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn window_target(&self, category: &str) -> String {
        format!("{}:{}", self.session, category)
    }
}

#[async_trait]
impl UiSession for TmuxUiSession {
    async fn create_session(&self) -> Result<(), SessionError> {
        debug!(session = %self.session, "creating tmux session");
        self.tmux(
            &["new-session", "-d", "-s", &self.session, "-n", "overview"],
            "tmux new-session",
        )
        .await
    }

    async fn create_window(&self, category: &str, title: &str) -> Result<(), SessionError> {
        self.tmux(
            &["new-window", "-d", "-t", &self.session, "-n", category],
            "tmux new-window",
        )
        .await?;
        let target = self.window_target(category);
        // Window title doubles as the category label in the status bar.
        self.tmux(
            &["rename-window", "-t", &target, title],
            "tmux rename-window",
        )
        .await
    }

    async fn create_pane(
        &self,
        category: &str,
        process: &str,
        command: &str,
        workdir: Option<&Path>,
    ) -> Result<(), SessionError> {
        let target = self.window_target(category);
        let mut args: Vec<String> =
            vec!["split-window".into(), "-d".into(), "-t".into(), target.clone()];
        if let Some(dir) = workdir {
            args.push("-c".into());
            args.push(dir.display().to_string());
        }
        args.push(command.to_string());
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.tmux(&arg_refs, "tmux split-window").await?;

        self.tmux(
            &["select-pane", "-t", &target, "-T", process],
            "tmux select-pane",
        )
        .await?;
        self.tmux(
            &["select-layout", "-t", &target, "tiled"],
            "tmux select-layout",
        )
        .await
    }

    async fn update_overview(&self, text: &str) -> Result<(), SessionError> {
        // Status bars reject newlines; keep the first line only.
        let line = text.lines().next().unwrap_or_default();
        self.tmux(
            &[
                "set-option",
                "-t",
                &self.session,
                "status-right",
                line,
            ],
            "tmux set-option",
        )
        .await
    }

    async fn attach(&self) -> Result<(), SessionError> {
        let mut cmd = Command::new("tmux");
        cmd.args(["has-session", "-t", &self.session]);
        let output = run_with_timeout(cmd, TMUX_TIMEOUT, "tmux has-session")
            .await
            .map_err(SessionError::CommandFailed)?;
        if !output.status.success() {
            return Err(SessionError::NotFound(self.session.clone()));
        }
        Ok(())
    }

    async fn kill_session(&self) -> Result<(), SessionError> {
        self.tmux(&["kill-session", "-t", &self.session], "tmux kill-session")
            .await
    }
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
