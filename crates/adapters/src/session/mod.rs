// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal-multiplexer session adapters.
//!
//! The orchestrator drives the external UI exclusively through the
//! [`UiSession`] trait; a no-op implementation is used when the UI is
//! disabled.

mod noop;
mod tmux;

pub use noop::NoOpUiSession;
pub use tmux::TmuxUiSession;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeUiSession, SessionCall};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// Adapter for the terminal-multiplexer status UI.
#[async_trait]
pub trait UiSession: Clone + Send + Sync + 'static {
    /// Whether this adapter drives a real multiplexer. Gates the
    /// multiplexer preflight check; the lifecycle calls themselves are
    /// safe to make either way.
    fn enabled(&self) -> bool {
        true
    }

    /// Create the session this project's windows live in.
    async fn create_session(&self) -> Result<(), SessionError>;

    /// Create a window for a process category.
    async fn create_window(&self, category: &str, title: &str) -> Result<(), SessionError>;

    /// Create a pane in a category window showing one process.
    async fn create_pane(
        &self,
        category: &str,
        process: &str,
        command: &str,
        workdir: Option<&Path>,
    ) -> Result<(), SessionError>;

    /// Replace the overview text shown in the session status line.
    async fn update_overview(&self, text: &str) -> Result<(), SessionError>;

    /// Verify the session can be attached to. The actual terminal attach
    /// is driven by the CLI front-end, not the daemon.
    async fn attach(&self) -> Result<(), SessionError>;

    /// Tear the session down.
    async fn kill_session(&self) -> Result<(), SessionError>;
}
