// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake UI session recording calls for assertions in tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{SessionError, UiSession};

/// One recorded call on the fake session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCall {
    CreateSession,
    CreateWindow { category: String, title: String },
    CreatePane { category: String, process: String, command: String, workdir: Option<PathBuf> },
    UpdateOverview { text: String },
    Attach,
    KillSession,
}

/// UI session that records every call and never fails.
#[derive(Debug, Clone, Default)]
pub struct FakeUiSession {
    calls: Arc<Mutex<Vec<SessionCall>>>,
}

impl FakeUiSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SessionCall> {
        self.calls.lock().clone()
    }

    pub fn session_created(&self) -> bool {
        self.calls.lock().iter().any(|c| *c == SessionCall::CreateSession)
    }

    pub fn session_killed(&self) -> bool {
        self.calls.lock().iter().any(|c| *c == SessionCall::KillSession)
    }

    fn record(&self, call: SessionCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl UiSession for FakeUiSession {
    fn enabled(&self) -> bool {
        // Fakes record calls but are not a real multiplexer.
        false
    }

    async fn create_session(&self) -> Result<(), SessionError> {
        self.record(SessionCall::CreateSession);
        Ok(())
    }

    async fn create_window(&self, category: &str, title: &str) -> Result<(), SessionError> {
        self.record(SessionCall::CreateWindow {
            category: category.to_string(),
            title: title.to_string(),
        });
        Ok(())
    }

    async fn create_pane(
        &self,
        category: &str,
        process: &str,
        command: &str,
        workdir: Option<&Path>,
    ) -> Result<(), SessionError> {
        self.record(SessionCall::CreatePane {
            category: category.to_string(),
            process: process.to_string(),
            command: command.to_string(),
            workdir: workdir.map(Path::to_path_buf),
        });
        Ok(())
    }

    async fn update_overview(&self, text: &str) -> Result<(), SessionError> {
        self.record(SessionCall::UpdateOverview { text: text.to_string() });
        Ok(())
    }

    async fn attach(&self) -> Result<(), SessionError> {
        self.record(SessionCall::Attach);
        Ok(())
    }

    async fn kill_session(&self) -> Result<(), SessionError> {
        self.record(SessionCall::KillSession);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
