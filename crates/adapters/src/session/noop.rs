// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op session adapter for when the UI is disabled.

use super::{SessionError, UiSession};
use async_trait::async_trait;
use std::path::Path;

/// Session adapter that does nothing.
///
/// Used when the terminal UI is disabled or in headless deployments.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpUiSession;

impl NoOpUiSession {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UiSession for NoOpUiSession {
    fn enabled(&self) -> bool {
        false
    }

    async fn create_session(&self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn create_window(&self, _category: &str, _title: &str) -> Result<(), SessionError> {
        Ok(())
    }

    async fn create_pane(
        &self,
        _category: &str,
        _process: &str,
        _command: &str,
        _workdir: Option<&Path>,
    ) -> Result<(), SessionError> {
        Ok(())
    }

    async fn update_overview(&self, _text: &str) -> Result<(), SessionError> {
        Ok(())
    }

    async fn attach(&self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn kill_session(&self) -> Result<(), SessionError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "noop_tests.rs"]
mod tests;
