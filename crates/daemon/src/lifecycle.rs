// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and shutdown.
//!
//! Startup order matters: the socket binds before orchestration so a
//! second daemon for the same project fails fast, and the socket file is
//! removed on every exit path.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ork_adapters::UiSession;
use ork_core::Config;
use ork_engine::monitor::DEFAULT_UPDATE_INTERVAL;
use ork_engine::StatusMonitor;

use crate::env;
use crate::ipc::IpcServer;
use crate::orchestrator::{Orchestrator, OrchestratorError};

const LOG_CHANNEL_CAPACITY: usize = 1024;
const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Errors from daemon lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not bind socket {path}: {source}")]
    BindFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

/// A running daemon: orchestrator, IPC listener, and command loop.
pub struct Daemon<U: UiSession> {
    orchestrator: Arc<Orchestrator<U>>,
    socket_path: PathBuf,
    cancel: CancellationToken,
    serve_handle: JoinHandle<()>,
    ipc_handle: JoinHandle<()>,
}

impl<U: UiSession> std::fmt::Debug for Daemon<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("socket_path", &self.socket_path)
            .field("cancel", &self.cancel)
            .field("serve_handle", &self.serve_handle)
            .field("ipc_handle", &self.ipc_handle)
            .finish()
    }
}

/// Start the daemon for a validated config.
///
/// Returns once every wave is up. On failure the socket file is cleaned
/// up; processes that already started are left running for inspection.
pub async fn startup<U: UiSession>(config: Config, ui: U) -> Result<Daemon<U>, LifecycleError> {
    let socket_path = env::socket_path(&config.project_name);

    // Remove a stale socket from a dead daemon before binding.
    if socket_path.exists() {
        std::fs::remove_file(&socket_path)?;
    }
    let listener = UnixListener::bind(&socket_path)
        .map_err(|source| LifecycleError::BindFailed { path: socket_path.clone(), source })?;
    info!(path = %socket_path.display(), "status socket bound");

    let cancel = CancellationToken::new();
    let monitor =
        StatusMonitor::new(env::update_interval().unwrap_or(DEFAULT_UPDATE_INTERVAL));
    let (logs_tx, _) = broadcast::channel(LOG_CHANNEL_CAPACITY);
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

    let orchestrator = match Orchestrator::new(
        config,
        ui,
        monitor.clone(),
        logs_tx.clone(),
        cancel.clone(),
    ) {
        Ok(orchestrator) => Arc::new(orchestrator),
        Err(e) => {
            cleanup_socket(&socket_path);
            return Err(e.into());
        }
    };

    let ipc = IpcServer::new(listener, monitor, logs_tx, command_tx, cancel.clone());
    let ipc_handle = tokio::spawn(ipc.run());

    if let Err(e) = orchestrator.start().await {
        warn!(error = %e, "startup aborted");
        cleanup_socket(&socket_path);
        return Err(e.into());
    }

    let serve_handle = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.serve(command_rx).await })
    };

    Ok(Daemon { orchestrator, socket_path, cancel, serve_handle, ipc_handle })
}

impl<U: UiSession> Daemon<U> {
    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }

    pub fn orchestrator(&self) -> &Orchestrator<U> {
        &self.orchestrator
    }

    pub fn monitor(&self) -> &StatusMonitor {
        self.orchestrator.monitor()
    }

    /// Stop processes in reverse start order and tear everything down.
    /// The socket file is removed even when individual stops fail.
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        let result = self.orchestrator.shutdown().await;

        // shutdown() cancels the token; the loops drain on their own.
        self.cancel.cancel();
        let _ = self.serve_handle.await;
        let _ = self.ipc_handle.await;

        cleanup_socket(&self.socket_path);
        result?;
        Ok(())
    }
}

fn cleanup_socket(path: &std::path::Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "socket cleanup failed");
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
