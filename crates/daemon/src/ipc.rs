// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC listener for status viewers.
//!
//! Accepts any number of clients on the project's Unix socket. Each
//! client gets a reader task (commands in) and a writer loop (status,
//! logs, and replies out). Status updates are coalesced latest-wins per
//! client, so a stalled viewer can never block the status monitor.

use serde_json::Value;
use tokio::io::BufReader;
use tokio::net::{unix::OwnedWriteHalf, UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use ork_core::{now_ms, Snapshot};
use ork_engine::StatusMonitor;
use ork_wire::{
    decode, read_line, write_line, ClientMessage, CommandAction, IpcProcessInfo, ProtocolError,
    ServerMessage,
};

/// A viewer command forwarded to the orchestrator, with a reply slot.
pub struct IpcCommand {
    pub action: CommandAction,
    pub process_name: String,
    pub options: Option<Value>,
    pub reply: oneshot::Sender<CommandReply>,
}

/// What the orchestrator answered.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandReply {
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
}

impl CommandReply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), data: None }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), data: None }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Project a monitor snapshot onto the wire shape.
pub fn status_update(snapshot: &Snapshot) -> ServerMessage {
    let now = now_ms();
    ServerMessage::StatusUpdate {
        timestamp: snapshot.timestamp_ms,
        processes: snapshot
            .processes
            .iter()
            .map(|info| IpcProcessInfo::from_info(info, now))
            .collect(),
        system_metrics: snapshot.system.clone().filter(|m| !m.is_empty()),
    }
}

/// Listener task for the status socket.
pub struct IpcServer {
    listener: UnixListener,
    monitor: StatusMonitor,
    logs: broadcast::Sender<ServerMessage>,
    commands: mpsc::Sender<IpcCommand>,
    cancel: CancellationToken,
}

impl IpcServer {
    pub fn new(
        listener: UnixListener,
        monitor: StatusMonitor,
        logs: broadcast::Sender<ServerMessage>,
        commands: mpsc::Sender<IpcCommand>,
        cancel: CancellationToken,
    ) -> Self {
        Self { listener, monitor, logs, commands, cancel }
    }

    /// Accept connections until shutdown, spawning a task per client.
    pub async fn run(self) {
        // Latest-wins snapshot relay: the watch channel keeps only the
        // most recent update for clients that fall behind.
        let (snap_tx, snap_rx) = watch::channel::<Option<ServerMessage>>(None);
        {
            let mut snapshots = self.monitor.subscribe();
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        received = snapshots.recv() => match received {
                            Ok(snapshot) => {
                                snap_tx.send_replace(Some(status_update(&snapshot)));
                            }
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                trace!(skipped, "snapshot relay lagged");
                            }
                            Err(broadcast::error::RecvError::Closed) => return,
                        },
                        _ = cancel.cancelled() => return,
                    }
                }
            });
        }

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let client = Client {
                            snapshots: snap_rx.clone(),
                            logs: self.logs.subscribe(),
                            commands: self.commands.clone(),
                            cancel: self.cancel.clone(),
                        };
                        tokio::spawn(async move {
                            if let Err(e) = client.handle(stream).await {
                                log_client_error(e);
                            }
                        });
                    }
                    Err(e) => error!("accept error: {}", e),
                },
                _ = self.cancel.cancelled() => {
                    debug!("IPC listener shutting down");
                    return;
                }
            }
        }
    }
}

fn log_client_error(e: ProtocolError) {
    match e {
        ProtocolError::ConnectionClosed => debug!("client disconnected"),
        other => warn!("client connection error: {}", other),
    }
}

struct Client {
    snapshots: watch::Receiver<Option<ServerMessage>>,
    logs: broadcast::Receiver<ServerMessage>,
    commands: mpsc::Sender<IpcCommand>,
    cancel: CancellationToken,
}

impl Client {
    async fn handle(mut self, stream: UnixStream) -> Result<(), ProtocolError> {
        let (read_half, mut write_half) = stream.into_split();

        // Replies flow from the reader task to the writer loop.
        let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(64);
        let commands = self.commands.clone();
        let reader = tokio::spawn(async move {
            let mut reader = BufReader::new(read_half);
            loop {
                let line = match read_line(&mut reader).await {
                    Ok(line) => line,
                    Err(_) => return,
                };
                // Unparsable lines are ignored, not fatal.
                let message: ClientMessage = match decode(&line) {
                    Ok(message) => message,
                    Err(_) => {
                        debug!("ignoring unparsable line from client");
                        continue;
                    }
                };
                let ClientMessage::Command { action, process_name, options } = message;

                let (reply_tx, reply_rx) = oneshot::channel();
                let command =
                    IpcCommand { action, process_name, options, reply: reply_tx };
                if commands.send(command).await.is_err() {
                    return;
                }
                let reply = match reply_rx.await {
                    Ok(reply) => reply,
                    Err(_) => CommandReply::fail("orchestrator unavailable"),
                };
                let response = ServerMessage::CommandResponse {
                    success: reply.success,
                    message: reply.message,
                    data: reply.data,
                };
                if out_tx.send(response).await.is_err() {
                    return;
                }
            }
        });

        let result = self.write_loop(&mut write_half, &mut out_rx).await;
        reader.abort();
        result
    }

    async fn write_loop(
        &mut self,
        writer: &mut OwnedWriteHalf,
        replies: &mut mpsc::Receiver<ServerMessage>,
    ) -> Result<(), ProtocolError> {
        // New clients immediately see the current state.
        let initial = self.snapshots.borrow_and_update().clone();
        if let Some(message) = initial {
            write_line(writer, &message).await?;
        }

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),

                changed = self.snapshots.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                    let latest = self.snapshots.borrow_and_update().clone();
                    if let Some(message) = latest {
                        write_line(writer, &message).await?;
                    }
                }

                log = self.logs.recv() => match log {
                    Ok(message) => write_line(writer, &message).await?,
                    // A lagging client just misses old log lines.
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return Ok(()),
                },

                reply = replies.recv() => match reply {
                    Some(message) => write_line(writer, &message).await?,
                    None => return Ok(()),
                },
            }
        }
    }
}

#[cfg(test)]
#[path = "ipc_tests.rs"]
mod tests;
