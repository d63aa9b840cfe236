// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message shapes exchanged over the status socket.

use ork_core::SystemMetrics;
use serde::{Deserialize, Serialize};

use crate::info::IpcProcessInfo;

/// Stream a log message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Stdout,
    Stderr,
}

/// Server → client messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Published on every status-monitor snapshot.
    StatusUpdate {
        timestamp: u64,
        processes: Vec<IpcProcessInfo>,
        #[serde(
            rename = "systemMetrics",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        system_metrics: Option<SystemMetrics>,
    },

    /// One filtered output line.
    Log {
        #[serde(rename = "processName")]
        process_name: String,
        level: LogLevel,
        content: String,
        timestamp: u64,
    },

    /// Reply to a client command.
    CommandResponse {
        success: bool,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
}

/// Actions a viewer may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandAction {
    Start,
    Stop,
    Restart,
    Logs,
}

impl CommandAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandAction::Start => "start",
            CommandAction::Stop => "stop",
            CommandAction::Restart => "restart",
            CommandAction::Logs => "logs",
        }
    }
}

impl std::fmt::Display for CommandAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client → server messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Command {
        action: CommandAction,
        #[serde(rename = "processName")]
        process_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<serde_json::Value>,
    },
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
