// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol for status-viewer communication.
//!
//! Wire format: one JSON object per line, `\n`-terminated, UTF-8.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod framing;
mod info;
mod message;

pub use framing::{
    decode, encode_line, read_line, write_line, ProtocolError, MAX_LINE_BYTES,
};
pub use info::{BuildInfo, IpcProcessInfo};
pub use message::{ClientMessage, CommandAction, LogLevel, ServerMessage};
