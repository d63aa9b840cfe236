// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line framing for the status socket.
//!
//! One JSON object per line. The reader enforces a line-length cap so a
//! misbehaving peer cannot balloon memory.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

/// Protocol errors. Connection-scoped; the server keeps running.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Line too long: {size} bytes (max {max})")]
    LineTooLong { size: usize, max: usize },

    #[error("Connection closed")]
    ConnectionClosed,
}

/// Maximum accepted line length (1 MB).
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Encode a message as a JSON line, including the trailing newline.
pub fn encode_line<T: Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes = serde_json::to_vec(msg)?;
    if bytes.len() > MAX_LINE_BYTES {
        return Err(ProtocolError::LineTooLong { size: bytes.len(), max: MAX_LINE_BYTES });
    }
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decode a single line into a message.
pub fn decode<T: DeserializeOwned>(line: &str) -> Result<T, ProtocolError> {
    Ok(serde_json::from_str(line)?)
}

/// Read one line from an async buffered reader.
///
/// Returns `ConnectionClosed` on clean EOF. Lines longer than
/// [`MAX_LINE_BYTES`] are an error, not a truncation.
pub async fn read_line<R: AsyncBufReadExt + Unpin>(
    reader: &mut R,
) -> Result<String, ProtocolError> {
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Err(ProtocolError::ConnectionClosed);
    }
    if line.len() > MAX_LINE_BYTES {
        return Err(ProtocolError::LineTooLong { size: line.len(), max: MAX_LINE_BYTES });
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}

/// Serialize a message and write it as one line.
pub async fn write_line<W, T>(writer: &mut W, msg: &T) -> Result<(), ProtocolError>
where
    W: AsyncWriteExt + Unpin,
    T: Serialize,
{
    let bytes = encode_line(msg)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "framing_tests.rs"]
mod tests;
