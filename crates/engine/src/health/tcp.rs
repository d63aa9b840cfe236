// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP connect readiness probe.

use async_trait::async_trait;
use tokio::net::TcpStream;

use ork_adapters::subprocess::PROBE_TIMEOUT;

use super::port::{is_local_host, port_holder};
use super::{ProbeOutcome, Prober};

/// Ready once a TCP connection to `host:port` succeeds. The connection
/// is closed immediately after the handshake.
pub struct TcpProber {
    host: String,
    port: u16,
}

impl TcpProber {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self) -> ProbeOutcome {
        let target = (self.host.as_str(), self.port);
        match tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(target)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                ProbeOutcome::ready(format!("connected to {}:{}", self.host, self.port))
            }
            Ok(Err(e)) => {
                let mut message = format!("connect failed: {e}");
                if e.kind() == std::io::ErrorKind::ConnectionRefused && is_local_host(&self.host) {
                    if let Some(holder) = port_holder(self.port).await {
                        message.push_str(&format!("; {holder}"));
                    }
                }
                ProbeOutcome::not_ready(message)
            }
            Err(_) => ProbeOutcome::not_ready(format!(
                "connect to {}:{} timed out after {}s",
                self.host,
                self.port,
                PROBE_TIMEOUT.as_secs()
            )),
        }
    }
}

#[cfg(test)]
#[path = "tcp_tests.rs"]
mod tests;
