// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP readiness probe.

use async_trait::async_trait;

use ork_adapters::subprocess::PROBE_TIMEOUT;

use super::port::{is_local_host, port_holder};
use super::{ProbeOutcome, Prober};

/// GET a URL and compare the response status against the expectation.
/// Redirects are not followed; the first response decides.
pub struct HttpProber {
    url: String,
    expected_status: u16,
    client: reqwest::Client,
    /// Host/port for the occupied-port annotation on connection refusal.
    local_port: Option<u16>,
}

impl HttpProber {
    pub fn new(url: String, expected_status: u16) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_default();

        let local_port = reqwest::Url::parse(&url).ok().and_then(|parsed| {
            let host = parsed.host_str()?;
            is_local_host(host).then(|| parsed.port_or_known_default())?
        });

        Self { url, expected_status, client, local_port }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self) -> ProbeOutcome {
        match self.client.get(&self.url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if status == self.expected_status {
                    ProbeOutcome::ready(format!("HTTP {status}"))
                } else {
                    ProbeOutcome::not_ready(format!(
                        "HTTP {status} (expected {})",
                        self.expected_status
                    ))
                }
            }
            Err(e) => {
                let mut message = format!("request failed: {e}");
                if e.is_connect() {
                    if let Some(port) = self.local_port {
                        if let Some(holder) = port_holder(port).await {
                            message.push_str(&format!("; {holder}"));
                        }
                    }
                }
                ProbeOutcome::not_ready(message)
            }
        }
    }
}
