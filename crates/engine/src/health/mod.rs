// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Readiness probing.
//!
//! A prober never errors: transport failures become `ok = false` with a
//! human-readable message. The polling loop retries until success, the
//! overall deadline, or the attempt cap.

mod custom;
mod http;
mod log_pattern;
mod port;
mod tcp;

pub use custom::CustomProber;
pub use http::HttpProber;
pub use log_pattern::LogPatternProber;
pub use port::port_holder;
pub use tcp::TcpProber;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use ork_core::ReadyStrategy;

/// Result of one probe attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub ok: bool,
    pub message: String,
}

impl ProbeOutcome {
    pub fn ready(message: impl Into<String>) -> Self {
        Self { ok: true, message: message.into() }
    }

    pub fn not_ready(message: impl Into<String>) -> Self {
        Self { ok: false, message: message.into() }
    }
}

/// One readiness strategy. Implementations cap each attempt at
/// [`PROBE_TIMEOUT`](ork_adapters::subprocess::PROBE_TIMEOUT) themselves.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self) -> ProbeOutcome;

    /// Fed every output line; only the log-pattern prober cares.
    fn observe(&self, _line: &str) {}

    /// Clear accumulated state on restart.
    fn reset(&self) {}
}

/// Why a readiness wait gave up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadinessError {
    #[error("not ready after {attempts} attempts ({elapsed_ms} ms)")]
    TimedOut { attempts: u32, elapsed_ms: u64 },

    #[error("readiness wait cancelled")]
    Cancelled,
}

/// Build the prober for a polled strategy.
///
/// `log_prober` is the runner's line-fed instance; it is shared so that
/// `observe` calls from the output reader and `probe` calls from the
/// polling loop see the same state. `ExitCode` is not polled and has no
/// prober.
pub fn prober_for(
    strategy: &ReadyStrategy,
    log_prober: Option<Arc<LogPatternProber>>,
) -> Option<Arc<dyn Prober>> {
    match strategy {
        ReadyStrategy::Http { url, expected_status } => {
            Some(Arc::new(HttpProber::new(url.clone(), *expected_status)))
        }
        ReadyStrategy::Tcp { host, port } => Some(Arc::new(TcpProber::new(host.clone(), *port))),
        ReadyStrategy::Custom { command } => Some(Arc::new(CustomProber::new(command.clone()))),
        ReadyStrategy::LogPattern { .. } => log_prober.map(|p| p as Arc<dyn Prober>),
        ReadyStrategy::ExitCode {} => None,
    }
}

/// Poll `prober` until it reports ready.
///
/// Retries at `interval` until success, cancellation, `max_attempts`, or
/// the overall `timeout`. Each attempt is reported through `on_attempt`.
/// Returns the number of attempts taken on success.
pub async fn wait_for_ready(
    prober: &dyn Prober,
    timeout: Duration,
    interval: Duration,
    max_attempts: u32,
    cancel: &CancellationToken,
    mut on_attempt: impl FnMut(u32, &ProbeOutcome) + Send,
) -> Result<u32, ReadinessError> {
    let started = Instant::now();
    let deadline = started + timeout;
    let mut attempts: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(ReadinessError::Cancelled);
        }

        attempts += 1;
        let outcome = tokio::select! {
            outcome = prober.probe() => outcome,
            _ = cancel.cancelled() => return Err(ReadinessError::Cancelled),
        };
        on_attempt(attempts, &outcome);

        if outcome.ok {
            return Ok(attempts);
        }

        let now = Instant::now();
        if attempts >= max_attempts || now + interval >= deadline {
            return Err(ReadinessError::TimedOut {
                attempts,
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = cancel.cancelled() => return Err(ReadinessError::Cancelled),
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
