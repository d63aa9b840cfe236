// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ork-engine: process runners, health probing, hooks, preflight checks,
//! and status aggregation for the orckit supervisor.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod health;
pub mod hook;
pub mod metrics;
pub mod monitor;
pub mod preflight;
pub mod runner;

pub use health::{wait_for_ready, ProbeOutcome, Prober, ReadinessError};
pub use hook::{run_hook, HookPhase, HookReport};
pub use monitor::StatusMonitor;
pub use preflight::{run_preflight, CheckReport};
pub use runner::{ProcessRunner, RunnerError};
