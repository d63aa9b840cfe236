// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log-pattern readiness probe.
//!
//! The runner feeds every output line through `observe`; the probe is
//! satisfied once any line has matched, and stays satisfied until the
//! next restart resets it.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use regex::Regex;

use super::{ProbeOutcome, Prober};

pub struct LogPatternProber {
    pattern: Regex,
    matched: AtomicBool,
}

impl LogPatternProber {
    pub fn new(pattern: Regex) -> Self {
        Self { pattern, matched: AtomicBool::new(false) }
    }

    pub fn has_matched(&self) -> bool {
        self.matched.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Prober for LogPatternProber {
    async fn probe(&self) -> ProbeOutcome {
        if self.has_matched() {
            ProbeOutcome::ready(format!("log matched /{}/", self.pattern))
        } else {
            ProbeOutcome::not_ready(format!("waiting for log line matching /{}/", self.pattern))
        }
    }

    fn observe(&self, line: &str) {
        if !self.has_matched() && self.pattern.is_match(line) {
            self.matched.store(true, Ordering::Release);
        }
    }

    fn reset(&self) {
        self.matched.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "log_pattern_tests.rs"]
mod tests;
