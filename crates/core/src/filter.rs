// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output filtering applied to every stdout/stderr line before it is
//! exposed to subscribers.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Declarative filter config as it appears in the process entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputFilter {
    /// Lines matching any of these patterns are dropped.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suppress: Vec<String>,

    /// When non-empty, only lines matching at least one pattern pass.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    /// Matching lines are wrapped in an ANSI highlight.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlight: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    #[serde(default)]
    pub timestamps: bool,

    /// Cap on the process's retained log ring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lines: Option<usize>,
}

impl OutputFilter {
    /// Compile the patterns. Pattern validity is also checked at config
    /// validation, so a failure here means the filter was built by hand.
    pub fn compile(&self) -> Result<LineFilter, regex::Error> {
        Ok(LineFilter {
            suppress: compile_all(&self.suppress)?,
            include: compile_all(&self.include)?,
            highlight: compile_all(&self.highlight)?,
            prefix: self.prefix.clone(),
            timestamps: self.timestamps,
        })
    }

    /// First invalid pattern in the filter, if any.
    pub fn first_invalid_pattern(&self) -> Option<&str> {
        self.suppress
            .iter()
            .chain(&self.include)
            .chain(&self.highlight)
            .find(|p| Regex::new(p).is_err())
            .map(String::as_str)
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, regex::Error> {
    patterns.iter().map(|p| Regex::new(p)).collect()
}

const HIGHLIGHT_ON: &str = "\x1b[1;33m";
const HIGHLIGHT_OFF: &str = "\x1b[0m";

/// Compiled form of [`OutputFilter`], applied per line.
#[derive(Debug, Default)]
pub struct LineFilter {
    suppress: Vec<Regex>,
    include: Vec<Regex>,
    highlight: Vec<Regex>,
    prefix: Option<String>,
    timestamps: bool,
}

impl LineFilter {
    /// Run a line through the filter. `None` means the line is dropped.
    /// Suppress wins over include.
    pub fn apply(&self, line: &str) -> Option<String> {
        if self.suppress.iter().any(|re| re.is_match(line)) {
            return None;
        }
        if !self.include.is_empty() && !self.include.iter().any(|re| re.is_match(line)) {
            return None;
        }

        let mut out = if self.highlight.iter().any(|re| re.is_match(line)) {
            format!("{HIGHLIGHT_ON}{line}{HIGHLIGHT_OFF}")
        } else {
            line.to_string()
        };

        if let Some(prefix) = &self.prefix {
            out = format!("{prefix} {out}");
        }
        if self.timestamps {
            out = format!("[{}] {}", clock_stamp(crate::status::now_ms()), out);
        }
        Some(out)
    }
}

/// Render epoch milliseconds as a `HH:MM:SS` wall-clock stamp (UTC).
fn clock_stamp(epoch_ms: u64) -> String {
    let secs_of_day = (epoch_ms / 1000) % 86_400;
    format!(
        "{:02}:{:02}:{:02}",
        secs_of_day / 3600,
        (secs_of_day % 3600) / 60,
        secs_of_day % 60
    )
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
