// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Duration parsing for config fields.
//!
//! Timeouts, probe intervals, and restart delays are written as a number
//! with a unit: `250ms`, `30s`, `5m`, `2h`. Bare integers are accepted
//! at the serde layer and mean milliseconds there; a bare number inside
//! a string is rejected so a config never silently mixes the two scales.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Unit suffixes and their millisecond scale. `ms` comes first so the
/// `s` arm cannot claim its trailing character.
const UNITS: &[(&str, u64)] = &[("ms", 1), ("s", 1_000), ("m", 60_000), ("h", 3_600_000)];

/// Parse a duration string like "250ms", "30s", "5m", "2h".
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let text = input.trim();

    for (unit, scale) in UNITS {
        let Some(count) = text.strip_suffix(unit) else {
            continue;
        };
        let count = count.trim_end();
        if count.is_empty() || !count.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("bad duration '{input}': expected digits before '{unit}'"));
        }
        let value: u64 = count
            .parse()
            .map_err(|_| format!("bad duration '{input}': number is too large"))?;
        return Ok(Duration::from_millis(value.saturating_mul(*scale)));
    }

    Err(format!("bad duration '{input}': expected a number with a ms/s/m/h unit"))
}

/// Serde adapter for duration fields: integers are milliseconds, strings
/// go through [`parse_duration`]. Serializes back as milliseconds.
pub mod serde_ms {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MsOrStr {
        Ms(u64),
        Str(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match MsOrStr::deserialize(deserializer)? {
            MsOrStr::Ms(ms) => Ok(Duration::from_millis(ms)),
            MsOrStr::Str(s) => parse_duration(&s).map_err(serde::de::Error::custom),
        }
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;
