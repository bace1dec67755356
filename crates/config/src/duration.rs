// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Duration strings for config values.
//!
//! A duration is one or more `<value><unit>` segments: `"90s"`, `"20m"`,
//! `"1h30m"`, `"1.5h"`. Values may be fractional; a bare number means
//! seconds; whitespace between segments is allowed.

use crate::ConfigError;
use std::time::Duration;

/// Parse a duration string like "30s", "5m", "1h30m", or "1.5h".
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidDuration(s.to_string(), reason.to_string());

    let mut rest = s.trim();
    if rest.is_empty() {
        return Err(invalid("empty duration string"));
    }

    let mut total = Duration::ZERO;
    while !rest.is_empty() {
        let value_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let (value_str, after_value) = rest.split_at(value_len);
        let value: f64 = value_str
            .parse()
            .map_err(|_| invalid("expected a number before the unit"))?;

        let unit_len = after_value
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(after_value.len());
        let (unit_str, tail) = after_value.split_at(unit_len);
        let unit_seconds = match unit_str.trim() {
            "ms" => 0.001,
            "" | "s" | "sec" => 1.0,
            "m" | "min" => 60.0,
            "h" | "hr" => 3600.0,
            "d" => 86400.0,
            _ => return Err(invalid("unknown duration unit")),
        };

        let segment = Duration::try_from_secs_f64(value * unit_seconds)
            .map_err(|_| invalid("value out of range"))?;
        total = total
            .checked_add(segment)
            .ok_or_else(|| invalid("value out of range"))?;
        rest = tail.trim_start();
    }

    Ok(total)
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;
