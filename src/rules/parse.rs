//! Parsing of human-written size and age bounds.

use crate::error::{ReclaimError, Result};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static SIZE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*(b|k|kb|kib|m|mb|mib|g|gb|gib|t|tb|tib)?\s*$")
        .expect("Invalid size regex")
});

static AGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+)\s*(s|m|h|d|w)?\s*$").expect("Invalid age regex")
});

/// Parse a byte size such as `512`, `10KB`, `1.5 GiB`.
///
/// Unit prefixes are binary: `K`, `KB` and `KiB` all mean 1024 bytes.
pub fn parse_size(input: &str) -> Result<u64> {
    let caps = SIZE_REGEX.captures(input).ok_or_else(|| {
        ReclaimError::ConfigError(format!(
            "invalid size '{}': expected a number with an optional unit (B, KB, MB, GB, TB)",
            input
        ))
    })?;

    let value: f64 = caps[1]
        .parse()
        .map_err(|_| ReclaimError::ConfigError(format!("invalid size '{}'", input)))?;

    let unit = caps
        .get(2)
        .map(|m| m.as_str().to_ascii_lowercase())
        .unwrap_or_default();
    let multiplier: u64 = match unit.chars().next() {
        None | Some('b') => 1,
        Some('k') => 1 << 10,
        Some('m') => 1 << 20,
        Some('g') => 1 << 30,
        Some('t') => 1 << 40,
        Some(_) => unreachable!("size regex only admits known units"),
    };

    let bytes = (value * multiplier as f64).round();
    if !bytes.is_finite() || bytes >= u64::MAX as f64 {
        return Err(ReclaimError::ConfigError(format!(
            "size '{}' is out of range",
            input
        )));
    }
    Ok(bytes as u64)
}

/// Parse an age such as `0`, `30s`, `15m`, `12h`, `7d`, `2w`.
///
/// A bare number is seconds.
pub fn parse_age(input: &str) -> Result<Duration> {
    let caps = AGE_REGEX.captures(input).ok_or_else(|| {
        ReclaimError::ConfigError(format!(
            "invalid age '{}': expected a number with an optional unit (s, m, h, d, w)",
            input
        ))
    })?;

    let value: u64 = caps[1]
        .parse()
        .map_err(|_| ReclaimError::ConfigError(format!("age '{}' is out of range", input)))?;

    let unit_secs = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()).as_deref() {
        None | Some("s") => 1,
        Some("m") => 60,
        Some("h") => 60 * 60,
        Some("d") => 24 * 60 * 60,
        Some("w") => 7 * 24 * 60 * 60,
        Some(_) => unreachable!("age regex only admits known units"),
    };

    value
        .checked_mul(unit_secs)
        .map(Duration::from_secs)
        .ok_or_else(|| ReclaimError::ConfigError(format!("age '{}' is out of range", input)))
}
