// src/services/likes.rs

//! Like-counter parsing.

use std::sync::LazyLock;

use regex::Regex;

static COUNTER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)\s*([KkMm千万億]?)$").ok());

/// Parse a like counter such as `"842"`, `"1,204"`, `"1.2K"`, `"3.4万"`.
///
/// Returns `None` for anything that is not a counter.
pub fn parse_like_count(raw: &str) -> Option<u64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '，' && !c.is_whitespace())
        .collect();
    let caps = COUNTER.as_ref()?.captures(&cleaned)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let multiplier = match caps.get(2).map(|m| m.as_str()) {
        Some("K" | "k" | "千") => 1_000.0,
        Some("M" | "m") => 1_000_000.0,
        Some("万") => 10_000.0,
        Some("億") => 100_000_000.0,
        _ => 1.0,
    };
    Some((value * multiplier).round() as u64)
}
