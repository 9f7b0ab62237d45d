//! # Report — Presenting Timing Records
//!
//! Turns the scheduler's per-batch [`TimingRecord`]s into log lines with
//! grouped thousands, and exports them as JSON for offline analysis.

use crate::snapshot::TimingRecord;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use tracing::info;

const THOUSANDS_SEPARATOR: char = ',';

/// Decimal rendering of `value` with a separator every three digits.
pub fn format_grouped(value: impl Display) -> String {
    let raw = value.to_string();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw.as_str()),
    };
    let mut out = String::with_capacity(raw.len() + digits.len() / 3);
    out.push_str(sign);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(THOUSANDS_SEPARATOR);
        }
        out.push(c);
    }
    out
}

/// One line of the timing table.
pub fn format_timing(t: &TimingRecord) -> String {
    format!(
        "begin: {}, end: {}, primes: {}, milliseconds: {}",
        format_grouped(&t.interval_start),
        format_grouped(&t.interval_end),
        format_grouped(t.primes_found),
        format_grouped(t.duration_ms())
    )
}

pub fn log_timings(timings: &[TimingRecord]) {
    for t in timings {
        info!("{}", format_timing(t));
    }
}

#[derive(Serialize)]
struct TimingRow {
    interval_start: String,
    interval_end: String,
    primes_found: usize,
    duration_ms: f64,
    started_at: chrono::DateTime<chrono::Utc>,
}

impl From<&TimingRecord> for TimingRow {
    fn from(t: &TimingRecord) -> Self {
        TimingRow {
            interval_start: t.interval_start.to_string(),
            interval_end: t.interval_end.to_string(),
            primes_found: t.primes_found,
            duration_ms: t.duration.as_secs_f64() * 1000.0,
            started_at: t.started_at,
        }
    }
}

/// JSON array of timing rows. Interval bounds are decimal strings.
pub fn timings_json(timings: &[TimingRecord]) -> Result<String> {
    let rows: Vec<TimingRow> = timings.iter().map(TimingRow::from).collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}

pub fn write_timings_json(path: &Path, timings: &[TimingRecord]) -> Result<()> {
    let json = timings_json(timings)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}
