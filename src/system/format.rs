//! Human-readable rendering of probe readings.

use std::time::Duration;

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use super::CpuTimes;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

const SECS_PER_MINUTE: f64 = 60.0;
const SECS_PER_HOUR: f64 = 3_600.0;
const SECS_PER_DAY: f64 = 86_400.0;
// Gregorian averages.
const DAYS_PER_MONTH: f64 = 146_097.0 / 4_800.0;
const DAYS_PER_YEAR: f64 = 146_097.0 / 400.0;

/// Render a byte count as megabytes with two decimals, e.g. `"50.00 MB"`.
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / BYTES_PER_MB)
}

/// Per-bucket share of a core's accumulated time, formatted as `"<n>.<nn>%"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CpuUsage {
    pub user: String,
    pub nice: String,
    pub sys: String,
    pub idle: String,
    pub irq: String,
}

/// Compute each bucket's percentage of the core total.
///
/// A core with no accumulated time reports `0.00%` everywhere.
pub fn cpu_usage_percentages(times: &CpuTimes) -> CpuUsage {
    let total = times.total();
    let percent = |bucket: u64| {
        let share = if total == 0 {
            0.0
        } else {
            bucket as f64 / total as f64 * 100.0
        };
        format!("{:.2}%", share)
    };

    CpuUsage {
        user: percent(times.user),
        nice: percent(times.nice),
        sys: percent(times.sys),
        idle: percent(times.idle),
        irq: percent(times.irq),
    }
}

/// Relative duration in words: "a few seconds", "2 hours", "a year".
pub fn humanize_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    let seconds = secs.round();
    let minutes = (secs / SECS_PER_MINUTE).round();
    let hours = (secs / SECS_PER_HOUR).round();
    let days = (secs / SECS_PER_DAY).round();
    let months = (secs / SECS_PER_DAY / DAYS_PER_MONTH).round();
    let years = (secs / SECS_PER_DAY / DAYS_PER_YEAR).round();

    if seconds < 45.0 {
        "a few seconds".to_string()
    } else if minutes <= 1.0 {
        "a minute".to_string()
    } else if minutes < 45.0 {
        format!("{} minutes", minutes as u64)
    } else if hours <= 1.0 {
        "an hour".to_string()
    } else if hours < 22.0 {
        format!("{} hours", hours as u64)
    } else if days <= 1.0 {
        "a day".to_string()
    } else if days < 26.0 {
        format!("{} days", days as u64)
    } else if months <= 1.0 {
        "a month".to_string()
    } else if months < 11.0 {
        format!("{} months", months as u64)
    } else if years <= 1.0 {
        "a year".to_string()
    } else {
        format!("{} years", years as u64)
    }
}

/// Long-form calendar date, e.g. `"October 19, 2026"`.
pub fn format_long_date<Tz>(date: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    date.format("%B %-d, %Y").to_string()
}
