//! Conversion of Snowflake JSON-format cells into [`Value`]s.
//!
//! In the JSON result format every cell arrives as text (or null). Temporal
//! values are encoded as epoch offsets and are rendered here as ISO-8601.

use super::wire::RowType;
use crate::db::Value;
use chrono::{DateTime, FixedOffset, NaiveTime, SecondsFormat};

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// `TIMESTAMP_TZ` offsets are sent as minutes shifted by this amount.
const TZ_OFFSET_BIAS_MINUTES: i32 = 1440;

/// Converts one raw cell using its column description.
pub fn convert_cell(cell: Option<String>, column: Option<&RowType>) -> Value {
    let Some(raw) = cell else {
        return Value::Null;
    };
    let Some(column) = column else {
        return Value::String(raw);
    };

    match column.kind.to_ascii_lowercase().as_str() {
        "fixed" if column.scale.unwrap_or(0) == 0 => match raw.parse::<i64>() {
            Ok(i) => Value::Int(i),
            // NUMBER(38,0) can exceed i64
            Err(_) => Value::String(raw),
        },
        "fixed" | "real" => match raw.parse::<f64>() {
            Ok(f) => Value::Float(f),
            Err(_) => Value::String(raw),
        },
        "boolean" => match raw.as_str() {
            "1" | "true" | "TRUE" => Value::Bool(true),
            "0" | "false" | "FALSE" => Value::Bool(false),
            _ => Value::String(raw),
        },
        "date" => temporal(raw, date),
        "time" => temporal(raw, time),
        "timestamp_ntz" => temporal(raw, timestamp_ntz),
        "timestamp_ltz" => temporal(raw, timestamp_ltz),
        "timestamp_tz" => temporal(raw, timestamp_tz),
        _ => Value::String(raw),
    }
}

fn temporal(raw: String, render: fn(&str) -> Option<String>) -> Value {
    match render(&raw) {
        Some(iso) => Value::Timestamp(iso),
        None => Value::String(raw),
    }
}

/// Splits `"<secs>.<fraction>"` into whole seconds and nanoseconds, flooring
/// negative values so the nanosecond part is always positive.
fn parse_epoch(raw: &str) -> Option<(i64, u32)> {
    let raw = raw.trim();
    let negative = raw.starts_with('-');
    let (whole, fraction) = raw.split_once('.').unwrap_or((raw, ""));

    let mut secs: i64 = whole.parse().ok()?;
    if fraction.is_empty() {
        return Some((secs, 0));
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let digits: String = fraction.chars().chain(std::iter::repeat('0')).take(9).collect();
    let mut nanos: u32 = digits.parse().ok()?;
    if negative && nanos > 0 {
        secs -= 1;
        nanos = NANOS_PER_SEC - nanos;
    }
    Some((secs, nanos))
}

fn date(raw: &str) -> Option<String> {
    let days: i64 = raw.trim().parse().ok()?;
    let dt = DateTime::from_timestamp(days.checked_mul(86_400)?, 0)?;
    Some(dt.date_naive().format("%Y-%m-%d").to_string())
}

fn time(raw: &str) -> Option<String> {
    let (secs, nanos) = parse_epoch(raw)?;
    let t = NaiveTime::from_num_seconds_from_midnight_opt(u32::try_from(secs).ok()?, nanos)?;
    Some(t.format("%H:%M:%S%.f").to_string())
}

fn timestamp_ntz(raw: &str) -> Option<String> {
    let (secs, nanos) = parse_epoch(raw)?;
    let dt = DateTime::from_timestamp(secs, nanos)?;
    Some(dt.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

fn timestamp_ltz(raw: &str) -> Option<String> {
    let (secs, nanos) = parse_epoch(raw)?;
    let dt = DateTime::from_timestamp(secs, nanos)?;
    Some(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

fn timestamp_tz(raw: &str) -> Option<String> {
    let (epoch, offset) = raw.trim().split_once(' ')?;
    let (secs, nanos) = parse_epoch(epoch)?;
    let offset_minutes = offset.trim().parse::<i32>().ok()? - TZ_OFFSET_BIAS_MINUTES;
    let offset = FixedOffset::east_opt(offset_minutes * 60)?;
    let dt = DateTime::from_timestamp(secs, nanos)?.with_timezone(&offset);
    Some(dt.to_rfc3339_opts(SecondsFormat::AutoSi, false))
}
