//! Timestamp token replacement.
//!
//! A timestamp rule draws a random epoch between the stanza's `earliest` and
//! `latest` bounds (relative specs like `-60m` or `now`) and renders it with
//! the configured strftime format in the stanza's timezone. The token value
//! carries the rendered text; the key always carries the epoch seconds, which
//! is what index-time verification compares against.

use chrono::{DateTime, Duration, FixedOffset, Local, Months, TimeZone, Utc};
use gen_core::{Timezone, TokenValue};
use rand::Rng;
use std::fmt::Write as _;
use std::sync::OnceLock;

/// Time window and timezone a timestamp rule draws from.
#[derive(Debug, Clone)]
pub struct TimeBounds {
    pub earliest: Option<String>,
    pub latest: Option<String>,
    pub timezone: Timezone,
}

fn relative_time_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"^([+-])(\d+)([a-z]+)$").expect("valid relative time pattern")
    })
}

/// Normalize a configured strftime format. `%e` is not portable and is
/// rewritten to `%d` with a warning.
pub fn normalize_format(format: &str, stanza: &str) -> String {
    if format.contains("%e") {
        tracing::warn!(stanza, "%e is not supported in timestamp formats, using %d");
        format.replace("%e", "%d")
    } else {
        format.to_string()
    }
}

pub fn replace<R: Rng>(
    format: &str,
    bounds: &TimeBounds,
    token_count: usize,
    rng: &mut R,
) -> Vec<TokenValue> {
    let now = Utc::now();
    let a = bound_epoch(bounds.earliest.as_deref(), now);
    let b = bound_epoch(bounds.latest.as_deref(), now);
    let (lo, hi) = (a.min(b), a.max(b));
    (0..token_count)
        .map(|_| {
            let epoch = rng.gen_range(lo..=hi);
            TokenValue::new(epoch.to_string(), render(epoch, format, &bounds.timezone))
        })
        .collect()
}

/// Resolve a relative bound (`-60m`, `+2d`, `now`, absent) to epoch seconds.
fn bound_epoch(spec: Option<&str>, now: DateTime<Utc>) -> i64 {
    let Some(spec) = spec
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty() && s != "now")
    else {
        return now.timestamp();
    };
    let Some(caps) = relative_time_regex().captures(&spec) else {
        tracing::warn!("Invalid time bound '{spec}', using now");
        return now.timestamp();
    };
    let negative = &caps[1] == "-";
    let Ok(amount) = caps[2].parse::<i64>() else {
        tracing::warn!("Invalid time bound '{spec}', using now");
        return now.timestamp();
    };

    let duration = match &caps[3] {
        "s" | "sec" | "secs" | "second" | "seconds" => Some(Duration::seconds(amount)),
        "m" | "min" | "mins" | "minute" | "minutes" => Some(Duration::minutes(amount)),
        "h" | "hr" | "hrs" | "hour" | "hours" => Some(Duration::hours(amount)),
        "d" | "day" | "days" => Some(Duration::days(amount)),
        "w" | "week" | "weeks" => Some(Duration::weeks(amount)),
        _ => None,
    };
    if let Some(duration) = duration {
        return if negative { now - duration } else { now + duration }.timestamp();
    }

    let months = match &caps[3] {
        "mon" | "month" | "months" => amount,
        "q" | "qtr" | "quarter" | "quarters" => amount * 3,
        "y" | "yr" | "year" | "years" => amount * 12,
        _ => {
            tracing::warn!("Invalid time bound '{spec}', using now");
            return now.timestamp();
        }
    };
    let months = Months::new(months.unsigned_abs() as u32);
    let shifted = if negative {
        now.checked_sub_months(months)
    } else {
        now.checked_add_months(months)
    };
    shifted.unwrap_or(now).timestamp()
}

fn render(epoch: i64, format: &str, timezone: &Timezone) -> String {
    let rendered = match timezone {
        Timezone::Utc => Utc
            .timestamp_opt(epoch, 0)
            .single()
            .and_then(|dt| strftime(&dt, format)),
        Timezone::Local => Local
            .timestamp_opt(epoch, 0)
            .single()
            .and_then(|dt| strftime(&dt, format)),
        Timezone::Offset(spec) => fixed_offset(spec)
            .and_then(|offset| offset.timestamp_opt(epoch, 0).single())
            .and_then(|dt| strftime(&dt, format)),
    };
    match rendered {
        Some(text) => text,
        None => {
            tracing::warn!("Could not render epoch {epoch} with format '{format}'");
            epoch.to_string()
        }
    }
}

/// `DelayedFormat` reports bad specifiers through the formatter; collect into
/// a string so a malformed format degrades instead of panicking.
fn strftime<Tz: TimeZone>(dt: &DateTime<Tz>, format: &str) -> Option<String>
where
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    write!(out, "{}", dt.format(format)).ok()?;
    Some(out)
}

/// Parse a `±HHMM` offset string.
fn fixed_offset(spec: &str) -> Option<FixedOffset> {
    let sign = if spec.starts_with('-') { -1 } else { 1 };
    let digits = spec.get(1..)?;
    let hours: i32 = digits.get(..2)?.parse().ok()?;
    let minutes: i32 = digits.get(2..4)?.parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
