//! Time-spec parsing: "30s", "5min", "2hr", "3d", "1w" countdowns and
//! "9am", "9:30 PM", "21:05" alarms, each resolved to an absolute target.

use std::sync::LazyLock;

use chrono::{DateTime, Days, Duration, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::time::local_at;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecKind {
    Countdown,
    Alarm,
}

/// Result of parsing a spec against a particular "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedTarget {
    pub kind: SpecKind,
    pub target_time: DateTime<Utc>,
}

impl ParsedTarget {
    pub fn is_countdown(&self) -> bool {
        self.kind == SpecKind::Countdown
    }
}

/// Countdown rules in precedence order. Within a rule the longer suffix is
/// stripped first so "5min" never loses its trailing "m" twice.
const COUNTDOWN_RULES: [(&[&str], i64); 5] = [
    (&["w"], 7 * 86_400),
    (&["d"], 86_400),
    (&["min", "m"], 60),
    (&["hr", "h"], 3_600),
    (&["sec", "s"], 1),
];

static TWELVE_HOUR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})(?::(\d{2}))?\s*([ap])\.?\s*m\.?$").expect("twelve-hour pattern compiles")
});

static TWENTY_FOUR_HOUR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").expect("24-hour pattern compiles"));

/// Parse `spec` against `now`. Countdowns win over alarms; a spec matching
/// neither grammar is `NotRecognized`.
pub fn parse_time_spec<Z: TimeZone>(spec: &str, now: &DateTime<Z>) -> Result<ParsedTarget> {
    let normalized = spec.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(EngineError::not_recognized(spec));
    }

    if let Some(seconds) = countdown_seconds(&normalized) {
        let target = Duration::try_seconds(seconds)
            .and_then(|d| now.with_timezone(&Utc).checked_add_signed(d))
            .ok_or_else(|| EngineError::OutOfRange {
                spec: spec.to_string(),
            })?;
        return Ok(ParsedTarget {
            kind: SpecKind::Countdown,
            target_time: target,
        });
    }

    if let Some((hour, minute)) = clock_time(&normalized) {
        return Ok(ParsedTarget {
            kind: SpecKind::Alarm,
            target_time: next_occurrence(now, hour, minute)
                .ok_or_else(|| EngineError::not_recognized(spec))?,
        });
    }

    Err(EngineError::not_recognized(spec))
}

/// Total seconds for a countdown spec, or None when no rule matches.
/// Overflowing amounts saturate so the caller reports them as out of range.
fn countdown_seconds(spec: &str) -> Option<i64> {
    for (suffixes, unit) in COUNTDOWN_RULES {
        for suffix in suffixes {
            let Some(prefix) = spec.strip_suffix(*suffix) else {
                continue;
            };
            let prefix = prefix.trim_end();
            if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            let amount = prefix.parse::<i64>().unwrap_or(i64::MAX);
            return Some(amount.saturating_mul(unit));
        }
    }
    None
}

/// (hour, minute) in 24h form for "9am", "9:30 p.m.", "21:05", ...
fn clock_time(spec: &str) -> Option<(u32, u32)> {
    if let Some(caps) = TWELVE_HOUR.captures(spec) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        if !(1..=12).contains(&hour) || minute > 59 {
            return None;
        }
        let pm = caps.get(3)?.as_str() == "p";
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        };
        return Some((hour, minute));
    }

    let caps = TWENTY_FOUR_HOUR.captures(spec)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
    (hour <= 23 && minute <= 59).then_some((hour, minute))
}

/// First `hour:minute` local time strictly after `now`: today, else tomorrow.
fn next_occurrence<Z: TimeZone>(now: &DateTime<Z>, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    let zone = now.timezone();
    let today = now.date_naive();
    let candidate = local_at(&zone, today, hour, minute)?;
    if candidate > *now {
        return Some(candidate.with_timezone(&Utc));
    }
    let tomorrow = today.checked_add_days(Days::new(1))?;
    local_at(&zone, tomorrow, hour, minute).map(|t| t.with_timezone(&Utc))
}
