//! Time utilities: injectable clocks and DST-safe local wall-clock resolution.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Source of "now". Every engine operation takes `now` explicitly; the clock
/// only exists at the edge where the loop asks what time it is.
pub trait Clock {
    type Zone: TimeZone;

    fn now(&self) -> DateTime<Self::Zone>;
}

/// Wall clock projected into a zone (`chrono::Local`, a `chrono_tz::Tz`, `Utc`).
#[derive(Debug, Clone, Copy)]
pub struct SystemClock<Z: TimeZone> {
    zone: Z,
}

impl<Z: TimeZone> SystemClock<Z> {
    pub fn new(zone: Z) -> Self {
        Self { zone }
    }
}

impl<Z: TimeZone> Clock for SystemClock<Z> {
    type Zone = Z;

    fn now(&self) -> DateTime<Z> {
        Utc::now().with_timezone(&self.zone)
    }
}

/// Settable clock for tests and replays. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock<Z: TimeZone> {
    zone: Z,
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl<Z: TimeZone> ManualClock<Z> {
    pub fn new(zone: Z, start: DateTime<Utc>) -> Self {
        Self {
            zone,
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl<Z: TimeZone> Clock for ManualClock<Z> {
    type Zone = Z;

    fn now(&self) -> DateTime<Z> {
        let at = *self.now.lock().unwrap_or_else(|e| e.into_inner());
        at.with_timezone(&self.zone)
    }
}

/// Parse an IANA zone name like "America/Chicago".
pub fn parse_zone(name: &str) -> Result<Tz> {
    name.trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {name}"))
}

/// Resolve a local wall-clock time in `zone`.
///
/// - ambiguous (DST fall-back): the earlier instant
/// - nonexistent (DST spring-forward gap): the same wall time one hour later
pub fn resolve_local<Z: TimeZone>(zone: &Z, naive: NaiveDateTime) -> DateTime<Z> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(t) => t,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            zone.from_local_datetime(&shifted)
                .earliest()
                .unwrap_or_else(|| zone.from_utc_datetime(&naive))
        }
    }
}

/// `date` at `hour:minute:00` local time in `zone`.
pub fn local_at<Z: TimeZone>(zone: &Z, date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<Z>> {
    let naive = date.and_hms_opt(hour, minute, 0)?;
    Some(resolve_local(zone, naive))
}

/// Compact human duration: "45s", "12m 03s", "1h 02m 03s", "2d 04h 00m".
pub fn format_remaining(d: Duration) -> String {
    let total = d.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{days}d {hours:02}h {minutes:02}m")
    } else if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}
