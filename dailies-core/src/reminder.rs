//! Reminder lifecycle: inactive -> active -> paused -> active -> expired.
//!
//! The live state is a sum type, so a paused reminder simply has no target
//! time and an active one has no stored remainder. The flat
//! [`ReminderRecord`] is only the on-disk shape.

use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::timespec::{ParsedTarget, SpecKind, parse_time_spec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Active,
    Paused,
    Expired,
    Inactive,
}

impl ReminderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Expired => "expired",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderState {
    /// Never resolved (spec did not parse) or not started.
    Inactive,
    /// Counting down to `target`; not yet notified.
    Scheduled { target: DateTime<Utc> },
    /// Frozen with `remaining` left on the clock.
    Paused { remaining: Duration },
    /// Fired for `target`; the notify intent has been emitted.
    Expired { target: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id: u64,
    pub text: String,
    pub note: String,
    /// The spec exactly as the user typed it; re-parsed on start/reset.
    pub spec: String,
    pub kind: Option<SpecKind>,
    state: ReminderState,
}

impl Reminder {
    /// A reminder that has not been resolved yet. Use [`Reminder::reset`] to
    /// parse and activate it.
    pub fn new(id: u64, text: impl Into<String>, note: impl Into<String>, spec: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            note: note.into(),
            spec: spec.into(),
            kind: None,
            state: ReminderState::Inactive,
        }
    }

    pub fn state(&self) -> &ReminderState {
        &self.state
    }

    pub fn status(&self) -> ReminderStatus {
        match self.state {
            ReminderState::Inactive => ReminderStatus::Inactive,
            ReminderState::Scheduled { .. } => ReminderStatus::Active,
            ReminderState::Paused { .. } => ReminderStatus::Paused,
            ReminderState::Expired { .. } => ReminderStatus::Expired,
        }
    }

    /// Set once the notify intent for the current activation has fired.
    pub fn notified(&self) -> bool {
        matches!(self.state, ReminderState::Expired { .. })
    }

    pub fn is_countdown(&self) -> bool {
        self.kind == Some(SpecKind::Countdown)
    }

    /// Authoritative target time (active or expired reminders only).
    pub fn target_time(&self) -> Option<DateTime<Utc>> {
        match self.state {
            ReminderState::Scheduled { target } | ReminderState::Expired { target } => Some(target),
            ReminderState::Inactive | ReminderState::Paused { .. } => None,
        }
    }

    /// Time left on the clock: live while active, frozen while paused.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self.state {
            ReminderState::Scheduled { target } => Some((target - now).max(Duration::zero())),
            ReminderState::Paused { remaining } => Some(remaining),
            ReminderState::Inactive | ReminderState::Expired { .. } => None,
        }
    }

    /// Start (or resume) the reminder.
    ///
    /// Paused reminders resume with exactly the time they had left. Inactive
    /// and expired reminders re-parse the spec against `now`. Starting an
    /// active reminder is rejected so its remaining time is never discarded.
    pub fn start<Z: TimeZone>(&mut self, now: &DateTime<Z>) -> Result<()> {
        match self.state {
            ReminderState::Scheduled { .. } => Err(EngineError::InvalidTransition {
                action: "start",
                from: ReminderStatus::Active,
            }),
            ReminderState::Paused { remaining } => {
                let now = now.with_timezone(&Utc);
                let target = now.checked_add_signed(remaining).ok_or_else(|| EngineError::OutOfRange {
                    spec: self.spec.clone(),
                })?;
                self.state = ReminderState::Scheduled { target };
                tracing::info!(id = self.id, %target, "reminder resumed");
                Ok(())
            }
            ReminderState::Inactive | ReminderState::Expired { .. } => self.activate(now),
        }
    }

    /// Freeze the countdown. Only an active reminder can be paused.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<()> {
        let ReminderState::Scheduled { target } = self.state else {
            return Err(EngineError::InvalidTransition {
                action: "pause",
                from: self.status(),
            });
        };
        let remaining = (target - now).max(Duration::zero());
        self.state = ReminderState::Paused { remaining };
        tracing::info!(id = self.id, remaining_secs = remaining.num_seconds(), "reminder paused");
        Ok(())
    }

    /// Restart from the spec against `now`, whatever the current state.
    /// A spec that no longer parses leaves the reminder inactive.
    pub fn reset<Z: TimeZone>(&mut self, now: &DateTime<Z>) -> Result<()> {
        self.activate(now)
    }

    /// Expire an active reminder whose target has passed. Returns true exactly
    /// once per activation: the caller emits the notify intent on true.
    pub fn tick_expire(&mut self, now: DateTime<Utc>) -> bool {
        match self.state {
            ReminderState::Scheduled { target } if now >= target => {
                self.state = ReminderState::Expired { target };
                tracing::info!(id = self.id, %target, "reminder expired");
                true
            }
            _ => false,
        }
    }

    fn activate<Z: TimeZone>(&mut self, now: &DateTime<Z>) -> Result<()> {
        match parse_time_spec(&self.spec, now) {
            Ok(ParsedTarget { kind, target_time }) => {
                self.kind = Some(kind);
                self.state = ReminderState::Scheduled { target: target_time };
                tracing::info!(id = self.id, spec = %self.spec, target = %target_time, "reminder activated");
                Ok(())
            }
            Err(e) => {
                self.kind = None;
                self.state = ReminderState::Inactive;
                tracing::warn!(id = self.id, spec = %self.spec, "reminder left inactive: {e}");
                Err(e)
            }
        }
    }

    /// Rebuild a reminder from its persisted record.
    ///
    /// Records that still need a target (active, or a legacy/free-text
    /// status) but have none are re-parsed against `now` exactly like a
    /// reset; the returned error, if any, is the parse failure.
    pub fn from_record<Z: TimeZone>(record: ReminderRecord, now: &DateTime<Z>) -> (Self, Option<EngineError>) {
        let status = record.status.trim().to_lowercase();
        let mut reminder = Self {
            id: record.id,
            text: record.reminder,
            note: record.note,
            spec: record.alarm_or_countdown,
            kind: record.is_countdown.map(|c| if c { SpecKind::Countdown } else { SpecKind::Alarm }),
            state: ReminderState::Inactive,
        };

        let paused = Duration::milliseconds(record.paused_remaining_ms.max(0));
        reminder.state = match (status.as_str(), record.target_time) {
            ("paused", _) => ReminderState::Paused { remaining: paused },
            ("expired", Some(target)) => ReminderState::Expired { target },
            ("expired", None) => ReminderState::Expired {
                target: now.with_timezone(&Utc),
            },
            ("inactive", _) => ReminderState::Inactive,
            (_, Some(target)) if record.notified => ReminderState::Expired { target },
            (_, Some(target)) => ReminderState::Scheduled { target },
            (_, None) if reminder.spec.trim().is_empty() => ReminderState::Inactive,
            (_, None) => {
                let err = reminder.reset(now).err();
                return (reminder, err);
            }
        };
        (reminder, None)
    }

    pub fn to_record(&self) -> ReminderRecord {
        let (target_time, paused_remaining_ms) = match self.state {
            ReminderState::Scheduled { target } | ReminderState::Expired { target } => (Some(target), 0),
            ReminderState::Paused { remaining } => (None, remaining.num_milliseconds()),
            ReminderState::Inactive => (None, 0),
        };
        ReminderRecord {
            id: self.id,
            reminder: self.text.clone(),
            note: self.note.clone(),
            alarm_or_countdown: self.spec.clone(),
            status: self.status().as_str().to_string(),
            target_time,
            is_countdown: self.kind.map(|k| k == SpecKind::Countdown),
            notified: self.notified(),
            paused_remaining_ms,
        }
    }
}

/// On-disk reminder. The first five fields keep their historical names so
/// older tasks files load unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRecord {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub reminder: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub alarm_or_countdown: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_countdown: Option<bool>,
    #[serde(default)]
    pub notified: bool,
    #[serde(default)]
    pub paused_remaining_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 14, 0, 0).unwrap()
    }

    fn active(spec: &str) -> Reminder {
        let mut r = Reminder::new(1, "Tea", "", spec);
        r.reset(&t0()).unwrap();
        r
    }

    #[test]
    fn reset_activates_from_spec() {
        let r = active("30s");
        assert_eq!(r.status(), ReminderStatus::Active);
        assert!(r.is_countdown());
        assert!(!r.notified());
        assert_eq!(r.target_time(), Some(t0() + Duration::seconds(30)));
    }

    #[test]
    fn unparseable_spec_stays_inactive() {
        let mut r = Reminder::new(1, "Tea", "", "whenever");
        let err = r.reset(&t0()).unwrap_err();
        assert!(err.is_parse_failure());
        assert_eq!(r.status(), ReminderStatus::Inactive);
        assert_eq!(r.target_time(), None);
    }

    #[test]
    fn pause_then_resume_keeps_remaining_time() {
        let mut r = active("10m");
        let paused_at = t0() + Duration::minutes(4);
        r.pause(paused_at).unwrap();
        assert_eq!(r.status(), ReminderStatus::Paused);
        assert_eq!(r.remaining(paused_at), Some(Duration::minutes(6)));
        assert_eq!(r.target_time(), None);

        // Time spent paused does not count.
        let resumed_at = paused_at + Duration::hours(3);
        r.start(&resumed_at).unwrap();
        assert_eq!(r.target_time(), Some(resumed_at + Duration::minutes(6)));
    }

    #[test]
    fn pause_after_target_freezes_at_zero() {
        let mut r = active("30s");
        let late = t0() + Duration::seconds(45);
        r.pause(late).unwrap();
        assert_eq!(r.remaining(late), Some(Duration::zero()));
        r.start(&late).unwrap();
        assert!(r.tick_expire(late));
    }

    #[test]
    fn start_on_active_is_rejected_and_keeps_target() {
        let mut r = active("10m");
        let before = r.target_time();
        let err = r.start(&(t0() + Duration::minutes(5))).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidTransition {
                action: "start",
                from: ReminderStatus::Active
            }
        );
        assert_eq!(r.target_time(), before);
    }

    #[test]
    fn pause_on_non_active_is_rejected() {
        let mut r = active("10m");
        r.pause(t0()).unwrap();
        let err = r.pause(t0()).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidTransition {
                action: "pause",
                from: ReminderStatus::Paused
            }
        );
        assert_eq!(r.remaining(t0()), Some(Duration::minutes(10)));

        let mut idle = Reminder::new(2, "x", "", "nope");
        assert!(idle.pause(t0()).is_err());
    }

    #[test]
    fn tick_expire_fires_once() {
        let mut r = active("30s");
        assert!(!r.tick_expire(t0() + Duration::seconds(29)));
        assert!(r.tick_expire(t0() + Duration::seconds(30)));
        assert!(r.notified());
        assert!(!r.tick_expire(t0() + Duration::seconds(31)));
        assert_eq!(r.status(), ReminderStatus::Expired);
    }

    #[test]
    fn start_after_expiry_rearms_from_spec() {
        let mut r = active("30s");
        assert!(r.tick_expire(t0() + Duration::minutes(1)));
        let later = t0() + Duration::minutes(5);
        r.start(&later).unwrap();
        assert!(!r.notified());
        assert_eq!(r.target_time(), Some(later + Duration::seconds(30)));
    }

    #[test]
    fn reset_restarts_original_duration_from_now() {
        let mut r = active("10m");
        r.pause(t0() + Duration::minutes(8)).unwrap();
        let later = t0() + Duration::minutes(20);
        r.reset(&later).unwrap();
        assert_eq!(r.status(), ReminderStatus::Active);
        assert_eq!(r.target_time(), Some(later + Duration::minutes(10)));
    }

    #[test]
    fn record_round_trip_preserves_each_state() {
        let mut r = active("10m");
        assert_eq!(Reminder::from_record(r.to_record(), &t0()).0, r);

        r.pause(t0() + Duration::minutes(3)).unwrap();
        let record = r.to_record();
        assert_eq!(record.status, "paused");
        assert_eq!(record.paused_remaining_ms, 7 * 60 * 1000);
        assert_eq!(Reminder::from_record(record, &t0()).0, r);

        r.start(&t0()).unwrap();
        assert!(r.tick_expire(t0() + Duration::hours(1)));
        let record = r.to_record();
        assert!(record.notified);
        assert_eq!(Reminder::from_record(record, &t0()).0, r);
    }

    #[test]
    fn legacy_record_without_target_is_reparsed() {
        let json = r#"{"id":4,"reminder":"Stretch","note":"","alarm_or_countdown":"15m","status":"pending"}"#;
        let record: ReminderRecord = serde_json::from_str(json).unwrap();
        let (r, err) = Reminder::from_record(record, &t0());
        assert!(err.is_none());
        assert_eq!(r.status(), ReminderStatus::Active);
        assert_eq!(r.target_time(), Some(t0() + Duration::minutes(15)));
    }

    #[test]
    fn active_record_already_notified_loads_expired() {
        let record = ReminderRecord {
            id: 1,
            reminder: "x".into(),
            note: String::new(),
            alarm_or_countdown: "5m".into(),
            status: "active".into(),
            target_time: Some(t0()),
            is_countdown: Some(true),
            notified: true,
            paused_remaining_ms: 0,
        };
        let (r, _) = Reminder::from_record(record, &t0());
        assert_eq!(r.status(), ReminderStatus::Expired);
    }

    #[test]
    fn failed_legacy_reparse_reports_error() {
        let record = ReminderRecord {
            id: 9,
            reminder: "x".into(),
            note: String::new(),
            alarm_or_countdown: "after lunch".into(),
            status: "Active".into(),
            target_time: None,
            is_countdown: None,
            notified: false,
            paused_remaining_ms: 0,
        };
        let (r, err) = Reminder::from_record(record, &t0());
        assert_eq!(r.status(), ReminderStatus::Inactive);
        assert_eq!(err, Some(EngineError::not_recognized("after lunch")));
        assert_eq!(r.to_record().status, "inactive");
    }
}
