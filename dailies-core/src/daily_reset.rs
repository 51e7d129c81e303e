//! Daily reset boundary: dailies completed before the most recent reset hour
//! belong to the previous cycle and flip back to incomplete.

use chrono::{DateTime, Days, TimeZone, Utc};

use crate::task::{RecurringTask, TaskStatus};
use crate::time::local_at;

pub const DEFAULT_RESET_HOUR: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyReset {
    hour: u32,
}

impl Default for DailyReset {
    fn default() -> Self {
        Self {
            hour: DEFAULT_RESET_HOUR,
        }
    }
}

impl DailyReset {
    /// `hour` is a local wall-clock hour, 0..=23.
    pub fn new(hour: u32) -> anyhow::Result<Self> {
        if hour > 23 {
            anyhow::bail!("reset hour must be 0..=23, got {hour}");
        }
        Ok(Self { hour })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    /// Most recent reset instant at or before `now`: today at the reset hour,
    /// or yesterday's if `now` is still before today's.
    pub fn most_recent_boundary<Z: TimeZone>(&self, now: &DateTime<Z>) -> DateTime<Utc> {
        let zone = now.timezone();
        let today = now.date_naive();
        let now_utc = now.with_timezone(&Utc);

        let todays = local_at(&zone, today, self.hour, 0).map(|t| t.with_timezone(&Utc));
        match todays {
            Some(b) if b <= now_utc => b,
            _ => today
                .checked_sub_days(Days::new(1))
                .and_then(|y| local_at(&zone, y, self.hour, 0))
                .map(|t| t.with_timezone(&Utc))
                .filter(|b| *b <= now_utc)
                .unwrap_or(now_utc),
        }
    }
}

/// True iff the task is done and its completion predates `boundary`.
/// A done task with no completion stamp counts as never completed.
pub fn should_reset(task: &RecurringTask, boundary: DateTime<Utc>) -> bool {
    task.status == TaskStatus::Done && task.last_completed_at.is_none_or(|at| at < boundary)
}

/// Flip the task back to incomplete if it belongs to a previous cycle.
/// Returns whether anything changed; idempotent.
pub fn apply_reset(task: &mut RecurringTask, boundary: DateTime<Utc>) -> bool {
    if !should_reset(task, boundary) {
        return false;
    }
    task.status = TaskStatus::Incomplete;
    task.last_completed_at = None;
    true
}
