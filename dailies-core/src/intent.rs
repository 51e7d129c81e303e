//! Intents the engine hands back to the host application, which persists
//! state and routes notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineIntent {
    ReminderExpired { reminder_id: u64 },
    TasksReset { task_ids: Vec<u64> },
    ParseFailed { reminder_id: u64, spec: String },
}

/// A notification the loop owes the user for one expired reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiredReminder {
    pub reminder_id: u64,
    pub title: String,
    pub message: String,
}

/// Everything one evaluation pass changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub at: DateTime<Utc>,
    pub boundary: DateTime<Utc>,
    pub expired: Vec<ExpiredReminder>,
    pub reset_task_ids: Vec<u64>,
    /// Notifications that could not be delivered. State changed regardless.
    pub notify_failures: usize,
}

impl TickReport {
    pub fn new(at: DateTime<Utc>, boundary: DateTime<Utc>) -> Self {
        Self {
            at,
            boundary,
            expired: Vec::new(),
            reset_task_ids: Vec::new(),
            notify_failures: 0,
        }
    }

    /// True when entity state changed and should be persisted.
    pub fn changed(&self) -> bool {
        !self.expired.is_empty() || !self.reset_task_ids.is_empty()
    }

    /// One `TasksReset` batch (if any) followed by one `ReminderExpired` per reminder.
    pub fn intents(&self) -> Vec<EngineIntent> {
        let mut out = Vec::with_capacity(self.expired.len() + 1);
        if !self.reset_task_ids.is_empty() {
            out.push(EngineIntent::TasksReset {
                task_ids: self.reset_task_ids.clone(),
            });
        }
        out.extend(self.expired.iter().map(|e| EngineIntent::ReminderExpired {
            reminder_id: e.reminder_id,
        }));
        out
    }
}
