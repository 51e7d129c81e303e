//! Recurring daily task model.
//!
//! Dailies are checked off during the day and flipped back to incomplete by
//! the daily reset (see `crate::daily_reset`).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Incomplete,
    Done,
}

impl From<String> for TaskStatus {
    /// Free text from older files: "Done", "complete", "x" ... count as done.
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "done" | "complete" | "completed" | "x" | "yes" => Self::Done,
            _ => Self::Incomplete,
        }
    }
}

impl From<TaskStatus> for String {
    fn from(s: TaskStatus) -> Self {
        s.to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Incomplete => "incomplete",
            Self::Done => "done",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl std::str::FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" | "h" => Ok(Self::High),
            "medium" | "med" | "m" => Ok(Self::Medium),
            "low" | "l" => Ok(Self::Low),
            other => anyhow::bail!("unknown priority: {other}"),
        }
    }
}

/// A daily that resets every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTask {
    #[serde(default)]
    pub id: u64,

    #[serde(rename = "task", alias = "description", default)]
    pub description: String,

    #[serde(default, deserialize_with = "lenient_priority", skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    #[serde(default)]
    pub category: String,

    /// Free-form, e.g. "10pm". Display only; the engine never reads it.
    #[serde(default)]
    pub deadline: String,

    #[serde(default = "default_status")]
    pub status: TaskStatus,

    /// When it was last checked off; None means never this cycle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completed_at: Option<DateTime<Utc>>,
}

fn default_status() -> TaskStatus {
    TaskStatus::Incomplete
}

fn lenient_priority<'de, D>(deserializer: D) -> Result<Option<Priority>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

impl RecurringTask {
    pub fn new(id: u64, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            priority: None,
            category: String::new(),
            deadline: String::new(),
            status: TaskStatus::Incomplete,
            last_completed_at: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_deadline(mut self, deadline: impl Into<String>) -> Self {
        self.deadline = deadline.into();
        self
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    /// Check off (stamping `now`) or un-check. Returns the new status.
    pub fn toggle(&mut self, now: DateTime<Utc>) -> TaskStatus {
        match self.status {
            TaskStatus::Incomplete => {
                self.status = TaskStatus::Done;
                self.last_completed_at = Some(now);
            }
            TaskStatus::Done => {
                self.status = TaskStatus::Incomplete;
                self.last_completed_at = None;
            }
        }
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn toggle_stamps_and_clears_completion() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let mut t = RecurringTask::new(1, "Water plants");
        assert_eq!(t.toggle(now), TaskStatus::Done);
        assert_eq!(t.last_completed_at, Some(now));
        assert_eq!(t.toggle(now), TaskStatus::Incomplete);
        assert_eq!(t.last_completed_at, None);
    }

    #[test]
    fn reads_legacy_daily_shape() {
        let json = r#"{"id":2,"task":"Read","priority":"High","category":"Self","deadline":"10pm","status":"Done"}"#;
        let t: RecurringTask = serde_json::from_str(json).unwrap();
        assert_eq!(t.description, "Read");
        assert_eq!(t.priority, Some(Priority::High));
        assert!(t.is_done());
        assert_eq!(t.last_completed_at, None);
    }

    #[test]
    fn unknown_priority_and_status_are_tolerated() {
        let json = r#"{"id":3,"task":"Walk","priority":"whenever","status":"todo"}"#;
        let t: RecurringTask = serde_json::from_str(json).unwrap();
        assert_eq!(t.priority, None);
        assert_eq!(t.status, TaskStatus::Incomplete);
    }

    #[test]
    fn writes_lowercase_status() {
        let t = RecurringTask::new(1, "Walk").with_priority(Priority::Low);
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v["status"], "incomplete");
        assert_eq!(v["task"], "Walk");
        assert_eq!(v["priority"], "Low");
    }
}
