//! Engine error types.
//!
//! Nothing in the engine is fatal: every variant here is handed back to the
//! caller as a value, and the evaluation loop only ever logs them.

use thiserror::Error;

use crate::reminder::ReminderStatus;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Neither the countdown nor the alarm grammar matched.
    #[error("time spec not recognized: {spec:?}")]
    NotRecognized { spec: String },

    /// The countdown parsed but does not fit in the timestamp range.
    #[error("time spec out of range: {spec:?}")]
    OutOfRange { spec: String },

    #[error("{}", transition_message(.action, .from))]
    InvalidTransition {
        action: &'static str,
        from: ReminderStatus,
    },

    #[error("notification dispatch failed: {0}")]
    NotificationDispatchFailed(String),

    #[error("no reminder with id {0}")]
    UnknownReminder(u64),

    #[error("no daily task with id {0}")]
    UnknownTask(u64),
}

impl EngineError {
    pub fn not_recognized(spec: &str) -> Self {
        Self::NotRecognized {
            spec: spec.to_string(),
        }
    }

    /// True for the two parse-failure variants.
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::NotRecognized { .. } | Self::OutOfRange { .. })
    }
}

fn transition_message(action: &str, from: &ReminderStatus) -> String {
    match from {
        ReminderStatus::Active => format!("cannot {action}: reminder is already active"),
        other => format!("cannot {action} a reminder that is {other}"),
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_reads_like_a_user_message() {
        let e = EngineError::InvalidTransition {
            action: "start",
            from: ReminderStatus::Active,
        };
        assert_eq!(e.to_string(), "cannot start: reminder is already active");

        let e = EngineError::InvalidTransition {
            action: "pause",
            from: ReminderStatus::Paused,
        };
        assert_eq!(e.to_string(), "cannot pause a reminder that is paused");
    }

    #[test]
    fn parse_failures_are_classified() {
        assert!(EngineError::not_recognized("soon").is_parse_failure());
        assert!(!EngineError::UnknownReminder(3).is_parse_failure());
    }
}
