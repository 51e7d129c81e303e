//! Notification capability for expired reminders.

use crate::error::EngineError;
use crate::reminder::Reminder;

/// Best-effort delivery of one user-facing notification.
///
/// Implementations must return quickly; anything slow (D-Bus, audio) belongs
/// on a detached thread. Errors are logged by the caller and otherwise ignored.
pub trait Notifier {
    fn notify(&self, title: &str, message: &str) -> Result<(), EngineError>;
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify(&self, title: &str, message: &str) -> Result<(), EngineError> {
        (**self).notify(title, message)
    }
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn notify(&self, title: &str, message: &str) -> Result<(), EngineError> {
        (**self).notify(title, message)
    }
}

/// Writes notifications to the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) -> Result<(), EngineError> {
        tracing::info!(%title, %message, "notification");
        Ok(())
    }
}

/// Title and body for a reminder that just expired.
pub fn expiry_message(reminder: &Reminder) -> (String, String) {
    let title = if reminder.text.trim().is_empty() {
        "Reminder".to_string()
    } else {
        format!("Reminder: {}", reminder.text.trim())
    };
    let message = if reminder.note.trim().is_empty() {
        format!("\"{}\" is up", reminder.spec.trim())
    } else {
        reminder.note.trim().to_string()
    };
    (title, message)
}
