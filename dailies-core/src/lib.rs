//! dailies-core: Temporal engine for the dailies task and reminder manager

pub mod agenda;
pub mod daily_reset;
pub mod error;
pub mod evaluation;
pub mod intent;
pub mod notify;
pub mod reminder;
pub mod task;
pub mod time;
pub mod timespec;

pub use agenda::{Agenda, AgendaFile, LoadReport, ReminderAdded, ReminderEdit};
pub use daily_reset::{DEFAULT_RESET_HOUR, DailyReset, apply_reset, should_reset};
pub use error::{EngineError, Result};
pub use evaluation::{AgendaStore, DEFAULT_TICK_INTERVAL, EvaluationLoop, MIN_TICK_INTERVAL, MemoryStore};
pub use intent::{EngineIntent, ExpiredReminder, TickReport};
pub use notify::{LogNotifier, Notifier, expiry_message};
pub use reminder::{Reminder, ReminderRecord, ReminderState, ReminderStatus};
pub use task::{Priority, RecurringTask, TaskStatus};
pub use time::{Clock, ManualClock, SystemClock, format_remaining, local_at, parse_zone, resolve_local};
pub use timespec::{ParsedTarget, SpecKind, parse_time_spec};
