//! The authoritative in-memory collection of dailies and reminders, plus its
//! JSON document form.
//!
//! Top-level keys the engine does not own (`rolling_todos`, `glossary`, ...)
//! ride along untouched in `extra`.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EngineError, Result};
use crate::intent::EngineIntent;
use crate::reminder::{Reminder, ReminderRecord, ReminderStatus};
use crate::task::{RecurringTask, TaskStatus};

/// The document as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgendaFile {
    #[serde(default)]
    pub dailies: Vec<RecurringTask>,
    #[serde(default)]
    pub reminders: Vec<ReminderRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What loading had to repair. Non-empty means the document should be saved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Reminders that had no target and were re-parsed against load time.
    pub reparsed: Vec<u64>,
    /// (old id, new id) for entities whose id collided with an earlier one.
    pub renumbered: Vec<(u64, u64)>,
    pub intents: Vec<EngineIntent>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.reparsed.is_empty() && self.renumbered.is_empty() && self.intents.is_empty()
    }
}

/// Result of adding a reminder: it always gets an id, but activation can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderAdded {
    pub id: u64,
    pub activation: Result<DateTime<Utc>>,
}

impl ReminderAdded {
    pub fn intent(&self, spec: &str) -> Option<EngineIntent> {
        self.activation.as_ref().err().map(|_| EngineIntent::ParseFailed {
            reminder_id: self.id,
            spec: spec.to_string(),
        })
    }
}

/// Optional field changes for an existing reminder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderEdit {
    pub text: Option<String>,
    pub note: Option<String>,
    pub spec: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Agenda {
    pub dailies: Vec<RecurringTask>,
    pub reminders: Vec<Reminder>,
    pub extra: Map<String, Value>,
}

impl Agenda {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the live collection from a stored document, repairing duplicate
    /// ids and re-parsing reminders that have a spec but no target.
    pub fn from_file<Z: TimeZone>(file: AgendaFile, now: &DateTime<Z>) -> (Self, LoadReport) {
        let mut report = LoadReport::default();

        let mut dailies = file.dailies;
        let ids: Vec<u64> = dailies.iter().map(|d| d.id).collect();
        for (i, new_id) in dedupe_ids(&ids) {
            if let Some(d) = dailies.get_mut(i) {
                report.renumbered.push((d.id, new_id));
                d.id = new_id;
            }
        }

        let ids: Vec<u64> = file.reminders.iter().map(|r| r.id).collect();
        let fresh = dedupe_ids(&ids);
        let mut reminders = Vec::with_capacity(file.reminders.len());
        for (i, mut record) in file.reminders.into_iter().enumerate() {
            if let Some((_, new_id)) = fresh.iter().find(|(idx, _)| *idx == i) {
                report.renumbered.push((record.id, *new_id));
                record.id = *new_id;
            }
            let needs_parse = record.target_time.is_none();
            let (reminder, err) = Reminder::from_record(record, now);
            if let Some(e) = err {
                tracing::warn!(id = reminder.id, "could not resolve stored reminder: {e}");
                report.intents.push(EngineIntent::ParseFailed {
                    reminder_id: reminder.id,
                    spec: reminder.spec.clone(),
                });
            } else if needs_parse && reminder.status() == ReminderStatus::Active {
                report.reparsed.push(reminder.id);
            }
            reminders.push(reminder);
        }

        let agenda = Self {
            dailies,
            reminders,
            extra: file.extra,
        };
        (agenda, report)
    }

    pub fn to_file(&self) -> AgendaFile {
        AgendaFile {
            dailies: self.dailies.clone(),
            reminders: self.reminders.iter().map(Reminder::to_record).collect(),
            extra: self.extra.clone(),
        }
    }

    pub fn reminder(&self, id: u64) -> Result<&Reminder> {
        self.reminders
            .iter()
            .find(|r| r.id == id)
            .ok_or(EngineError::UnknownReminder(id))
    }

    pub fn reminder_mut(&mut self, id: u64) -> Result<&mut Reminder> {
        self.reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(EngineError::UnknownReminder(id))
    }

    pub fn daily_mut(&mut self, id: u64) -> Result<&mut RecurringTask> {
        self.dailies
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(EngineError::UnknownTask(id))
    }

    /// Add a reminder and try to activate it from `spec`. A spec that does not
    /// parse still creates the reminder, left inactive.
    pub fn add_reminder<Z: TimeZone>(
        &mut self,
        text: impl Into<String>,
        note: impl Into<String>,
        spec: impl Into<String>,
        now: &DateTime<Z>,
    ) -> ReminderAdded {
        let id = next_id(self.reminders.iter().map(|r| r.id));
        let mut reminder = Reminder::new(id, text, note, spec);
        let activation = reminder
            .reset(now)
            .map(|()| reminder.target_time().unwrap_or_else(|| now.with_timezone(&Utc)));
        self.reminders.push(reminder);
        ReminderAdded { id, activation }
    }

    /// Apply field changes. A changed spec restarts the reminder from it.
    pub fn edit_reminder<Z: TimeZone>(&mut self, id: u64, edit: ReminderEdit, now: &DateTime<Z>) -> Result<()> {
        let reminder = self.reminder_mut(id)?;
        if let Some(text) = edit.text {
            reminder.text = text;
        }
        if let Some(note) = edit.note {
            reminder.note = note;
        }
        match edit.spec {
            Some(spec) if spec != reminder.spec => {
                reminder.spec = spec;
                reminder.reset(now)
            }
            _ => Ok(()),
        }
    }

    pub fn start_reminder<Z: TimeZone>(&mut self, id: u64, now: &DateTime<Z>) -> Result<()> {
        self.reminder_mut(id)?.start(now)
    }

    pub fn pause_reminder(&mut self, id: u64, now: DateTime<Utc>) -> Result<()> {
        self.reminder_mut(id)?.pause(now)
    }

    pub fn reset_reminder<Z: TimeZone>(&mut self, id: u64, now: &DateTime<Z>) -> Result<()> {
        self.reminder_mut(id)?.reset(now)
    }

    pub fn remove_reminder(&mut self, id: u64) -> Result<Reminder> {
        let idx = self
            .reminders
            .iter()
            .position(|r| r.id == id)
            .ok_or(EngineError::UnknownReminder(id))?;
        Ok(self.reminders.remove(idx))
    }

    pub fn add_daily(&mut self, task: RecurringTask) -> u64 {
        let id = next_id(self.dailies.iter().map(|t| t.id));
        self.dailies.push(RecurringTask { id, ..task });
        id
    }

    pub fn toggle_daily(&mut self, id: u64, now: DateTime<Utc>) -> Result<TaskStatus> {
        Ok(self.daily_mut(id)?.toggle(now))
    }

    pub fn remove_daily(&mut self, id: u64) -> Result<RecurringTask> {
        let idx = self
            .dailies
            .iter()
            .position(|t| t.id == id)
            .ok_or(EngineError::UnknownTask(id))?;
        Ok(self.dailies.remove(idx))
    }
}

fn next_id(ids: impl Iterator<Item = u64>) -> u64 {
    ids.max().map_or(1, |m| m.saturating_add(1))
}

/// (index, fresh id) for every entry whose id is zero or already taken by an
/// earlier entry.
fn dedupe_ids(ids: &[u64]) -> Vec<(usize, u64)> {
    let mut next = ids.iter().copied().max().unwrap_or(0).saturating_add(1);
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (i, id) in ids.iter().copied().enumerate() {
        if id == 0 || !seen.insert(id) {
            out.push((i, next));
            seen.insert(next);
            next = next.saturating_add(1);
        }
    }
    out
}
