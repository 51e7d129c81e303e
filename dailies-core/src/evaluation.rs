//! Evaluation loop: the only place time-based state changes happen.
//!
//! One pass resets stale dailies against the current boundary and expires
//! every active reminder whose target has passed. [`EvaluationLoop::run`]
//! repeats that pass on a fixed interval for the life of the process.

use std::future::Future;
use std::time::Duration as StdDuration;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use tokio::time::MissedTickBehavior;

use crate::agenda::{Agenda, AgendaFile, LoadReport};
use crate::daily_reset::{DailyReset, apply_reset};
use crate::intent::{ExpiredReminder, TickReport};
use crate::notify::{Notifier, expiry_message};
use crate::time::Clock;

pub const DEFAULT_TICK_INTERVAL: StdDuration = StdDuration::from_secs(1);

/// Shortest period the loop will tick at.
pub const MIN_TICK_INTERVAL: StdDuration = StdDuration::from_millis(100);

/// Where the authoritative collection lives between passes.
pub trait AgendaStore {
    fn load<Z: TimeZone>(&mut self, now: &DateTime<Z>) -> Result<(Agenda, LoadReport)>;
    fn save(&mut self, agenda: &Agenda) -> Result<()>;

    /// Run one load/modify/save cycle with nobody else writing the store.
    /// Stores shared between processes override this to hold a lock for
    /// the whole of `f`.
    fn exclusive<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>,
    {
        f(self)
    }
}

/// Store backed by an in-memory document.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub file: AgendaFile,
    pub saves: usize,
}

impl MemoryStore {
    pub fn new(agenda: &Agenda) -> Self {
        Self {
            file: agenda.to_file(),
            saves: 0,
        }
    }
}

impl AgendaStore for MemoryStore {
    fn load<Z: TimeZone>(&mut self, now: &DateTime<Z>) -> Result<(Agenda, LoadReport)> {
        Ok(Agenda::from_file(self.file.clone(), now))
    }

    fn save(&mut self, agenda: &Agenda) -> Result<()> {
        self.file = agenda.to_file();
        self.saves += 1;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EvaluationLoop<N: Notifier> {
    reset: DailyReset,
    interval: StdDuration,
    notifier: N,
}

impl<N: Notifier> EvaluationLoop<N> {
    pub fn new(reset: DailyReset, notifier: N) -> Self {
        Self {
            reset,
            interval: DEFAULT_TICK_INTERVAL,
            notifier,
        }
    }

    /// Intervals below [`MIN_TICK_INTERVAL`] are raised to it.
    pub fn with_interval(mut self, interval: StdDuration) -> Self {
        if interval < MIN_TICK_INTERVAL {
            tracing::warn!(requested_ms = interval.as_millis() as u64, "tick interval too short, using minimum");
        }
        self.interval = interval.max(MIN_TICK_INTERVAL);
        self
    }

    pub fn interval(&self) -> StdDuration {
        self.interval
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// One pass over every entity: state transitions only, no side effects.
    pub fn evaluate<Z: TimeZone>(&self, agenda: &mut Agenda, now: &DateTime<Z>) -> TickReport {
        let now_utc = now.with_timezone(&Utc);
        let boundary = self.reset.most_recent_boundary(now);
        let mut report = TickReport::new(now_utc, boundary);

        for task in agenda.dailies.iter_mut() {
            if apply_reset(task, boundary) {
                report.reset_task_ids.push(task.id);
            }
        }
        if !report.reset_task_ids.is_empty() {
            tracing::info!(tasks = ?report.reset_task_ids, %boundary, "dailies reset");
        }

        for reminder in agenda.reminders.iter_mut() {
            if reminder.tick_expire(now_utc) {
                let (title, message) = expiry_message(reminder);
                report.expired.push(ExpiredReminder {
                    reminder_id: reminder.id,
                    title,
                    message,
                });
            }
        }

        report
    }

    /// Fire one notification per expired reminder. Failures are counted and
    /// logged; they never undo the transition.
    pub fn dispatch(&self, report: &mut TickReport) {
        let mut failures = 0;
        for expired in &report.expired {
            if let Err(e) = self.notifier.notify(&expired.title, &expired.message) {
                tracing::warn!(id = expired.reminder_id, "{e}");
                failures += 1;
            }
        }
        report.notify_failures += failures;
    }

    /// Evaluate and dispatch, for hosts that keep the agenda in memory.
    pub fn tick<Z: TimeZone>(&self, agenda: &mut Agenda, now: &DateTime<Z>) -> TickReport {
        let mut report = self.evaluate(agenda, now);
        self.dispatch(&mut report);
        report
    }

    /// Load, evaluate, persist, then notify. Load through save runs inside
    /// [`AgendaStore::exclusive`], so a concurrent writer either lands before
    /// the load or waits for the save. Nothing is dispatched unless the new
    /// state was saved, so a failed save cannot cause a second notification
    /// on the next pass.
    pub fn run_pass<C: Clock, S: AgendaStore>(&self, clock: &C, store: &mut S) -> Result<TickReport> {
        let now = clock.now();
        let mut report = store.exclusive(|store| {
            let (mut agenda, load) = store.load(&now)?;
            for intent in &load.intents {
                tracing::warn!(?intent, "stored reminder could not be resolved");
            }

            let report = self.evaluate(&mut agenda, &now);
            if report.changed() || !load.is_clean() {
                store.save(&agenda)?;
            }
            Ok(report)
        })?;
        self.dispatch(&mut report);

        for intent in report.intents() {
            tracing::info!(?intent, "engine intent");
        }
        tracing::debug!(at = %report.at, changed = report.changed(), "tick");
        Ok(report)
    }

    /// Drive [`run_pass`](Self::run_pass) every interval until `shutdown`
    /// resolves. A late pass delays the next one; a failed pass is logged
    /// and the loop carries on.
    pub async fn run<C, S, F>(&self, clock: &C, store: &mut S, shutdown: F)
    where
        C: Clock,
        S: AgendaStore,
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let interval_ms = self.interval.as_millis() as u64;
        tracing::info!(interval_ms, "evaluation loop started");
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("evaluation loop stopped");
                    return;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.run_pass(clock, store) {
                        tracing::error!("evaluation pass failed: {e:#}");
                    }
                }
            }
        }
    }
}
