use anyhow::{Result, bail};
use chrono::{DateTime, TimeZone, Utc};
use clap::Subcommand;
use dailies_core::{
    Agenda, AgendaStore, Clock, Reminder, ReminderEdit, ReminderState, format_remaining,
};
use std::fmt;

use crate::state::{read, update};

#[derive(Subcommand, Debug)]
pub enum RemindCommand {
    /// Add a reminder and start it
    Add {
        /// What to be reminded of
        text: String,

        /// When: a countdown ("45m", "2h", "90sec", "1w") or a clock time ("9:30pm", "21:30")
        #[arg(long)]
        at: String,

        /// Shown as the notification body
        #[arg(long, default_value = "")]
        note: String,
    },

    /// List reminders with their remaining time
    List,

    /// Start an inactive or expired reminder, or resume a paused one
    Start { id: u64 },

    /// Pause an active reminder, keeping its remaining time
    Pause { id: u64 },

    /// Restart a reminder from its spec
    Reset { id: u64 },

    /// Delete a reminder
    Delete { id: u64 },

    /// Change text, note or spec. A new spec restarts the reminder.
    Edit {
        id: u64,

        #[arg(long)]
        text: Option<String>,

        #[arg(long)]
        note: Option<String>,

        #[arg(long)]
        at: Option<String>,
    },
}

pub fn run<C, S>(cmd: RemindCommand, clock: &C, store: &mut S) -> Result<()>
where
    C: Clock,
    <C::Zone as TimeZone>::Offset: fmt::Display,
    S: AgendaStore,
{
    let now = clock.now();
    match cmd {
        RemindCommand::Add { text, at, note } => add(store, &now, text, note, at),
        RemindCommand::List => {
            let agenda = read(store, &now)?;
            print!("{}", render_list(&agenda, &now));
            Ok(())
        }
        RemindCommand::Start { id } => {
            let line = update(store, &now, |a| {
                a.start_reminder(id, &now)?;
                Ok(describe(a.reminder(id)?, &now))
            })?;
            println!("Started reminder {id}: {line}");
            Ok(())
        }
        RemindCommand::Pause { id } => {
            let line = update(store, &now, |a| {
                a.pause_reminder(id, now.with_timezone(&Utc))?;
                Ok(describe(a.reminder(id)?, &now))
            })?;
            println!("Paused reminder {id}: {line}");
            Ok(())
        }
        RemindCommand::Reset { id } => {
            let line = update(store, &now, |a| {
                a.reset_reminder(id, &now)?;
                Ok(describe(a.reminder(id)?, &now))
            })?;
            println!("Reset reminder {id}: {line}");
            Ok(())
        }
        RemindCommand::Delete { id } => {
            let removed = update(store, &now, |a| Ok(a.remove_reminder(id)?))?;
            println!("Deleted reminder {id} ({})", removed.text);
            Ok(())
        }
        RemindCommand::Edit { id, text, note, at } => {
            if text.is_none() && note.is_none() && at.is_none() {
                bail!("nothing to change: pass --text, --note or --at");
            }
            let edit = ReminderEdit { text, note, spec: at };
            let line = update(store, &now, |a| {
                a.edit_reminder(id, edit, &now)?;
                Ok(describe(a.reminder(id)?, &now))
            })?;
            println!("Updated reminder {id}: {line}");
            Ok(())
        }
    }
}

/// A spec that does not parse still creates the reminder, left inactive.
fn add<S, Z>(store: &mut S, now: &DateTime<Z>, text: String, note: String, at: String) -> Result<()>
where
    S: AgendaStore,
    Z: TimeZone,
    Z::Offset: fmt::Display,
{
    let (added, line) = update(store, now, |a| {
        let added = a.add_reminder(text.clone(), note, at.clone(), now);
        let line = describe(a.reminder(added.id)?, now);
        Ok((added, line))
    })?;

    match &added.activation {
        Ok(_) => println!("Added reminder {} ({text}): {line}", added.id),
        Err(e) => {
            tracing::warn!(intent = ?added.intent(&at), "reminder added inactive");
            println!("Added reminder {} ({text}) but did not start it: {e}", added.id);
        }
    }
    Ok(())
}

fn local_time<Z>(at: DateTime<Utc>, zone: &Z) -> String
where
    Z: TimeZone,
    Z::Offset: fmt::Display,
{
    at.with_timezone(zone).format("%a %H:%M").to_string()
}

/// One-line state summary: remaining time, alarm time, or why it is idle.
pub fn describe<Z>(r: &Reminder, now: &DateTime<Z>) -> String
where
    Z: TimeZone,
    Z::Offset: fmt::Display,
{
    let zone = now.timezone();
    let now_utc = now.with_timezone(&Utc);
    match r.state() {
        ReminderState::Scheduled { target } => {
            let left = format_remaining(*target - now_utc);
            if r.is_countdown() {
                format!("{left} left")
            } else {
                format!("at {} ({left} left)", local_time(*target, &zone))
            }
        }
        ReminderState::Paused { remaining } => format!("paused, {} left", format_remaining(*remaining)),
        ReminderState::Expired { target } => format!("done, fired {}", local_time(*target, &zone)),
        ReminderState::Inactive => "not started".to_string(),
    }
}

pub fn render_list<Z>(agenda: &Agenda, now: &DateTime<Z>) -> String
where
    Z: TimeZone,
    Z::Offset: fmt::Display,
{
    if agenda.reminders.is_empty() {
        return "No reminders.\n".to_string();
    }
    let mut out = String::new();
    for r in &agenda.reminders {
        out.push_str(&format!(
            "{:>3}  [{:<8}] {:<24} {:<10} {}\n",
            r.id,
            r.status().as_str(),
            r.text,
            r.spec,
            describe(r, now)
        ));
        if !r.note.is_empty() {
            out.push_str(&format!("{:>16}{}\n", "", r.note));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use dailies_core::{ManualClock, MemoryStore, ReminderStatus};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 14, 0, 0).unwrap()
    }

    #[test]
    fn add_pause_start_through_the_store() {
        let clock = ManualClock::new(Utc, t0());
        let mut store = MemoryStore::default();

        run(
            RemindCommand::Add {
                text: "Tea".into(),
                at: "10m".into(),
                note: String::new(),
            },
            &clock,
            &mut store,
        )
        .unwrap();

        clock.advance(Duration::minutes(4));
        run(RemindCommand::Pause { id: 1 }, &clock, &mut store).unwrap();
        assert_eq!(store.file.reminders[0].status, "paused");

        clock.advance(Duration::hours(1));
        run(RemindCommand::Start { id: 1 }, &clock, &mut store).unwrap();
        let (agenda, _) = store.load(&clock.now()).unwrap();
        assert_eq!(
            agenda.reminder(1).unwrap().target_time(),
            Some(t0() + Duration::minutes(4) + Duration::hours(1) + Duration::minutes(6))
        );
    }

    #[test]
    fn rejected_transition_is_an_error_and_saves_nothing() {
        let clock = ManualClock::new(Utc, t0());
        let mut agenda = Agenda::new();
        agenda.add_reminder("Tea", "", "10m", &t0());
        let mut store = MemoryStore::new(&agenda);

        let err = run(RemindCommand::Start { id: 1 }, &clock, &mut store).unwrap_err();
        assert!(err.to_string().contains("already active"));
        assert_eq!(store.saves, 0);

        assert!(run(RemindCommand::Pause { id: 9 }, &clock, &mut store).is_err());
        assert_eq!(store.saves, 0);
    }

    #[test]
    fn unparseable_spec_is_added_inactive() {
        let clock = ManualClock::new(Utc, t0());
        let mut store = MemoryStore::default();
        run(
            RemindCommand::Add {
                text: "Call mum".into(),
                at: "after dinner".into(),
                note: String::new(),
            },
            &clock,
            &mut store,
        )
        .unwrap();
        assert_eq!(store.file.reminders[0].status, "inactive");
    }

    #[test]
    fn edit_needs_a_field() {
        let clock = ManualClock::new(Utc, t0());
        let mut store = MemoryStore::default();
        let edit = RemindCommand::Edit {
            id: 1,
            text: None,
            note: None,
            at: None,
        };
        assert!(run(edit, &clock, &mut store).is_err());
    }

    #[test]
    fn describe_shows_remaining_and_local_alarm_time() {
        let tz = chrono_tz::America::Chicago;
        let now = t0().with_timezone(&tz); // 08:00 CST
        let mut agenda = Agenda::new();
        agenda.add_reminder("Tea", "", "1h2m", &now);
        agenda.add_reminder("Tea", "", "62m", &now);
        agenda.add_reminder("Standup", "", "9:30am", &now);
        agenda.add_reminder("Someday", "", "whenever", &now);

        assert_eq!(agenda.reminders[0].status(), ReminderStatus::Inactive);
        assert_eq!(describe(&agenda.reminders[1], &now), "1h 02m 00s left");
        assert_eq!(describe(&agenda.reminders[2], &now), "at Mon 09:30 (1h 30m 00s left)");
        assert_eq!(describe(&agenda.reminders[3], &now), "not started");

        agenda.pause_reminder(2, t0() + Duration::minutes(2)).unwrap();
        assert_eq!(describe(&agenda.reminders[1], &now), "paused, 1h 00m 00s left");

        let listing = render_list(&agenda, &now);
        assert!(listing.contains("Standup"));
        assert_eq!(listing.lines().count(), 4);
    }
}
