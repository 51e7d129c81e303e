use anyhow::{Context, Result};
use chrono::Utc;
use clap::Subcommand;
use dailies_core::{Agenda, AgendaStore, Clock, Priority, RecurringTask, TaskStatus};

use crate::state::{read, update};

#[derive(Subcommand, Debug)]
pub enum DailyCommand {
    /// Add a daily task
    Add {
        description: String,

        /// high, medium or low
        #[arg(long)]
        priority: Option<String>,

        #[arg(long, default_value = "")]
        category: String,

        /// Free-form, e.g. "10pm"
        #[arg(long, default_value = "")]
        deadline: String,
    },

    /// List dailies
    List,

    /// Check off a daily, or un-check it
    Toggle { id: u64 },

    /// Delete a daily
    Delete { id: u64 },
}

pub fn run<C: Clock, S: AgendaStore>(cmd: DailyCommand, clock: &C, store: &mut S) -> Result<()> {
    let now = clock.now();
    match cmd {
        DailyCommand::Add {
            description,
            priority,
            category,
            deadline,
        } => {
            let mut task = RecurringTask::new(0, description.clone())
                .with_category(category)
                .with_deadline(deadline);
            if let Some(p) = priority {
                let p: Priority = p.parse().context("--priority")?;
                task = task.with_priority(p);
            }
            let id = update(store, &now, |a| Ok(a.add_daily(task)))?;
            println!("Added daily {id}: {description}");
        }
        DailyCommand::List => {
            let agenda = read(store, &now)?;
            print!("{}", render_list(&agenda));
        }
        DailyCommand::Toggle { id } => {
            let stamp = now.with_timezone(&Utc);
            let status = update(store, &now, |a| Ok(a.toggle_daily(id, stamp)?))?;
            match status {
                TaskStatus::Done => println!("Checked off daily {id}"),
                TaskStatus::Incomplete => println!("Daily {id} is open again"),
            }
        }
        DailyCommand::Delete { id } => {
            let removed = update(store, &now, |a| Ok(a.remove_daily(id)?))?;
            println!("Deleted daily {id} ({})", removed.description);
        }
    }
    Ok(())
}

pub fn render_list(agenda: &Agenda) -> String {
    if agenda.dailies.is_empty() {
        return "No dailies.\n".to_string();
    }
    let mut out = String::new();
    for t in &agenda.dailies {
        let mark = if t.is_done() { "x" } else { " " };
        let mut extras = Vec::new();
        if let Some(p) = t.priority {
            extras.push(format!("{p:?}"));
        }
        if !t.category.is_empty() {
            extras.push(t.category.clone());
        }
        if !t.deadline.is_empty() {
            extras.push(format!("by {}", t.deadline));
        }
        out.push_str(&format!("{:>3}  [{mark}] {}", t.id, t.description));
        if !extras.is_empty() {
            out.push_str(&format!("  ({})", extras.join(", ")));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};
    use dailies_core::{ManualClock, MemoryStore};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 14, 0, 0).unwrap()
    }

    fn add(clock: &ManualClock<Utc>, store: &mut MemoryStore, description: &str, priority: Option<&str>) -> Result<()> {
        run(
            DailyCommand::Add {
                description: description.into(),
                priority: priority.map(str::to_string),
                category: String::new(),
                deadline: String::new(),
            },
            clock,
            store,
        )
    }

    #[test]
    fn add_toggle_delete() {
        let clock = ManualClock::new(Utc, t0());
        let mut store = MemoryStore::default();
        add(&clock, &mut store, "Walk", Some("High")).unwrap();
        add(&clock, &mut store, "Read", None).unwrap();

        run(DailyCommand::Toggle { id: 1 }, &clock, &mut store).unwrap();
        assert_eq!(store.file.dailies[0].status, TaskStatus::Done);
        assert_eq!(store.file.dailies[0].last_completed_at, Some(t0()));

        run(DailyCommand::Delete { id: 2 }, &clock, &mut store).unwrap();
        assert_eq!(store.file.dailies.len(), 1);
        assert!(run(DailyCommand::Toggle { id: 2 }, &clock, &mut store).is_err());
    }

    #[test]
    fn bad_priority_is_rejected_before_saving() {
        let clock = ManualClock::new(Utc, t0());
        let mut store = MemoryStore::default();
        assert!(add(&clock, &mut store, "Walk", Some("urgent")).is_err());
        assert_eq!(store.saves, 0);
    }

    #[test]
    fn list_marks_done_and_extras() {
        let mut agenda = Agenda::new();
        let id = agenda.add_daily(
            RecurringTask::new(0, "Stretch")
                .with_priority(Priority::Low)
                .with_category("Health")
                .with_deadline("10pm"),
        );
        agenda.add_daily(RecurringTask::new(0, "Read"));
        agenda.toggle_daily(id, t0()).unwrap();

        assert_eq!(
            render_list(&agenda),
            "  1  [x] Stretch  (Low, Health, by 10pm)\n  2  [ ] Read\n"
        );
    }
}
