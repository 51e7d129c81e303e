use anyhow::Result;
use dailies_core::{AgendaStore, Clock, EvaluationLoop, Notifier, TickReport};

use crate::config::Config;
use crate::notifier::DesktopNotifier;

pub fn evaluation_loop(cfg: &Config) -> Result<EvaluationLoop<DesktopNotifier>> {
    Ok(EvaluationLoop::new(cfg.daily_reset()?, DesktopNotifier::from_config(&cfg.notify))
        .with_interval(cfg.tick_interval()))
}

/// One evaluation pass, for cron or a manual check.
pub fn tick_once<C, S, N>(lp: &EvaluationLoop<N>, clock: &C, store: &mut S) -> Result<TickReport>
where
    C: Clock,
    S: AgendaStore,
    N: Notifier,
{
    let report = lp.run_pass(clock, store)?;
    println!("{}", summarize(&report));
    Ok(report)
}

/// Run the evaluation loop until Ctrl-C.
pub async fn watch<C, S, N>(lp: &EvaluationLoop<N>, clock: &C, store: &mut S) -> Result<()>
where
    C: Clock,
    S: AgendaStore,
    N: Notifier,
{
    println!(
        "Watching reminders and dailies every {} ms (Ctrl-C to stop)",
        lp.interval().as_millis()
    );
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };
    lp.run(clock, store, shutdown).await;
    Ok(())
}

fn summarize(report: &TickReport) -> String {
    if !report.changed() {
        return "Nothing due.".to_string();
    }
    let mut parts = Vec::new();
    if !report.reset_task_ids.is_empty() {
        parts.push(format!("reset {} dailies", report.reset_task_ids.len()));
    }
    for e in &report.expired {
        parts.push(format!("{} ({})", e.title, e.message));
    }
    if report.notify_failures > 0 {
        parts.push(format!("{} notifications failed", report.notify_failures));
    }
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use dailies_core::{Agenda, DailyReset, LogNotifier, ManualClock, MemoryStore, RecurringTask};

    #[test]
    fn tick_once_expires_and_resets() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 14, 0, 0).unwrap();
        let mut agenda = Agenda::new();
        agenda.add_reminder("Tea", "", "5m", &t0);
        let id = agenda.add_daily(RecurringTask::new(0, "Walk"));
        agenda.toggle_daily(id, t0).unwrap();
        let mut store = MemoryStore::new(&agenda);

        let lp = EvaluationLoop::new(DailyReset::default(), LogNotifier);
        let clock = ManualClock::new(Utc, t0 + Duration::days(1));
        let report = tick_once(&lp, &clock, &mut store).unwrap();

        assert_eq!(report.reset_task_ids, vec![id]);
        assert_eq!(summarize(&report), "reset 1 dailies; Reminder: Tea (\"5m\" is up)");
        assert_eq!(store.saves, 1);

        let again = tick_once(&lp, &clock, &mut store).unwrap();
        assert_eq!(summarize(&again), "Nothing due.");
    }

    #[test]
    fn loop_uses_configured_interval() {
        let mut cfg = Config::default();
        cfg.engine.tick_interval_ms = 250;
        assert_eq!(evaluation_loop(&cfg).unwrap().interval().as_millis(), 250);
    }
}
