use anyhow::Result;
use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use dailies_core::SystemClock;
use std::fmt;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod config;
mod daily_cmd;
mod notifier;
mod remind_cmd;
mod state;
mod watch;

use config::Config;
use state::JsonStore;

/// Used when `RUST_LOG` is unset: info from both dailies crates, warn elsewhere.
const DEFAULT_LOG_FILTER: &str = "dailies=info,dailies_core=info,warn";

#[derive(Parser, Debug)]
#[command(
    name = "dailies",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("DAILIES_BUILD_SHA"), ")"),
    about = "Daily tasks and reminders from the terminal"
)]
struct Cli {
    /// Tasks file to use instead of <data dir>/tasks.json
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Countdown and alarm reminders
    Remind {
        #[command(subcommand)]
        command: remind_cmd::RemindCommand,
    },

    /// Daily tasks that reset every morning
    Daily {
        #[command(subcommand)]
        command: daily_cmd::DailyCommand,
    },

    /// Run one evaluation pass: expire due reminders, reset stale dailies
    Tick,

    /// Keep evaluating until Ctrl-C
    Watch,

    /// Settings file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write settings.toml with defaults if it does not exist
    Init,

    /// Print the effective settings
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Command::Config { command } = &cli.command {
        return match command {
            ConfigCommand::Init => config::init_config(),
            ConfigCommand::Show => config::show_config(&config::load_config()?),
        };
    }

    let cfg = config::load_config()?;
    let store = JsonStore::new(state::data_path(cli.data.as_deref())?);
    tracing::debug!(path = %store.path().display(), "using tasks file");

    match cfg.zone()? {
        Some(tz) => run(cli.command, &cfg, SystemClock::new(tz), store).await,
        None => run(cli.command, &cfg, SystemClock::new(Local), store).await,
    }
}

async fn run<Z>(command: Command, cfg: &Config, clock: SystemClock<Z>, mut store: JsonStore) -> Result<()>
where
    Z: TimeZone,
    Z::Offset: fmt::Display,
{
    match command {
        Command::Remind { command } => remind_cmd::run(command, &clock, &mut store),
        Command::Daily { command } => daily_cmd::run(command, &clock, &mut store),
        Command::Tick => {
            let lp = watch::evaluation_loop(cfg)?;
            let outcome = watch::tick_once(&lp, &clock, &mut store);
            lp.notifier().wait();
            outcome.map(|_| ())
        }
        Command::Watch => {
            let lp = watch::evaluation_loop(cfg)?;
            watch::watch(&lp, &clock, &mut store).await
        }
        Command::Config { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_covers_the_engine_crate() {
        let filter = tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER).unwrap();
        let shown = filter.to_string();
        assert!(shown.contains("dailies_core=info"), "{shown}");
        assert!(shown.contains("dailies=info"), "{shown}");
    }
}
