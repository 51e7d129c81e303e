use anyhow::{Context, Result};
use chrono_tz::Tz;
use dailies_core::{DEFAULT_RESET_HOUR, DailyReset, MIN_TICK_INTERVAL, parse_zone};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::state::ensure_dailies_home;

pub const MIN_TICK_INTERVAL_MS: u64 = MIN_TICK_INTERVAL.as_millis() as u64;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineSection,
    pub notify: NotifySection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Evaluation loop period.
    pub tick_interval_ms: u64,
    /// Local wall-clock hour at which dailies reset (0-23).
    pub reset_hour: u32,
    /// IANA zone name. Unset means the system local zone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifySection {
    pub desktop: bool,
    pub sound: bool,
    /// Played with paplay/aplay. Unset tries the freedesktop sounds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound_file: Option<String>,
    pub app_name: String,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            reset_hour: DEFAULT_RESET_HOUR,
            timezone: None,
        }
    }
}

impl Default for NotifySection {
    fn default() -> Self {
        Self {
            desktop: true,
            sound: true,
            sound_file: None,
            app_name: "dailies".to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.daily_reset()?;
        if self.engine.tick_interval_ms < MIN_TICK_INTERVAL_MS {
            anyhow::bail!(
                "engine.tick_interval_ms must be at least {MIN_TICK_INTERVAL_MS}, got {}",
                self.engine.tick_interval_ms
            );
        }
        self.zone()?;
        Ok(())
    }

    pub fn daily_reset(&self) -> Result<DailyReset> {
        DailyReset::new(self.engine.reset_hour).context("engine.reset_hour")
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.engine.tick_interval_ms.max(MIN_TICK_INTERVAL_MS))
    }

    /// Configured zone, or None for the system local zone.
    pub fn zone(&self) -> Result<Option<Tz>> {
        self.engine
            .timezone
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_zone(s).context("engine.timezone"))
            .transpose()
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_dailies_home()?.join("settings.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    let cfg: Config = toml::from_str(&s).with_context(|| format!("parse {}", p.display()))?;
    cfg.validate().with_context(|| format!("invalid {}", p.display()))?;
    Ok(cfg)
}

pub fn save_config_to(cfg: &Config, p: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config_to(&Config::default(), &p)?;
    println!("Wrote {}", p.display());
    Ok(())
}

pub fn show_config(cfg: &Config) -> Result<()> {
    println!("# {}", config_path()?.display());
    print!("{}", toml::to_string_pretty(cfg).context("serialize config")?);
    if cfg.engine.timezone.is_none() {
        println!("# timezone: system local");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config_from(&dir.path().join("settings.toml")).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.tick_interval(), Duration::from_secs(1));
        assert_eq!(cfg.daily_reset().unwrap().hour(), 3);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("settings.toml");
        fs::write(&p, "[engine]\nreset_hour = 4\ntimezone = \"America/Chicago\"\n").unwrap();

        let cfg = load_config_from(&p).unwrap();
        assert_eq!(cfg.engine.reset_hour, 4);
        assert_eq!(cfg.engine.tick_interval_ms, 1000);
        assert_eq!(cfg.zone().unwrap(), Some(chrono_tz::America::Chicago));
        assert!(cfg.notify.desktop);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("settings.toml");
        let mut cfg = Config::default();
        cfg.notify.sound = false;
        cfg.notify.sound_file = Some("/tmp/ding.wav".into());
        save_config_to(&cfg, &p).unwrap();
        assert_eq!(load_config_from(&p).unwrap(), cfg);
    }

    #[test]
    fn rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("settings.toml");

        for bad in [
            "[engine]\nreset_hour = 24\n",
            "[engine]\ntick_interval_ms = 10\n",
            "[engine]\ntimezone = \"Mars/Olympus\"\n",
        ] {
            fs::write(&p, bad).unwrap();
            assert!(load_config_from(&p).is_err(), "{bad}");
        }
    }
}
