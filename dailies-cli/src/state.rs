use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use dailies_core::{Agenda, AgendaFile, AgendaStore, LoadReport};
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DATA_FILE: &str = "tasks.json";

pub fn dailies_home() -> Result<PathBuf> {
    resolve_home(
        std::env::var_os("DAILIES_HOME"),
        std::env::var_os("XDG_CONFIG_HOME"),
        std::env::var_os("HOME"),
    )
}

fn resolve_home(explicit: Option<OsString>, xdg: Option<OsString>, home: Option<OsString>) -> Result<PathBuf> {
    if let Some(dir) = explicit.filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    if let Some(cfg) = xdg.filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(cfg).join("daily-tasks"));
    }
    let home = home.filter(|d| !d.is_empty()).context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".config").join("daily-tasks"))
}

pub fn ensure_dailies_home() -> Result<PathBuf> {
    let dir = dailies_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// `--data` if given, else `<home>/tasks.json`.
pub fn data_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(p) => Ok(p.to_path_buf()),
        None => Ok(ensure_dailies_home()?.join(DATA_FILE)),
    }
}

/// The tasks document on disk. A missing or empty file reads as empty.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<path>.lock`, held by every load/modify/save cycle on this file.
    pub fn lock_path(&self) -> PathBuf {
        let mut p = self.path.clone().into_os_string();
        p.push(".lock");
        PathBuf::from(p)
    }

    pub fn read_file(&self) -> Result<AgendaFile> {
        if !self.path.exists() {
            return Ok(AgendaFile::default());
        }
        let s = fs::read_to_string(&self.path).with_context(|| format!("read {}", self.path.display()))?;
        if s.trim().is_empty() {
            return Ok(AgendaFile::default());
        }
        serde_json::from_str(&s).with_context(|| format!("parse {}", self.path.display()))
    }

    /// Write to `<path>.tmp` then rename over the real file.
    pub fn write_file(&self, file: &AgendaFile) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(file).context("serialize tasks")?;

        let tmp = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp).with_context(|| format!("write {}", tmp.display()))?;
        f.write_all(json.as_bytes())
            .and_then(|()| f.sync_all())
            .with_context(|| format!("write {}", tmp.display()))?;
        drop(f);
        fs::rename(&tmp, &self.path).with_context(|| format!("replace {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), "saved tasks");
        Ok(())
    }
}

impl AgendaStore for JsonStore {
    fn load<Z: TimeZone>(&mut self, now: &DateTime<Z>) -> Result<(Agenda, LoadReport)> {
        Ok(Agenda::from_file(self.read_file()?, now))
    }

    fn save(&mut self, agenda: &Agenda) -> Result<()> {
        self.write_file(&agenda.to_file())
    }

    fn exclusive<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let lock_path = self.lock_path();
        with_file_lock(&lock_path, || f(self))
    }
}

/// Run `f` while holding an exclusive advisory lock on `lock_path`.
/// Blocks until any other holder, in this process or another, lets go.
pub fn with_file_lock<T>(lock_path: &Path, f: impl FnOnce() -> Result<T>) -> Result<T> {
    if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path)
        .with_context(|| format!("open {}", lock_path.display()))?;
    let mut lock = fd_lock::RwLock::new(file);
    let _guard = lock.write().with_context(|| format!("lock {}", lock_path.display()))?;
    f()
}

/// Load, apply one user action, and save only if it succeeded. A failed
/// action leaves the stored document untouched.
pub fn update<S, Z, T, F>(store: &mut S, now: &DateTime<Z>, action: F) -> Result<T>
where
    S: AgendaStore,
    Z: TimeZone,
    F: FnOnce(&mut Agenda) -> Result<T>,
{
    store.exclusive(|store| {
        let (mut agenda, _) = store.load(now)?;
        let out = action(&mut agenda)?;
        store.save(&agenda)?;
        Ok(out)
    })
}

/// Load for display. Repairs made while loading are written back, so a
/// record without a target is resolved once instead of on every listing.
pub fn read<S, Z>(store: &mut S, now: &DateTime<Z>) -> Result<Agenda>
where
    S: AgendaStore,
    Z: TimeZone,
{
    store.exclusive(|store| {
        let (agenda, load) = store.load(now)?;
        if !load.is_clean() {
            store.save(&agenda)?;
        }
        Ok(agenda)
    })
}
