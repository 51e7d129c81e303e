//! Desktop notification plus an optional sound for expired reminders.
//!
//! Both run on a background thread: the evaluation loop only pays for a
//! thread spawn, and a missing notification daemon or audio player is logged
//! there.

use dailies_core::{EngineError, Notifier};
use notify_rust::Notification;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::config::NotifySection;

const SOUND_FILES: [&str; 3] = [
    "/usr/share/sounds/freedesktop/stereo/complete.oga",
    "/usr/share/sounds/sound-icons/guitar-11.wav",
    "/usr/share/sounds/generic.wav",
];

const PLAYERS: [&str; 2] = ["paplay", "aplay"];

#[derive(Debug, Clone)]
struct Delivery {
    app_name: String,
    desktop: bool,
    sound: bool,
    sound_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    delivery: Delivery,
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl DesktopNotifier {
    pub fn from_config(cfg: &NotifySection) -> Self {
        Self {
            delivery: Delivery {
                app_name: cfg.app_name.clone(),
                desktop: cfg.desktop,
                sound: cfg.sound,
                sound_file: cfg.sound_file.as_ref().map(PathBuf::from),
            },
            pending: Arc::default(),
        }
    }

    /// Block until every notification sent so far has been handed off.
    /// Only one-shot commands need this; the loop never waits.
    pub fn wait(&self) {
        let handles = std::mem::take(&mut *self.pending.lock().unwrap_or_else(|e| e.into_inner()));
        for h in handles {
            if h.join().is_err() {
                tracing::warn!("notification thread panicked");
            }
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, message: &str) -> Result<(), EngineError> {
        tracing::info!(%title, %message, "reminder due");
        if !self.delivery.desktop && !self.delivery.sound {
            return Ok(());
        }

        let job = self.delivery.clone();
        let (title, message) = (title.to_string(), message.to_string());
        let handle = std::thread::Builder::new()
            .name("dailies-notify".into())
            .spawn(move || {
                if job.sound {
                    play_sound(job.sound_file.as_deref());
                }
                if job.desktop {
                    let shown = Notification::new()
                        .summary(&title)
                        .body(&message)
                        .appname(&job.app_name)
                        .icon("alarm-clock")
                        .show();
                    if let Err(e) = shown {
                        tracing::warn!("desktop notification failed: {e}");
                    }
                }
            })
            .map_err(|e| EngineError::NotificationDispatchFailed(e.to_string()))?;

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
        Ok(())
    }
}

/// The configured file if it exists, else the first stock sound present.
fn pick_sound_file(configured: Option<&Path>, stock: &[&str]) -> Option<PathBuf> {
    match configured {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => {
            tracing::warn!(path = %p.display(), "sound file not found");
            None
        }
        None => stock.iter().map(PathBuf::from).find(|p| p.exists()),
    }
}

fn play_sound(configured: Option<&Path>) {
    let Some(file) = pick_sound_file(configured, &SOUND_FILES) else {
        tracing::debug!("no sound file available");
        return;
    };
    let Some(player) = PLAYERS.iter().find_map(|p| which::which(p).ok()) else {
        tracing::debug!("no audio player found (paplay, aplay)");
        return;
    };
    let spawned = Command::new(&player)
        .arg(&file)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    if let Err(e) = spawned {
        tracing::warn!(player = %player.display(), "could not play sound: {e}");
    }
}
