use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use modepin_protocol::RecordedLogEvent;
use notify::RecommendedWatcher;
use notify::RecursiveMode;
use notify::Watcher;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::gate::EnableSource;
use crate::gate::EnablementGate;

pub const SETTINGS_FILE: &str = "settings.json";
pub const STATUS_FILE: &str = "status.json";
const HOME_ENV_VAR: &str = "MODEPIN_HOME";

/// Returns the modepin state directory, `$MODEPIN_HOME` or `~/.modepin`.
pub fn modepin_home() -> io::Result<PathBuf> {
    if let Ok(value) = std::env::var(HOME_ENV_VAR) {
        if !value.is_empty() {
            return Ok(PathBuf::from(value));
        }
    }
    let mut home = dirs::home_dir().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "could not determine home directory",
        )
    })?;
    home.push(".modepin");
    Ok(home)
}

/// The one persistent setting shared with the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// JSON-file-backed store for the settings and the most recent recorded
/// event. Both the engine and the `modepin` control subcommands read and
/// write it, so reads are forgiving: a missing or malformed file is treated
/// as defaults.
pub struct SettingsStore {
    home: PathBuf,
}

impl SettingsStore {
    pub fn new(home: PathBuf) -> Self {
        Self { home }
    }

    pub fn open_default() -> io::Result<Self> {
        Ok(Self::new(modepin_home()?))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    fn settings_path(&self) -> PathBuf {
        self.home.join(SETTINGS_FILE)
    }

    fn status_path(&self) -> PathBuf {
        self.home.join(STATUS_FILE)
    }

    pub async fn load(&self) -> Settings {
        match tokio::fs::read(self.settings_path()).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(settings) => settings,
                Err(error) => {
                    warn!(%error, "settings file is malformed; using defaults");
                    Settings::default()
                }
            },
            Err(_) => Settings::default(),
        }
    }

    pub async fn set_enabled(&self, enabled: bool) -> io::Result<Settings> {
        let mut settings = self.load().await;
        settings.enabled = enabled;
        tokio::fs::create_dir_all(&self.home).await?;
        let bytes = serde_json::to_vec_pretty(&settings)?;
        tokio::fs::write(self.settings_path(), bytes).await?;
        Ok(settings)
    }

    pub async fn load_last_event(&self) -> Option<RecordedLogEvent> {
        let bytes = tokio::fs::read(self.status_path()).await.ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Overwrite the single stored event with a newer one.
    pub async fn record_event(&self, event: &RecordedLogEvent) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.home).await?;
        let bytes = serde_json::to_vec_pretty(event)?;
        tokio::fs::write(self.status_path(), bytes).await?;
        Ok(())
    }

    /// Watch the settings file for external writes. Notifications are
    /// filtered to the settings path; other files in the home directory
    /// (the status file in particular) do not produce signals. The returned
    /// watcher must be kept alive for as long as notifications are wanted.
    pub fn watch_enabled(
        &self,
    ) -> notify::Result<(RecommendedWatcher, mpsc::UnboundedReceiver<()>)> {
        std::fs::create_dir_all(&self.home).map_err(notify::Error::io)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
                let Ok(event) = result else { return };
                if event.paths.iter().any(|path| path.ends_with(SETTINGS_FILE)) {
                    let _ = tx.send(());
                }
            })?;
        watcher.watch(&self.home, RecursiveMode::NonRecursive)?;
        Ok((watcher, rx))
    }
}

/// Bridge settings-file change notifications into the enablement gate.
///
/// Only an actual flip of the tracked key is applied; unrelated writes to
/// the file are ignored.
pub fn spawn_enabled_sync(
    store: Arc<SettingsStore>,
    gate: Arc<EnablementGate>,
) -> notify::Result<(RecommendedWatcher, JoinHandle<()>)> {
    let (watcher, mut rx) = store.watch_enabled()?;
    let task = tokio::spawn(async move {
        while rx.recv().await.is_some() {
            let settings = store.load().await;
            if settings.enabled != gate.is_enabled() {
                gate.apply(settings.enabled, EnableSource::Storage).await;
            }
        }
    });
    Ok((watcher, task))
}
