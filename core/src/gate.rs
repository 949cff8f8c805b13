use std::sync::Arc;

use modepin_protocol::TriggerReason;
use tokio::sync::watch;
use tracing::debug;
use tracing::info;

use crate::surface::ModeSurface;
use crate::watcher::WatcherHandle;

/// Which channel delivered an enablement update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableSource {
    /// A `set_enabled` command over the control socket.
    Control,
    /// A change notification from the persistent settings store.
    Storage,
}

impl EnableSource {
    fn trigger_reason(self) -> TriggerReason {
        match self {
            EnableSource::Control => TriggerReason::PopupEnable,
            EnableSource::Storage => TriggerReason::StorageEnable,
        }
    }
}

/// Holds the process-wide enabled flag and reacts to its transitions.
///
/// Consumers subscribe through a watch channel, so a reader mid-transition
/// always sees the latest write. Setting the flag on schedules an immediate
/// reconciliation check; setting it off clears the warning banner and leaves
/// suppression to the subscribers.
pub struct EnablementGate {
    enabled: watch::Sender<bool>,
    watcher: WatcherHandle,
    surface: Arc<dyn ModeSurface>,
}

impl EnablementGate {
    pub fn new(
        enabled: watch::Sender<bool>,
        watcher: WatcherHandle,
        surface: Arc<dyn ModeSurface>,
    ) -> Self {
        Self {
            enabled,
            watcher,
            surface,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.enabled.subscribe()
    }

    pub fn is_enabled(&self) -> bool {
        *self.enabled.borrow()
    }

    /// Apply an update from one of the input channels and return the value
    /// that now holds.
    pub async fn apply(&self, enabled: bool, source: EnableSource) -> bool {
        self.enabled.send_replace(enabled);
        info!(enabled, ?source, "enablement updated");

        if enabled {
            self.watcher.kick(source.trigger_reason());
        } else if let Err(error) = self.surface.clear_warning_banner().await {
            debug!(%error, "could not clear warning banner on disable");
        }
        enabled
    }
}
