use std::sync::Arc;

use chrono::Utc;
use modepin_protocol::LogEvent;
use modepin_protocol::RecordedLogEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::settings::SettingsStore;

/// Drains engine reports, stamps each with a receipt time, and persists only
/// the most recent one. Storage failures are logged and dropped; recording
/// is best-effort by contract.
pub fn spawn_recorder(
    store: Arc<SettingsStore>,
    mut rx: mpsc::UnboundedReceiver<LogEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let recorded = RecordedLogEvent {
                event,
                recorded_at_ms: Utc::now().timestamp_millis(),
            };
            if let Err(error) = store.record_event(&recorded).await {
                debug!(%error, "could not persist log event");
            }
        }
    })
}
