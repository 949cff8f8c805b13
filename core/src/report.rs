use modepin_protocol::LogEvent;
use modepin_protocol::LogLevel;
use tokio::sync::mpsc;
use tracing::error;
use tracing::info;
use tracing::warn;

/// Receives structured log events from the engine, fire-and-forget.
/// Implementations must swallow delivery failures; reporting is never
/// allowed to disturb an attempt.
pub trait ReportSink: Send + Sync {
    fn report(&self, event: LogEvent);
}

/// Forwards events to the recorder task over an unbounded channel, mirroring
/// each one to `tracing` at the matching level. A closed channel is ignored.
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<LogEvent>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LogEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ReportSink for ChannelReporter {
    fn report(&self, event: LogEvent) {
        match event.level {
            LogLevel::Info => info!(message = %event.message, context = ?event.context),
            LogLevel::Warn => warn!(message = %event.message, context = ?event.context),
            LogLevel::Error => error!(message = %event.message, context = ?event.context),
        }
        let _ = self.tx.send(event);
    }
}
