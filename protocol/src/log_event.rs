use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// A structured observability event emitted by the engine, fire-and-forget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    /// URL of the page the engine was attached to when the event fired.
    pub url: String,
    /// Epoch milliseconds at emission time.
    pub timestamp_ms: i64,
}

impl LogEvent {
    pub fn new(
        level: LogLevel,
        message: impl Into<String>,
        context: Option<serde_json::Value>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            level,
            message: message.into(),
            context,
            url: url.into(),
            timestamp_ms: Utc::now().timestamp_millis(),
        }
    }
}

/// A [`LogEvent`] as persisted by the recorder, stamped on receipt. Only the
/// most recent one is ever stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedLogEvent {
    #[serde(flatten)]
    pub event: LogEvent,
    /// Epoch milliseconds when the recorder received the event.
    pub recorded_at_ms: i64,
}
