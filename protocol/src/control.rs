use serde::Deserialize;
use serde::Serialize;

/// A command pushed to a running engine over the local control socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlRequest {
    SetEnabled { enabled: bool },
}

/// Acknowledgement carrying the value the engine actually applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlAck {
    pub ok: bool,
    pub enabled: bool,
}
