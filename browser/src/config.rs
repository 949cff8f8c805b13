use serde::Deserialize;
use serde::Serialize;

pub const DEFAULT_APP_URL_PREFIX: &str = "https://gemini.google.com/app";

/// How to reach the browser the target app is running in. modepin never
/// launches a browser of its own: the user's logged-in session is the one
/// that matters, so we only ever attach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectConfig {
    /// Explicit DevTools WebSocket URL. Takes precedence when set.
    #[serde(default)]
    pub ws_url: Option<String>,

    /// DevTools debug port to discover the WebSocket URL from. Port 0 means
    /// scan the process table for a Chrome with a debug port.
    #[serde(default)]
    pub debug_port: u16,

    /// Only a page whose URL starts with this prefix is attached to.
    #[serde(default = "default_app_url_prefix")]
    pub app_url_prefix: String,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            ws_url: None,
            debug_port: 0,
            app_url_prefix: default_app_url_prefix(),
        }
    }
}

fn default_app_url_prefix() -> String {
    DEFAULT_APP_URL_PREFIX.to_string()
}
