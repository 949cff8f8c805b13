//! Chromium-backed implementation of the engine's page surface.
//!
//! Attaches to an already-running browser over the DevTools protocol, finds
//! the target app's tab, injects a small query helper, and exposes the DOM
//! to the engine through [`CdpSurface`]. Page-side signals (DOM mutations,
//! clicks on the Fast option) flow back over a CDP binding.

mod config;
mod manager;
mod script;
mod surface;

pub use config::ConnectConfig;
pub use config::DEFAULT_APP_URL_PREFIX;
pub use manager::BrowserConnection;
pub use manager::connect;
pub use manager::find_app_page;
pub use surface::CdpSurface;

#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("CDP error: {0}")]
    CdpError(String),
    #[error("no open page matches {0}")]
    TargetNotFound(String),
    #[error("invalid browser config: {0}")]
    ConfigError(String),
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(error: chromiumoxide::error::CdpError) -> Self {
        BrowserError::CdpError(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BrowserError>;
