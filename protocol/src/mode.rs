use serde::Deserialize;
use serde::Serialize;
use strum_macros::Display;

/// The mode the target app currently reports on its mode-picker control.
///
/// Derived on demand from the picker's visible label text; never cached
/// beyond a single decision point, since the DOM is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    Pro,
    Fast,
    Thinking,
    Unknown,
}

impl Mode {
    /// Derive a mode from a label string scraped off the page.
    ///
    /// Matches the first recognized mode word in the text, case-insensitive,
    /// so both a bare pill label ("Pro") and a longer fallback string
    /// ("Open mode picker - Fast") resolve. Unrecognized text is `Unknown`.
    pub fn from_label(text: &str) -> Self {
        for word in text.split(|c: char| !c.is_alphanumeric()) {
            match word.to_ascii_lowercase().as_str() {
                "pro" => return Mode::Pro,
                "fast" => return Mode::Fast,
                "thinking" => return Mode::Thinking,
                _ => {}
            }
        }
        Mode::Unknown
    }
}

/// A mode-picker menu option the engine can look up and click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModeOption {
    Pro,
    Fast,
}
