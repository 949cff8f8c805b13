use async_trait::async_trait;
use modepin_protocol::Mode;
use modepin_protocol::ModeOption;

/// Opaque reference to an element the surface has located. Handles are only
/// valid until the next lookup for the same role; the engine re-locates
/// elements on every try rather than holding on to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("page script evaluation failed: {0}")]
    Script(String),
    #[error("input dispatch failed: {0}")]
    Input(String),
    #[error("page surface detached: {0}")]
    Detached(String),
}

pub type Result<T> = std::result::Result<T, SurfaceError>;

/// Everything the engine needs from the live page, behind one seam.
///
/// Query methods are pure: they return the best currently-visible match for a
/// semantic role, or `None`. How a role maps to concrete markup (ordered
/// selector strategies, label-text heuristics) is entirely the implementor's
/// business, so the engine never special-cases text or markup.
#[async_trait]
pub trait ModeSurface: Send + Sync {
    /// Locate the mode-picker control.
    async fn find_mode_picker(&self) -> Result<Option<ElementHandle>>;

    /// Read the mode the picker currently reports, straight off the DOM.
    async fn active_mode(&self) -> Result<Mode>;

    /// Whether the picker's option menu is currently expanded.
    async fn is_menu_expanded(&self, picker: &ElementHandle) -> Result<bool>;

    /// Locate the menu option for the given mode.
    async fn find_option(&self, option: ModeOption) -> Result<Option<ElementHandle>>;

    /// Whether the option element carries a checked state.
    async fn is_option_checked(&self, option: &ElementHandle) -> Result<bool>;

    /// Simulate a user click on the element.
    async fn click(&self, element: &ElementHandle) -> Result<()>;

    /// Close an open option menu: a body click plus a synthetic Escape.
    async fn dismiss_menu(&self) -> Result<()>;

    /// Locate the page's primary text-entry element.
    async fn find_prompt_textbox(&self) -> Result<Option<ElementHandle>>;

    /// Move input focus to the element without scrolling. Returns whether
    /// focus could be confirmed afterwards.
    async fn focus(&self, element: &ElementHandle) -> Result<bool>;

    /// Show the fixed-identity warning banner. Re-showing replaces any
    /// banner already present; it never stacks.
    async fn show_warning_banner(&self, text: &str) -> Result<()>;

    /// Remove the warning banner if present.
    async fn clear_warning_banner(&self) -> Result<()>;
}
