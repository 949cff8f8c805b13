//! The modepin engine: watches a live page for mode drift and drives it back
//! to the preferred option.
//!
//! The pieces here are wired together by the `modepin` binary:
//! [`watcher::ChangeWatcher`] debounces page signals into checks,
//! [`reconciler::Reconciler`] runs the bounded retry loop that performs the
//! corrective clicks, [`gate::EnablementGate`] holds the user-controlled
//! enable flag, and [`recorder`] persists the most recent report. The actual
//! DOM access lives behind the [`surface::ModeSurface`] trait so the engine
//! never touches selectors or label strings itself.

#[cfg(unix)]
pub mod control;
pub mod gate;
pub mod reconciler;
pub mod recorder;
pub mod report;
pub mod settings;
pub mod surface;
pub mod watcher;

#[cfg(test)]
pub(crate) mod test_support;

pub use surface::ElementHandle;
pub use surface::ModeSurface;
pub use surface::SurfaceError;
