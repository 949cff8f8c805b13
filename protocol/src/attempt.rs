use serde::Deserialize;
use serde::Serialize;
use strum_macros::Display;

/// Why a reconciliation check was requested. Carried through the attempt so
/// reports can attribute an enforcement run to its original trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TriggerReason {
    InitialLoad,
    DomMutation,
    FastClick,
    PopupEnable,
    StorageEnable,
}

/// Terminal success of a single try within an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AttemptOutcome {
    /// The picker already reported Pro; nothing was clicked.
    AlreadyPro,
    /// The Pro menu option already carried a checked state.
    AlreadyProChecked,
    /// The Pro option was clicked and the picker confirmed the switch.
    SelectedPro,
}

/// Why a single try failed. All of these are non-fatal and drive a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AttemptFailure {
    ModeButtonMissing,
    ProOptionMissing,
    SwitchNotConfirmed,
    /// A page-surface call errored mid-try (page detached, script failed).
    SurfaceFailure,
    Unknown,
}
