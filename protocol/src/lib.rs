//! Types used to communicate between the modepin engine, the recorder, and
//! the control surface. This crate is the lingua franca of the workspace and
//! should stay free of heavyweight dependencies.

pub mod attempt;
pub mod control;
pub mod log_event;
pub mod mode;

pub use attempt::AttemptFailure;
pub use attempt::AttemptOutcome;
pub use attempt::TriggerReason;
pub use control::ControlAck;
pub use control::ControlRequest;
pub use log_event::LogEvent;
pub use log_event::LogLevel;
pub use log_event::RecordedLogEvent;
pub use mode::Mode;
pub use mode::ModeOption;
