use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::Shared;
use modepin_protocol::AttemptFailure;
use modepin_protocol::AttemptOutcome;
use modepin_protocol::LogEvent;
use modepin_protocol::LogLevel;
use modepin_protocol::Mode;
use modepin_protocol::ModeOption;
use modepin_protocol::TriggerReason;
use serde_json::json;
use tokio::sync::Mutex;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::debug;

use crate::report::ReportSink;
use crate::surface::ModeSurface;
use crate::surface::SurfaceError;

/// Retries after the initial try. Escalating pauses precede each one.
pub const MAX_RETRIES: usize = 3;
pub const RETRY_DELAYS: [Duration; MAX_RETRIES] = [
    Duration::from_millis(400),
    Duration::from_millis(800),
    Duration::from_millis(1600),
];

/// Settle time after opening the option menu before looking for options.
const MENU_SETTLE_DELAY: Duration = Duration::from_millis(140);
/// Wait after clicking an option before re-reading the active mode.
const CONFIRM_DELAY: Duration = Duration::from_millis(240);

const FOCUS_ATTEMPTS: usize = 3;
const FOCUS_RETRY_PAUSE: Duration = Duration::from_millis(120);

pub const EXHAUSTED_BANNER_TEXT: &str =
    "modepin: Pro mode is unavailable right now. Retried 3 times.";

type AttemptFuture = Shared<BoxFuture<'static, bool>>;

/// The reconciliation engine. Converts a detected "mode drifted to Fast"
/// signal into a confirmed "mode is Pro" state via a bounded retry loop.
///
/// At most one attempt is ever in flight; concurrent callers join the
/// in-flight attempt and observe its outcome instead of starting a second
/// click sequence. There is no mid-attempt cancellation: once tries have
/// started, a partially opened menu is seen through to a terminal outcome.
pub struct Reconciler {
    surface: Arc<dyn ModeSurface>,
    sink: Arc<dyn ReportSink>,
    enabled: watch::Receiver<bool>,
    page_url: String,
    in_flight: Mutex<Option<AttemptFuture>>,
}

impl Reconciler {
    pub fn new(
        surface: Arc<dyn ModeSurface>,
        sink: Arc<dyn ReportSink>,
        enabled: watch::Receiver<bool>,
        page_url: impl Into<String>,
    ) -> Self {
        Self {
            surface,
            sink,
            enabled,
            page_url: page_url.into(),
            in_flight: Mutex::new(None),
        }
    }

    /// Ensure the page reports Pro mode. Returns whether it does afterwards.
    ///
    /// Disabled engines clear any visible warning and report `false` without
    /// touching the page. Otherwise the caller either starts a fresh attempt
    /// or awaits the one already in flight.
    pub async fn ensure_pro_mode(self: &Arc<Self>, reason: TriggerReason) -> bool {
        if !*self.enabled.borrow() {
            self.clear_warning().await;
            return false;
        }

        let attempt = {
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.as_ref() {
                Some(attempt) => attempt.clone(),
                None => {
                    let engine = Arc::clone(self);
                    let attempt = async move {
                        let succeeded = engine.run_attempt(reason).await;
                        // The in-flight slot stays occupied until the whole
                        // multi-try sequence has settled.
                        *engine.in_flight.lock().await = None;
                        succeeded
                    }
                    .boxed()
                    .shared();
                    *in_flight = Some(attempt.clone());
                    attempt
                }
            }
        };

        attempt.await
    }

    async fn run_attempt(&self, reason: TriggerReason) -> bool {
        let mut last_failure = AttemptFailure::Unknown;

        for retry in 0..=MAX_RETRIES {
            if retry > 0 {
                sleep(RETRY_DELAYS[retry - 1]).await;
            }

            match self.try_select_pro_once().await {
                Ok(outcome) => {
                    if outcome == AttemptOutcome::SelectedPro
                        && !self.focus_prompt_textbox().await
                    {
                        self.report(
                            LogLevel::Warn,
                            "switched to Pro but prompt textbox was not focused",
                            json!({ "reason": reason }),
                        );
                    }

                    self.clear_warning().await;
                    self.report(
                        LogLevel::Info,
                        "pro mode ensured",
                        json!({ "reason": reason, "attempt": retry + 1, "outcome": outcome }),
                    );
                    return true;
                }
                Err(failure) => {
                    last_failure = failure;
                }
            }
        }

        if let Err(error) = self
            .surface
            .show_warning_banner(EXHAUSTED_BANNER_TEXT)
            .await
        {
            debug!(%error, "could not show warning banner");
        }
        self.report(
            LogLevel::Warn,
            "failed to enforce pro mode",
            json!({ "reason": reason, "last_failure": last_failure }),
        );
        false
    }

    /// One pass of the corrective interaction sequence.
    ///
    /// Two independent success confirmations are deliberately kept: the
    /// option's checked state short-circuits before any click, and the
    /// picker's label is re-read after one. The target UI does not always
    /// keep the two consistent.
    async fn try_select_pro_once(&self) -> Result<AttemptOutcome, AttemptFailure> {
        let picker = match self.surface.find_mode_picker().await {
            Ok(Some(picker)) => picker,
            Ok(None) => return Err(AttemptFailure::ModeButtonMissing),
            Err(error) => return Err(self.surface_failure(error)),
        };

        match self.surface.active_mode().await {
            Ok(Mode::Pro) => return Ok(AttemptOutcome::AlreadyPro),
            Ok(_) => {}
            Err(error) => return Err(self.surface_failure(error)),
        }

        let expanded = self
            .surface
            .is_menu_expanded(&picker)
            .await
            .map_err(|e| self.surface_failure(e))?;
        if !expanded {
            self.surface
                .click(&picker)
                .await
                .map_err(|e| self.surface_failure(e))?;
            sleep(MENU_SETTLE_DELAY).await;
        }

        let option = match self.surface.find_option(ModeOption::Pro).await {
            Ok(Some(option)) => option,
            Ok(None) => {
                self.dismiss_menu().await;
                return Err(AttemptFailure::ProOptionMissing);
            }
            Err(error) => return Err(self.surface_failure(error)),
        };

        let checked = self
            .surface
            .is_option_checked(&option)
            .await
            .map_err(|e| self.surface_failure(e))?;
        if checked {
            self.dismiss_menu().await;
            return Ok(AttemptOutcome::AlreadyProChecked);
        }

        self.surface
            .click(&option)
            .await
            .map_err(|e| self.surface_failure(e))?;
        sleep(CONFIRM_DELAY).await;

        match self.surface.active_mode().await {
            Ok(Mode::Pro) => Ok(AttemptOutcome::SelectedPro),
            Ok(_) => Err(AttemptFailure::SwitchNotConfirmed),
            Err(error) => Err(self.surface_failure(error)),
        }
    }

    /// After an active switch, hand focus back to the prompt textbox so the
    /// user can keep typing. Cosmetic: failure never affects the attempt.
    async fn focus_prompt_textbox(&self) -> bool {
        for _ in 0..FOCUS_ATTEMPTS {
            if let Ok(Some(textbox)) = self.surface.find_prompt_textbox().await {
                if let Err(error) = self.surface.click(&textbox).await {
                    debug!(%error, "prompt textbox click failed");
                } else if matches!(self.surface.focus(&textbox).await, Ok(true)) {
                    return true;
                }
            }
            sleep(FOCUS_RETRY_PAUSE).await;
        }
        false
    }

    async fn dismiss_menu(&self) {
        if let Err(error) = self.surface.dismiss_menu().await {
            debug!(%error, "could not dismiss mode menu");
        }
    }

    pub(crate) async fn clear_warning(&self) {
        if let Err(error) = self.surface.clear_warning_banner().await {
            debug!(%error, "could not clear warning banner");
        }
    }

    fn surface_failure(&self, error: SurfaceError) -> AttemptFailure {
        debug!(%error, "surface call failed mid-try");
        AttemptFailure::SurfaceFailure
    }

    fn report(&self, level: LogLevel, message: &str, context: serde_json::Value) {
        self.sink
            .report(LogEvent::new(level, message, Some(context), &self.page_url));
    }
}
