use std::sync::Arc;
use std::time::Duration;

use modepin_protocol::Mode;
use modepin_protocol::TriggerReason;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio::time::sleep_until;
use tracing::debug;

use crate::reconciler::Reconciler;
use crate::surface::ModeSurface;

/// Delay applied to mutation-triggered checks so DOM churn coalesces into a
/// single logical "something changed" signal.
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(120);

#[derive(Debug, Clone, Copy)]
pub(crate) enum WatchSignal {
    /// A batch of DOM mutations was observed; check after the debounce delay.
    Mutation,
    /// The user clicked the Fast option; check immediately.
    FastClick,
    /// An enablement transition or startup requested an immediate check.
    Kick(TriggerReason),
}

/// Cheap handle for feeding signals into the watcher from page callbacks and
/// the enablement gate. Send failures mean the watcher is gone; ignored.
#[derive(Clone)]
pub struct WatcherHandle {
    tx: mpsc::UnboundedSender<WatchSignal>,
}

impl WatcherHandle {
    pub fn mutation(&self) {
        let _ = self.tx.send(WatchSignal::Mutation);
    }

    pub fn fast_click(&self) {
        let _ = self.tx.send(WatchSignal::FastClick);
    }

    pub fn kick(&self, reason: TriggerReason) {
        let _ = self.tx.send(WatchSignal::Kick(reason));
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingCheck {
    deadline: Instant,
    reason: TriggerReason,
    immediate: bool,
}

/// Converts noisy page signals into debounced reconciliation checks.
///
/// There is exactly one pending-timer slot. Scheduling replaces it according
/// to [`merge_pending`]; under heavy churn no timers pile up. At fire time
/// the current mode is re-read, because DOM state may have changed during the
/// debounce window, and only a live `Fast` reading invokes the engine.
pub struct ChangeWatcher {
    reconciler: Arc<Reconciler>,
    surface: Arc<dyn ModeSurface>,
    enabled: watch::Receiver<bool>,
}

impl ChangeWatcher {
    pub fn spawn(
        reconciler: Arc<Reconciler>,
        surface: Arc<dyn ModeSurface>,
        enabled: watch::Receiver<bool>,
    ) -> (WatcherHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = Self {
            reconciler,
            surface,
            enabled,
        };
        let task = tokio::spawn(watcher.run(rx));
        (WatcherHandle { tx }, task)
    }

    async fn run(self, mut rx: mpsc::UnboundedReceiver<WatchSignal>) {
        let mut pending: Option<PendingCheck> = None;
        loop {
            let deadline = pending
                .as_ref()
                .map(|check| check.deadline)
                .unwrap_or_else(Instant::now);
            tokio::select! {
                signal = rx.recv() => {
                    let Some(signal) = signal else { break };
                    self.schedule(&mut pending, signal);
                }
                _ = sleep_until(deadline), if pending.is_some() => {
                    if let Some(check) = pending.take() {
                        self.fire(check.reason).await;
                    }
                }
            }
        }
    }

    fn schedule(&self, pending: &mut Option<PendingCheck>, signal: WatchSignal) {
        // No timer is armed while the gate is off.
        if !*self.enabled.borrow() {
            return;
        }

        let (reason, immediate) = match signal {
            WatchSignal::Mutation => (TriggerReason::DomMutation, false),
            WatchSignal::FastClick => (TriggerReason::FastClick, true),
            WatchSignal::Kick(reason) => (reason, true),
        };
        let delay = if immediate {
            Duration::ZERO
        } else {
            DEBOUNCE_DELAY
        };
        let incoming = PendingCheck {
            deadline: Instant::now() + delay,
            reason,
            immediate,
        };
        *pending = Some(merge_pending(pending.take(), incoming));
    }

    async fn fire(&self, reason: TriggerReason) {
        if !*self.enabled.borrow() {
            return;
        }

        match self.surface.active_mode().await {
            Ok(Mode::Fast) => {
                let engine = Arc::clone(&self.reconciler);
                tokio::spawn(async move {
                    engine.ensure_pro_mode(reason).await;
                });
            }
            Ok(_) => {}
            Err(error) => debug!(%error, "mode read failed at check time"),
        }
    }
}

/// Collapse a newly scheduled check into the single pending-timer slot.
///
/// Mutation re-triggers restart the debounce window; immediate requests
/// collapse to the shortest pending deadline; and a pending immediate check
/// is never postponed by a later mutation.
fn merge_pending(existing: Option<PendingCheck>, incoming: PendingCheck) -> PendingCheck {
    let Some(existing) = existing else {
        return incoming;
    };

    if incoming.immediate {
        if incoming.deadline <= existing.deadline {
            incoming
        } else {
            existing
        }
    } else if existing.immediate {
        existing
    } else {
        incoming
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use crate::report::ReportSink;
    use crate::test_support::FakeSurface;
    use crate::test_support::RecordingSink;
    use pretty_assertions::assert_eq;
    use tokio::task::yield_now;
    use tokio::time::sleep;

    const URL: &str = "https://gemini.google.com/app";

    struct Harness {
        surface: Arc<FakeSurface>,
        sink: Arc<RecordingSink>,
        enabled_tx: watch::Sender<bool>,
        handle: WatcherHandle,
    }

    fn harness(surface: FakeSurface, enabled: bool) -> Harness {
        let surface = Arc::new(surface);
        let sink = Arc::new(RecordingSink::default());
        let (enabled_tx, enabled_rx) = watch::channel(enabled);
        let reconciler = Arc::new(Reconciler::new(
            surface.clone(),
            sink.clone() as Arc<dyn ReportSink>,
            enabled_rx.clone(),
            URL,
        ));
        let (handle, _task) = ChangeWatcher::spawn(reconciler, surface.clone(), enabled_rx);
        Harness {
            surface,
            sink,
            enabled_tx,
            handle,
        }
    }

    async fn wait_for_info_reports(h: &Harness, count: usize) {
        for _ in 0..1000 {
            if h.sink.info_reasons().len() >= count {
                return;
            }
            yield_now().await;
        }
        panic!("watcher never produced {count} info report(s)");
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_triggers_collapses_to_one_immediate_check() {
        // Scenario D: a dom-mutation and a fast-click land inside the same
        // debounce window; exactly one check runs, at the shortest delay.
        let h = harness(FakeSurface::with_modes([Mode::Fast, Mode::Pro]), true);
        let start = Instant::now();

        h.handle.mutation();
        h.handle.fast_click();

        wait_for_info_reports(&h, 1).await;
        sleep(Duration::from_millis(500)).await;

        assert_eq!(h.sink.info_reasons(), vec!["fast-click".to_string()]);
        // One fire-time read plus one read inside the attempt.
        assert_eq!(h.surface.active_mode_count(), 2);
        let instants = h.surface.active_mode_instants();
        assert_eq!(instants[0], start);
    }

    #[tokio::test(start_paused = true)]
    async fn mutation_bursts_restart_the_debounce_window() {
        let h = harness(FakeSurface::with_modes([Mode::Pro]), true);
        let start = Instant::now();

        h.handle.mutation();
        sleep(Duration::from_millis(100)).await;
        h.handle.mutation();
        sleep(Duration::from_millis(1000)).await;

        let instants = h.surface.active_mode_instants();
        assert_eq!(instants.len(), 1);
        assert_eq!(instants[0] - start, Duration::from_millis(220));
    }

    #[tokio::test(start_paused = true)]
    async fn check_is_skipped_when_mode_is_not_fast_at_fire_time() {
        let h = harness(FakeSurface::with_modes([Mode::Thinking]), true);

        h.handle.mutation();
        sleep(Duration::from_millis(500)).await;

        assert_eq!(h.surface.active_mode_count(), 1);
        assert_eq!(h.surface.find_picker_count(), 0);
        assert!(h.sink.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_scheduled_while_disabled() {
        let h = harness(FakeSurface::with_modes([Mode::Fast]), false);

        h.handle.mutation();
        h.handle.fast_click();
        sleep(Duration::from_millis(1000)).await;

        assert_eq!(h.surface.active_mode_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn kick_fires_an_immediate_check_with_its_reason() {
        let h = harness(FakeSurface::with_modes([Mode::Fast, Mode::Pro]), true);

        h.handle.kick(TriggerReason::PopupEnable);
        wait_for_info_reports(&h, 1).await;

        assert_eq!(h.sink.info_reasons(), vec!["popup-enable".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn reenabling_after_disable_resumes_scheduling() {
        let h = harness(FakeSurface::with_modes([Mode::Fast, Mode::Pro]), false);

        h.handle.mutation();
        sleep(Duration::from_millis(500)).await;
        assert_eq!(h.surface.active_mode_count(), 0);

        h.enabled_tx.send_replace(true);
        h.handle.kick(TriggerReason::StorageEnable);
        wait_for_info_reports(&h, 1).await;

        assert_eq!(h.sink.info_reasons(), vec!["storage-enable".to_string()]);
    }

    #[test]
    fn merge_prefers_the_shortest_deadline_for_immediates() {
        let now = Instant::now();
        let debounced = PendingCheck {
            deadline: now + DEBOUNCE_DELAY,
            reason: TriggerReason::DomMutation,
            immediate: false,
        };
        let immediate = PendingCheck {
            deadline: now,
            reason: TriggerReason::FastClick,
            immediate: true,
        };

        let merged = merge_pending(Some(debounced), immediate);
        assert_eq!(merged.deadline, now);
        assert!(merged.immediate);

        // A pending immediate is never postponed by a later mutation.
        let later_mutation = PendingCheck {
            deadline: now + DEBOUNCE_DELAY,
            reason: TriggerReason::DomMutation,
            immediate: false,
        };
        let merged = merge_pending(Some(immediate), later_mutation);
        assert_eq!(merged.deadline, now);

        // Mutation on mutation restarts the window.
        let restarted = PendingCheck {
            deadline: now + DEBOUNCE_DELAY + DEBOUNCE_DELAY,
            reason: TriggerReason::DomMutation,
            immediate: false,
        };
        let merged = merge_pending(Some(debounced), restarted);
        assert_eq!(merged.deadline, restarted.deadline);
    }
}
