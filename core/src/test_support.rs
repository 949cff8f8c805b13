#![allow(clippy::expect_used, clippy::unwrap_used)]

//! Scripted fakes shared by the engine test modules.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use modepin_protocol::LogEvent;
use modepin_protocol::LogLevel;
use modepin_protocol::Mode;
use modepin_protocol::ModeOption;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::report::ReportSink;
use crate::surface::ElementHandle;
use crate::surface::ModeSurface;
use crate::surface::Result;

const PICKER_TOKEN: &str = "picker";
const OPTION_TOKEN: &str = "option-pro";
const PROMPT_TOKEN: &str = "prompt";

/// A `ModeSurface` whose answers are scripted per test.
///
/// `active_mode` pops from a queue and repeats the final entry once the
/// queue is down to one element, so a script like `[Fast, Pro]` reads as
/// "Fast until the option is clicked, Pro afterwards".
#[derive(Default)]
pub struct FakeSurface {
    modes: Mutex<VecDeque<Mode>>,
    picker_present: AtomicBool,
    menu_expanded: AtomicBool,
    option_present: AtomicBool,
    option_checked: AtomicBool,
    prompt_present: AtomicBool,
    focus_confirms: AtomicBool,
    picker_gate: Mutex<Option<Arc<Notify>>>,
    gate_waiters: AtomicUsize,

    banner: Mutex<Option<String>>,
    banner_shows: AtomicUsize,
    find_picker_calls: AtomicUsize,
    find_option_calls: AtomicUsize,
    active_mode_calls: AtomicUsize,
    active_mode_instants: Mutex<Vec<Instant>>,
    clicks: AtomicUsize,
    option_clicks: AtomicUsize,
    dismissals: AtomicUsize,
    focus_calls: AtomicUsize,
}

impl FakeSurface {
    pub fn with_modes(modes: impl IntoIterator<Item = Mode>) -> Self {
        let surface = Self {
            picker_present: AtomicBool::new(true),
            option_present: AtomicBool::new(true),
            prompt_present: AtomicBool::new(true),
            focus_confirms: AtomicBool::new(true),
            ..Self::default()
        };
        surface.set_modes(modes);
        surface
    }

    /// Replace the scripted mode sequence.
    pub fn set_modes(&self, modes: impl IntoIterator<Item = Mode>) {
        *self.modes.lock().unwrap() = modes.into_iter().collect();
    }

    pub fn set_picker_present(&self, present: bool) {
        self.picker_present.store(present, Ordering::SeqCst);
    }

    pub fn set_menu_expanded(&self, expanded: bool) {
        self.menu_expanded.store(expanded, Ordering::SeqCst);
    }

    pub fn set_option_present(&self, present: bool) {
        self.option_present.store(present, Ordering::SeqCst);
    }

    pub fn set_option_checked(&self, checked: bool) {
        self.option_checked.store(checked, Ordering::SeqCst);
    }

    pub fn set_focus_confirms(&self, confirms: bool) {
        self.focus_confirms.store(confirms, Ordering::SeqCst);
    }

    /// Park every picker lookup on a `Notify` so a test can hold an attempt
    /// mid-flight and release it deliberately.
    pub fn install_picker_gate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.picker_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// How many picker lookups have parked on the gate so far.
    pub fn gate_waiter_count(&self) -> usize {
        self.gate_waiters.load(Ordering::SeqCst)
    }

    pub fn force_banner(&self, text: &str) {
        *self.banner.lock().unwrap() = Some(text.to_string());
    }

    pub fn banner_text(&self) -> Option<String> {
        self.banner.lock().unwrap().clone()
    }

    pub fn banner_show_count(&self) -> usize {
        self.banner_shows.load(Ordering::SeqCst)
    }

    pub fn find_picker_count(&self) -> usize {
        self.find_picker_calls.load(Ordering::SeqCst)
    }

    pub fn find_option_count(&self) -> usize {
        self.find_option_calls.load(Ordering::SeqCst)
    }

    pub fn active_mode_count(&self) -> usize {
        self.active_mode_calls.load(Ordering::SeqCst)
    }

    /// Paused-clock instants at which `active_mode` was read.
    pub fn active_mode_instants(&self) -> Vec<Instant> {
        self.active_mode_instants.lock().unwrap().clone()
    }

    pub fn click_count(&self) -> usize {
        self.clicks.load(Ordering::SeqCst)
    }

    pub fn option_click_count(&self) -> usize {
        self.option_clicks.load(Ordering::SeqCst)
    }

    pub fn dismiss_count(&self) -> usize {
        self.dismissals.load(Ordering::SeqCst)
    }

    pub fn focus_count(&self) -> usize {
        self.focus_calls.load(Ordering::SeqCst)
    }

    fn next_mode(&self) -> Mode {
        let mut modes = self.modes.lock().unwrap();
        match modes.len() {
            0 => Mode::Unknown,
            1 => modes[0],
            _ => modes.pop_front().unwrap_or(Mode::Unknown),
        }
    }
}

#[async_trait]
impl ModeSurface for FakeSurface {
    async fn find_mode_picker(&self) -> Result<Option<ElementHandle>> {
        let gate = self.picker_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            self.gate_waiters.fetch_add(1, Ordering::SeqCst);
            gate.notified().await;
        }
        self.find_picker_calls.fetch_add(1, Ordering::SeqCst);
        if self.picker_present.load(Ordering::SeqCst) {
            Ok(Some(ElementHandle::new(PICKER_TOKEN)))
        } else {
            Ok(None)
        }
    }

    async fn active_mode(&self) -> Result<Mode> {
        self.active_mode_calls.fetch_add(1, Ordering::SeqCst);
        self.active_mode_instants.lock().unwrap().push(Instant::now());
        Ok(self.next_mode())
    }

    async fn is_menu_expanded(&self, _picker: &ElementHandle) -> Result<bool> {
        Ok(self.menu_expanded.load(Ordering::SeqCst))
    }

    async fn find_option(&self, _option: ModeOption) -> Result<Option<ElementHandle>> {
        self.find_option_calls.fetch_add(1, Ordering::SeqCst);
        if self.option_present.load(Ordering::SeqCst) {
            Ok(Some(ElementHandle::new(OPTION_TOKEN)))
        } else {
            Ok(None)
        }
    }

    async fn is_option_checked(&self, _option: &ElementHandle) -> Result<bool> {
        Ok(self.option_checked.load(Ordering::SeqCst))
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        self.clicks.fetch_add(1, Ordering::SeqCst);
        if element.as_str() == OPTION_TOKEN {
            self.option_clicks.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn dismiss_menu(&self) -> Result<()> {
        self.dismissals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn find_prompt_textbox(&self) -> Result<Option<ElementHandle>> {
        if self.prompt_present.load(Ordering::SeqCst) {
            Ok(Some(ElementHandle::new(PROMPT_TOKEN)))
        } else {
            Ok(None)
        }
    }

    async fn focus(&self, _element: &ElementHandle) -> Result<bool> {
        self.focus_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.focus_confirms.load(Ordering::SeqCst))
    }

    async fn show_warning_banner(&self, text: &str) -> Result<()> {
        self.banner_shows.fetch_add(1, Ordering::SeqCst);
        *self.banner.lock().unwrap() = Some(text.to_string());
        Ok(())
    }

    async fn clear_warning_banner(&self) -> Result<()> {
        *self.banner.lock().unwrap() = None;
        Ok(())
    }
}

/// Collects every reported event for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LogEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap().clone()
    }

    /// `outcome` fields of info-level reports, in order.
    pub fn info_outcomes(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.level == LogLevel::Info)
            .filter_map(|e| {
                e.context?
                    .get("outcome")
                    .and_then(|v| v.as_str().map(str::to_string))
            })
            .collect()
    }

    /// `reason` fields of info-level reports, in order.
    pub fn info_reasons(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.level == LogLevel::Info)
            .filter_map(|e| {
                e.context?
                    .get("reason")
                    .and_then(|v| v.as_str().map(str::to_string))
            })
            .collect()
    }

    pub fn warn_messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.level == LogLevel::Warn)
            .map(|e| e.message)
            .collect()
    }

    pub fn warn_contexts(&self) -> Vec<serde_json::Value> {
        self.events()
            .into_iter()
            .filter(|e| e.level == LogLevel::Warn)
            .filter_map(|e| e.context)
            .collect()
    }
}

impl ReportSink for RecordingSink {
    fn report(&self, event: LogEvent) {
        self.events.lock().unwrap().push(event);
    }
}
