use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::input::DispatchKeyEventParams;
use chromiumoxide::cdp::browser_protocol::input::DispatchKeyEventType;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::js_protocol::runtime::AddBindingParams;
use chromiumoxide::cdp::js_protocol::runtime::EventBindingCalled;
use futures::StreamExt;
use modepin_core::ElementHandle;
use modepin_core::ModeSurface;
use modepin_core::SurfaceError;
use modepin_core::watcher::WatcherHandle;
use modepin_protocol::Mode;
use modepin_protocol::ModeOption;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::BrowserError;
use crate::script::BINDING_NAME;
use crate::script::HELPER_JS;

/// What the page-side observer pushes through the CDP binding.
#[derive(Deserialize)]
struct PageSignal {
    kind: String,
}

/// [`ModeSurface`] backed by a live CDP page. All DOM work is delegated to
/// the injected `window.__modepin` helper; this side only evaluates calls
/// into it and dispatches raw key events.
pub struct CdpSurface {
    page: Page,
}

impl CdpSurface {
    /// Prepare the page and wrap it. The helper is evaluated immediately and
    /// registered for every future document, so it survives SPA navigations
    /// and full reloads alike.
    pub async fn attach(page: Page) -> crate::Result<Self> {
        page.evaluate(HELPER_JS).await?;
        let params = AddScriptToEvaluateOnNewDocumentParams::builder()
            .source(HELPER_JS)
            .build()
            .map_err(BrowserError::CdpError)?;
        page.execute(params).await?;
        Ok(Self { page })
    }

    /// Install the page-side observer and pump its signals into the watcher.
    ///
    /// The binding outlives navigations; the observer does not, so its
    /// installation is also registered as a new-document script.
    pub async fn spawn_feed(
        &self,
        watcher: WatcherHandle,
    ) -> crate::Result<tokio::task::JoinHandle<()>> {
        let binding = AddBindingParams::builder()
            .name(BINDING_NAME)
            .build()
            .map_err(BrowserError::CdpError)?;
        self.page.execute(binding).await?;

        let mut events = self.page.event_listener::<EventBindingCalled>().await?;

        let install = format!("window.__modepin.installObserver({});", js_string(BINDING_NAME));
        let on_new_document = AddScriptToEvaluateOnNewDocumentParams::builder()
            .source(format!("{HELPER_JS}\n{install}"))
            .build()
            .map_err(BrowserError::CdpError)?;
        self.page.execute(on_new_document).await?;
        self.page.evaluate(install).await?;

        let handle = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.name != BINDING_NAME {
                    continue;
                }
                match serde_json::from_str::<PageSignal>(&event.payload) {
                    Ok(signal) if signal.kind == "mutation" => watcher.mutation(),
                    Ok(signal) if signal.kind == "fast-click" => watcher.fast_click(),
                    Ok(signal) => debug!("unknown page signal kind: {}", signal.kind),
                    Err(e) => warn!("malformed page signal payload: {e}"),
                }
            }
            debug!("page signal feed closed");
        });
        Ok(handle)
    }

    async fn eval(&self, expr: String) -> Result<Value, SurfaceError> {
        let result = self.page.evaluate(expr).await.map_err(map_cdp)?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn eval_bool(&self, expr: String) -> Result<bool, SurfaceError> {
        Ok(self.eval(expr).await?.as_bool().unwrap_or(false))
    }

    async fn helper_bool(&self, call: &str) -> Result<bool, SurfaceError> {
        self.eval_bool(format!("window.__modepin && window.__modepin.{call}"))
            .await
    }

    async fn find_role(&self, role: &str) -> Result<Option<ElementHandle>, SurfaceError> {
        let found = self.helper_bool(&format!("find({})", js_string(role))).await?;
        Ok(found.then(|| ElementHandle::new(role)))
    }

    async fn press_escape(&self) -> Result<(), SurfaceError> {
        for event_type in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
            let params = DispatchKeyEventParams::builder()
                .r#type(event_type)
                .key("Escape")
                .build()
                .map_err(SurfaceError::Input)?;
            self.page.execute(params).await.map_err(map_cdp)?;
        }
        Ok(())
    }
}

#[async_trait]
impl ModeSurface for CdpSurface {
    async fn find_mode_picker(&self) -> Result<Option<ElementHandle>, SurfaceError> {
        self.find_role("picker").await
    }

    async fn active_mode(&self) -> Result<Mode, SurfaceError> {
        let label = self
            .eval("window.__modepin ? window.__modepin.activeModeLabel() : \"\"".to_string())
            .await?;
        Ok(Mode::from_label(label.as_str().unwrap_or("")))
    }

    async fn is_menu_expanded(&self, _picker: &ElementHandle) -> Result<bool, SurfaceError> {
        self.helper_bool("isMenuExpanded()").await
    }

    async fn find_option(&self, option: ModeOption) -> Result<Option<ElementHandle>, SurfaceError> {
        self.find_role(option_role(option)).await
    }

    async fn is_option_checked(&self, option: &ElementHandle) -> Result<bool, SurfaceError> {
        self.helper_bool(&format!("isChecked({})", js_string(option.as_str())))
            .await
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), SurfaceError> {
        let clicked = self
            .helper_bool(&format!("click({})", js_string(element.as_str())))
            .await?;
        if clicked {
            Ok(())
        } else {
            Err(SurfaceError::Input(format!(
                "element vanished before click: {}",
                element.as_str()
            )))
        }
    }

    async fn dismiss_menu(&self) -> Result<(), SurfaceError> {
        self.helper_bool("clickBody()").await?;
        self.press_escape().await
    }

    async fn find_prompt_textbox(&self) -> Result<Option<ElementHandle>, SurfaceError> {
        self.find_role("prompt").await
    }

    async fn focus(&self, element: &ElementHandle) -> Result<bool, SurfaceError> {
        self.helper_bool(&format!("focus({})", js_string(element.as_str())))
            .await
    }

    async fn show_warning_banner(&self, text: &str) -> Result<(), SurfaceError> {
        self.helper_bool(&format!("showWarning({})", js_string(text)))
            .await?;
        Ok(())
    }

    async fn clear_warning_banner(&self) -> Result<(), SurfaceError> {
        self.helper_bool("clearWarning()").await?;
        Ok(())
    }
}

fn option_role(option: ModeOption) -> &'static str {
    match option {
        ModeOption::Pro => "option-pro",
        ModeOption::Fast => "option-fast",
    }
}

fn map_cdp(error: chromiumoxide::error::CdpError) -> SurfaceError {
    let text = error.to_string();
    if text.contains("detached") || text.contains("closed") {
        SurfaceError::Detached(text)
    } else {
        SurfaceError::Script(text)
    }
}

/// Encode a Rust string as a JavaScript string literal.
fn js_string(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn js_string_escapes_quotes_and_newlines() {
        assert_eq!(js_string("plain"), "\"plain\"");
        assert_eq!(js_string("a \"b\"\nc"), "\"a \\\"b\\\"\\nc\"");
    }

    #[test]
    fn option_roles_match_the_helper_registry() {
        assert_eq!(option_role(ModeOption::Pro), "option-pro");
        assert_eq!(option_role(ModeOption::Fast), "option-fast");
    }
}
