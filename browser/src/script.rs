//! JavaScript injected into the app page. The engine never touches markup
//! directly; it calls into the `window.__modepin` helper, which owns the
//! selector strategies and a small role-to-element registry.

/// Name of the CDP binding the page uses to push change notifications back
/// to the engine.
pub const BINDING_NAME: &str = "__modepin_emit";

/// The page-side helper. Idempotent: re-evaluating on an already-prepared
/// page is a no-op, so it is safe to both evaluate immediately and register
/// for every future document.
pub const HELPER_JS: &str = r##"(() => {
  if (window.__modepin) {
    return;
  }

  const MODE_PICKER_SELECTORS = [
    '[data-test-id="bard-mode-menu-button"]',
    'button[data-test-id*="mode-menu"]',
    'button[aria-label*="mode" i]',
    'bard-mode-switcher button',
    'button.input-area-switch'
  ];

  const PRO_OPTION_SELECTORS = [
    '[data-test-id="bard-mode-option-pro"]',
    '[role="menuitemradio"][data-test-id*="mode-option-pro"]',
    '[role="menuitemradio"][data-test-id*="pro"]'
  ];

  const FAST_OPTION_SELECTORS = [
    '[data-test-id="bard-mode-option-fast"]',
    '[role="menuitemradio"][data-test-id*="mode-option-fast"]',
    '[role="menuitemradio"][data-test-id*="fast"]'
  ];

  const PROMPT_TEXTBOX_SELECTORS = [
    'rich-textarea .ql-editor',
    'div[contenteditable="true"][role="textbox"]',
    'textarea[aria-label*="prompt" i]'
  ];

  const WARNING_ID = "modepin-warning";

  const els = new Map();

  function normalizeText(value) {
    return String(value || "").replace(/\s+/g, " ").trim();
  }

  function isVisible(element) {
    if (!element) {
      return false;
    }
    const style = window.getComputedStyle(element);
    return style.display !== "none" && style.visibility !== "hidden";
  }

  function firstVisible(selectorList, root) {
    const scope = root || document;
    for (const selector of selectorList) {
      const candidates = Array.from(scope.querySelectorAll(selector));
      const visible = candidates.find((candidate) => isVisible(candidate));
      if (visible) {
        return visible;
      }
    }
    return null;
  }

  function modePicker() {
    const bySelector = firstVisible(MODE_PICKER_SELECTORS);
    if (bySelector) {
      return bySelector;
    }

    const allButtons = Array.from(document.querySelectorAll('button,[role="button"]'));
    return allButtons.find((button) => {
      const label = normalizeText(button.getAttribute("aria-label"));
      const text = normalizeText(button.textContent);
      return /open mode picker|mode picker/i.test(label) || /\b(fast|pro|thinking)\b/i.test(text);
    }) || null;
  }

  function modeLabel() {
    const button = els.get("picker") || modePicker();
    if (!button) {
      return "";
    }

    const candidates = [
      button.querySelector('[data-test-id="logo-pill-label-container"] span'),
      button.querySelector('.input-area-switch-label span'),
      button.querySelector('span:not(.mat-mdc-button-touch-target)')
    ].filter(Boolean);

    for (const candidate of candidates) {
      const text = normalizeText(candidate.textContent);
      if (/^(fast|pro|thinking)$/i.test(text)) {
        return text;
      }
    }

    const fallback = normalizeText(button.textContent);
    const match = fallback.match(/\b(Fast|Pro|Thinking)\b/i);
    return match ? match[1] : "";
  }

  function menuRoot() {
    const button = els.get("picker") || modePicker();
    if (button) {
      const controlsId = button.getAttribute("aria-controls");
      if (controlsId) {
        const panel = document.getElementById(controlsId);
        if (panel) {
          return panel;
        }
      }
    }

    const openMenus = Array.from(
      document.querySelectorAll('[role="menu"], .mat-mdc-menu-panel, .cdk-overlay-pane')
    ).filter((menu) => isVisible(menu) && /fast|pro/i.test(normalizeText(menu.textContent)));

    return openMenus[0] || document;
  }

  function menuOption(optionSelectors, fallbackTextMatcher) {
    const root = menuRoot();
    const direct = firstVisible(optionSelectors, root);
    if (direct) {
      return direct;
    }

    const menuItems = Array.from(
      root.querySelectorAll('[role="menuitemradio"],button,[role="option"]')
    ).filter(isVisible);

    return menuItems.find((item) => fallbackTextMatcher.test(normalizeText(item.textContent))) || null;
  }

  function locate(role) {
    if (role === "picker") {
      return modePicker();
    }
    if (role === "option-pro") {
      return menuOption(PRO_OPTION_SELECTORS, /\bpro\b/i);
    }
    if (role === "option-fast") {
      return menuOption(FAST_OPTION_SELECTORS, /\bfast\b/i);
    }
    if (role === "prompt") {
      return firstVisible(PROMPT_TEXTBOX_SELECTORS);
    }
    return null;
  }

  let observing = false;

  window.__modepin = {
    find(role) {
      const el = locate(role);
      if (el) {
        els.set(role, el);
        return true;
      }
      els.delete(role);
      return false;
    },

    activeModeLabel() {
      return modeLabel();
    },

    isMenuExpanded() {
      const button = els.get("picker") || modePicker();
      return !!button && button.getAttribute("aria-expanded") === "true";
    },

    isChecked(role) {
      const el = els.get(role);
      return !!el && el.getAttribute("aria-checked") === "true";
    },

    click(role) {
      const el = els.get(role) || locate(role);
      if (!el) {
        return false;
      }
      el.click();
      return true;
    },

    clickBody() {
      document.body.click();
      return true;
    },

    focus(role) {
      const el = els.get(role) || locate(role);
      if (!el) {
        return false;
      }
      el.click();
      el.focus({ preventScroll: true });
      return el.matches(":focus") || document.activeElement === el;
    },

    showWarning(message) {
      this.clearWarning();
      const warning = document.createElement("div");
      warning.id = WARNING_ID;
      warning.textContent = message;
      warning.style.position = "fixed";
      warning.style.top = "12px";
      warning.style.right = "12px";
      warning.style.zIndex = "2147483647";
      warning.style.background = "rgba(165, 18, 18, 0.95)";
      warning.style.color = "#fff";
      warning.style.padding = "10px 12px";
      warning.style.borderRadius = "8px";
      warning.style.fontSize = "12px";
      warning.style.fontFamily = "system-ui, sans-serif";
      warning.style.maxWidth = "320px";
      warning.style.boxShadow = "0 6px 14px rgba(0, 0, 0, 0.2)";
      document.body.appendChild(warning);
      return true;
    },

    clearWarning() {
      const warning = document.getElementById(WARNING_ID);
      if (warning) {
        warning.remove();
      }
      return true;
    },

    installObserver(bindingName) {
      if (observing) {
        return true;
      }
      observing = true;

      const emit = (kind) => {
        const fn = window[bindingName];
        if (typeof fn === "function") {
          try {
            fn(JSON.stringify({ kind }));
          } catch (e) {
            // The binding goes away when the engine detaches.
          }
        }
      };

      const observer = new MutationObserver(() => emit("mutation"));
      observer.observe(document.documentElement, {
        subtree: true,
        childList: true,
        characterData: true,
        attributes: true,
        attributeFilter: ["aria-expanded", "aria-checked", "class", "data-test-id"]
      });

      document.addEventListener(
        "click",
        (event) => {
          const target = event.target instanceof Element
            ? event.target.closest("button,[role='menuitemradio']")
            : null;
          if (!target) {
            return;
          }
          const testId = target.getAttribute("data-test-id") || "";
          const text = normalizeText(target.textContent);
          if (/mode-option-fast/i.test(testId) || /^fast\b/i.test(text)) {
            emit("fast-click");
          }
        },
        true
      );

      return true;
    }
  };
})();
"##;
