//! Generated DOM enforcement script.
//!
//! All three platforms inject the same script shape. Once running in a page it
//! hides every element matching the configured selectors (tagging them with a
//! marker attribute), re-applies hiding on every DOM mutation even to elements
//! already tagged, and, unless disabled for the platform, cancels primary-button
//! clicks on links into disabled sections. Raw policy script is appended
//! verbatim at the end of `init()`; the compiler never looks inside it.

use serde::Serialize;

use crate::options::{AnchorInterception, ScriptOptions};
use crate::policy::{DomRules, FilterMode};

/// A normalized `disableAnchorsTo` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnchorRule {
    /// The entry as written in the policy; reported to the host
    pub entry: String,
    /// Href or path prefix to match
    pub prefix: String,
    /// Whether the href must equal `prefix` exactly
    pub exact: bool,
}

impl AnchorRule {
    /// Normalize one entry. Blank entries and a lone `*` yield `None`.
    ///
    /// `/` and `#` match exactly, since as prefixes they would cover every
    /// link on the page. A trailing `*` is dropped.
    pub fn parse(entry: &str) -> Option<Self> {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            return None;
        }

        let (prefix, exact) = if trimmed == "/" || trimmed == "#" {
            (trimmed, true)
        } else if let Some(stem) = trimmed.strip_suffix('*') {
            (stem.trim(), false)
        } else {
            (trimmed, false)
        };

        if prefix.is_empty() {
            return None;
        }
        Some(Self {
            entry: entry.to_string(),
            prefix: prefix.to_string(),
            exact,
        })
    }
}

/// Inputs for one enforcement script.
#[derive(Debug)]
pub struct ScriptSpec<'a> {
    /// The destination's DOM rules, if any
    pub dom: Option<&'a DomRules>,
    /// The active filter mode, if any
    pub mode: Option<&'a FilterMode>,
    /// Platform script options
    pub options: &'a ScriptOptions,
    /// Resolved anchor behaviour
    pub interception: AnchorInterception,
}

impl ScriptSpec<'_> {
    /// Selectors to hide: `dom.hide` then the mode's extras, deduplicated.
    pub fn hide_selectors(&self) -> Vec<String> {
        let mut selectors: Vec<String> = Vec::new();
        let base = self.dom.map(|dom| dom.hide.as_slice()).unwrap_or_default();
        let extra = self
            .mode
            .map(|mode| mode.hide_selectors.as_slice())
            .unwrap_or_default();
        for selector in base.iter().chain(extra) {
            if !selectors.contains(selector) {
                selectors.push(selector.clone());
            }
        }
        selectors
    }

    /// Normalized anchor rules; empty when interception is disabled.
    pub fn anchor_rules(&self) -> Vec<AnchorRule> {
        if self.interception == AnchorInterception::Disabled {
            return Vec::new();
        }
        self.dom
            .map(|dom| {
                dom.disable_anchors_to
                    .iter()
                    .filter_map(|entry| AnchorRule::parse(entry))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `dom.script` followed by the mode's scriptlets, verbatim.
    pub fn custom_script(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(script) = self.dom.and_then(|dom| dom.script.as_deref()) {
            parts.push(script);
        }
        if let Some(mode) = self.mode {
            parts.extend(mode.scriptlets.iter().map(String::as_str));
        }
        parts.join("\n")
    }

    /// Render the script.
    pub fn render(&self) -> Result<String, serde_json::Error> {
        let options = self.options;
        let mut script = format!(
            r#"
(function() {{
  'use strict';

  if (window.__navgateInstalled) {{
    return;
  }}
  window.__navgateInstalled = true;

  const NG = {{
    hideSelectors: {hide},
    disabledAnchors: {anchors},
    marker: {marker},
    interception: {interception},
    bridge: {bridge},
    logPrefix: {log_prefix},
    noticeText: {notice_text},
    noticeDurationMs: {notice_ms},
    clickHandlerInstalled: false,

    init() {{
      this.hideElements();
      this.interceptAnchors();
      this.observeMutations();
"#,
            hide = serde_json::to_string(&self.hide_selectors())?,
            anchors = serde_json::to_string(&self.anchor_rules())?,
            marker = serde_json::to_string(&options.marker_attribute)?,
            interception = serde_json::to_string(self.interception.as_str())?,
            bridge = serde_json::to_string(&options.bridge_object)?,
            log_prefix = serde_json::to_string(&options.log_prefix)?,
            notice_text = serde_json::to_string(&options.notice_text)?,
            notice_ms = options.notice_duration_ms,
        );

        let custom = self.custom_script();
        if !custom.is_empty() {
            script.push_str(&custom);
            script.push('\n');
        }
        script.push_str(SCRIPT_BODY);
        Ok(script)
    }
}

/// Everything after the custom-script insertion point.
const SCRIPT_BODY: &str = r#"    },

    hideElements() {
      this.hideSelectors.forEach(selector => {
        try {
          document.querySelectorAll(selector).forEach(el => {
            el.style.setProperty('display', 'none', 'important');
            el.setAttribute(this.marker, 'true');
          });
        } catch (e) {
          console.warn(this.logPrefix + ' Failed to hide:', selector, e);
        }
      });
    },

    blockedEntry(anchor) {
      const href = anchor.getAttribute('href');
      if (href === null) {
        return null;
      }
      let path = href;
      try {
        const url = new URL(href, window.location.href);
        if (url.origin === window.location.origin) {
          path = url.pathname + url.search;
        }
      } catch (e) {
        // keep the raw href
      }
      for (const rule of this.disabledAnchors) {
        const hit = rule.exact
          ? href === rule.prefix || path === rule.prefix
          : href.startsWith(rule.prefix) || path.startsWith(rule.prefix);
        if (hit) {
          return rule.entry;
        }
      }
      return null;
    },

    interceptAnchors() {
      if (this.clickHandlerInstalled || this.interception === 'disabled' || this.disabledAnchors.length === 0) {
        return;
      }
      this.clickHandlerInstalled = true;
      document.addEventListener('click', e => {
        if (e.button !== 0 || e.defaultPrevented) {
          return;
        }
        const anchor = e.target instanceof Element ? e.target.closest('a[href]') : null;
        if (!anchor) {
          return;
        }
        try {
          const entry = this.blockedEntry(anchor);
          if (entry === null) {
            return;
          }
          e.preventDefault();
          e.stopPropagation();
          this.onBlocked(entry);
        } catch (err) {
          console.warn(this.logPrefix + ' Failed to intercept link:', err);
        }
      }, true);
    },

    onBlocked(entry) {
      const bridge = window[this.bridge];
      if (bridge && typeof bridge.onBlockedNavigation === 'function') {
        bridge.onBlockedNavigation(String(entry));
      }
      if (this.interception === 'notice') {
        this.showNotice();
      }
    },

    showNotice() {
      if (!document.body) {
        return;
      }
      const notice = document.createElement('div');
      notice.textContent = this.noticeText;
      notice.style.cssText = [
        'position: fixed',
        'top: 20px',
        'right: 20px',
        'background: #1a1a1a',
        'color: white',
        'padding: 12px 20px',
        'border-radius: 8px',
        'z-index: 999999',
        "font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif",
        'font-size: 14px',
        'box-shadow: 0 4px 12px rgba(0,0,0,0.3)',
      ].join('; ');
      document.body.appendChild(notice);
      setTimeout(() => notice.remove(), this.noticeDurationMs);
    },

    observeMutations() {
      const root = document.documentElement || document.body;
      if (!root) {
        return;
      }
      const observer = new MutationObserver(() => this.hideElements());
      observer.observe(root, { childList: true, subtree: true });
    }
  };

  if (document.readyState === 'loading') {
    document.addEventListener('DOMContentLoaded', () => NG.init());
  } else {
    NG.init();
  }
})();
"#;
