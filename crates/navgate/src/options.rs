//! Compiler options for the generated enforcement scripts.

use serde::{Deserialize, Serialize};

use crate::compile::Platform;

/// What the enforcement script does when a link to a disabled section is clicked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorInterception {
    /// Leave links alone; rely on the native rule list and the decision engine
    Disabled,
    /// Cancel the click and notify the host bridge
    Callback,
    /// Cancel the click, show a transient notice and notify the host bridge
    Notice,
}

impl AnchorInterception {
    /// Built-in behaviour per platform.
    ///
    /// Content-rule lists on iOS do not intercept clicks; Android reports to
    /// the host; desktop shows a notice in the page.
    pub fn default_for(platform: Platform) -> Self {
        match platform {
            Platform::Ios => AnchorInterception::Disabled,
            Platform::Android => AnchorInterception::Callback,
            Platform::Desktop => AnchorInterception::Notice,
        }
    }

    /// Wire name, as embedded in the script.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnchorInterception::Disabled => "disabled",
            AnchorInterception::Callback => "callback",
            AnchorInterception::Notice => "notice",
        }
    }
}

/// Options for one platform's enforcement script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScriptOptions {
    /// Anchor behaviour; `None` uses [`AnchorInterception::default_for`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_interception: Option<AnchorInterception>,
    /// Attribute set on hidden elements
    pub marker_attribute: String,
    /// Global object the host exposes to receive blocked-navigation events
    pub bridge_object: String,
    /// Prefix for console diagnostics
    pub log_prefix: String,
    /// Text of the on-screen notice
    pub notice_text: String,
    /// How long the notice stays visible, in milliseconds
    pub notice_duration_ms: u64,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            anchor_interception: None,
            marker_attribute: "data-navgate-hidden".to_string(),
            bridge_object: "NavGate".to_string(),
            log_prefix: "[navgate]".to_string(),
            notice_text: "This section is blocked".to_string(),
            notice_duration_ms: 3000,
        }
    }
}

impl ScriptOptions {
    /// The anchor behaviour in effect for a platform.
    pub fn interception_for(&self, platform: Platform) -> AnchorInterception {
        self.anchor_interception
            .unwrap_or_else(|| AnchorInterception::default_for(platform))
    }
}

/// Options for every platform compiler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Options for the iOS content-rule compiler
    pub ios: ScriptOptions,
    /// Options for the Android WebView compiler
    pub android: ScriptOptions,
    /// Options for the desktop compiler
    pub desktop: ScriptOptions,
}

impl CompilerOptions {
    /// Options for one platform.
    pub fn for_platform(&self, platform: Platform) -> &ScriptOptions {
        match platform {
            Platform::Ios => &self.ios,
            Platform::Android => &self.android,
            Platform::Desktop => &self.desktop,
        }
    }

    /// Load options from JSON text. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
