//! Authorization decisions over compiled matchers.
//!
//! Top-level navigation is fail-closed: a URL that no allow pattern matches is
//! denied even when nothing blocks it. Sub-resources are the opposite and only
//! explicit blocks apply, otherwise pages would not render.
//!
//! Every query here is total. A URL that does not parse is still evaluated,
//! using the raw string as its only target.

use serde::de::IntoDeserializer;
use serde::{Deserialize, Serialize};

use crate::pattern::{Matcher, compile_patterns};
use crate::targets::build_targets;

/// The verdict for a top-level navigation, with the rule responsible.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "camelCase")]
pub enum Decision {
    /// An allow pattern matched; allow wins over block
    Allowed {
        /// The allow pattern that matched
        pattern: String,
    },
    /// A block pattern matched and no allow pattern did
    Blocked {
        /// The block pattern that matched
        pattern: String,
    },
    /// No pattern matched either way; denied
    Unmatched,
}

impl Decision {
    /// Returns true only for [`Decision::Allowed`].
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }

    /// The pattern that decided the verdict, if any.
    pub fn pattern(&self) -> Option<&str> {
        match self {
            Decision::Allowed { pattern } | Decision::Blocked { pattern } => Some(pattern),
            Decision::Unmatched => None,
        }
    }
}

fn first_hit<'a>(targets: &[String], matchers: &'a [Matcher]) -> Option<&'a Matcher> {
    matchers
        .iter()
        .find(|matcher| targets.iter().any(|target| matcher.matches(target)))
}

/// Evaluate a navigation and report which rule decided it.
pub fn evaluate_navigation(url: &str, allow: &[Matcher], block: &[Matcher]) -> Decision {
    let targets = build_targets(url);

    if let Some(hit) = first_hit(&targets, allow) {
        return Decision::Allowed {
            pattern: hit.pattern().to_string(),
        };
    }
    if let Some(hit) = first_hit(&targets, block) {
        return Decision::Blocked {
            pattern: hit.pattern().to_string(),
        };
    }
    Decision::Unmatched
}

/// Whether a top-level navigation may proceed. Unmatched URLs are denied.
pub fn is_navigation_allowed(url: &str, allow: &[Matcher], block: &[Matcher]) -> bool {
    evaluate_navigation(url, allow, block).is_allowed()
}

/// Whether a sub-resource may load. Only explicit blocks deny.
pub fn is_resource_allowed(url: &str, block: &[Matcher]) -> bool {
    !is_explicitly_blocked(url, block)
}

/// Whether any block pattern matches the URL, regardless of allow rules.
pub fn is_explicitly_blocked(url: &str, block: &[Matcher]) -> bool {
    first_hit(&build_targets(url), block).is_some()
}

/// Where to send a denied navigation. Always the destination's start URL.
pub fn nearest_allowed_route(_url: &str, _allow: &[Matcher], start_url: &str) -> String {
    start_url.to_string()
}

/// Compiled allow and block matchers for one destination.
///
/// A pure function of the destination's patterns and the active filter mode,
/// so it can be cached for as long as the policy it came from.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CompiledMatchers {
    /// Allow matchers, in policy order
    pub allow: Vec<Matcher>,
    /// Block matchers, in policy order, filter-mode extras last
    pub block: Vec<Matcher>,
}

impl CompiledMatchers {
    /// Compile both pattern lists.
    pub fn compile<A: AsRef<str>, B: AsRef<str>>(allow: &[A], block: &[B]) -> Self {
        Self {
            allow: compile_patterns(allow),
            block: compile_patterns(block),
        }
    }

    /// See [`evaluate_navigation`].
    pub fn evaluate_navigation(&self, url: &str) -> Decision {
        evaluate_navigation(url, &self.allow, &self.block)
    }

    /// See [`is_navigation_allowed`].
    pub fn is_navigation_allowed(&self, url: &str) -> bool {
        is_navigation_allowed(url, &self.allow, &self.block)
    }

    /// See [`is_resource_allowed`].
    pub fn is_resource_allowed(&self, url: &str) -> bool {
        is_resource_allowed(url, &self.block)
    }

    /// See [`is_explicitly_blocked`].
    pub fn is_explicitly_blocked(&self, url: &str) -> bool {
        is_explicitly_blocked(url, &self.block)
    }
}

/// Resource types reported by the desktop browser's request hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceType {
    /// Top-level document
    MainFrame,
    /// Embedded document
    SubFrame,
    /// CSS
    Stylesheet,
    /// JavaScript
    Script,
    /// Images
    Image,
    /// Web fonts
    Font,
    /// Plugin content
    Object,
    /// XHR and fetch
    #[serde(rename = "xmlhttprequest")]
    XmlHttpRequest,
    /// Beacons
    Ping,
    /// CSP violation reports
    CspReport,
    /// Audio and video
    Media,
    /// WebSocket upgrades
    WebSocket,
    /// Anything else
    Other,
}

impl ResourceType {
    /// Frames are navigations rather than sub-resources.
    pub fn is_frame(&self) -> bool {
        matches!(self, ResourceType::MainFrame | ResourceType::SubFrame)
    }
}

impl std::str::FromStr for ResourceType {
    type Err = serde::de::value::Error;

    /// Parse a wire name such as `xmlhttprequest` or `mainFrame`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::deserialize(s.into_deserializer())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn example_matchers() -> CompiledMatchers {
        CompiledMatchers::compile(
            &[
                "*://www.example.com/direct/*",
                "*://example.com/direct/*",
                "/direct/.*",
                "/api/.*",
            ],
            &["^https?://(?:www\\.)?example\\.com/?$", "/explore", "/reels/.*"],
        )
    }

    #[test]
    fn test_allow_patterns_allow() {
        let m = example_matchers();
        assert!(m.is_navigation_allowed("https://www.example.com/direct/inbox/"));
    }

    #[test]
    fn test_path_block_pattern_blocks() {
        let m = example_matchers();
        assert!(!m.is_navigation_allowed("https://www.example.com/explore/"));
        assert_eq!(
            m.evaluate_navigation("https://www.example.com/explore/"),
            Decision::Blocked {
                pattern: "/explore".to_string()
            }
        );
    }

    #[test]
    fn test_regex_block_patterns_block() {
        let m = example_matchers();
        assert!(!m.is_navigation_allowed("https://www.example.com/reels/"));
        assert!(!m.is_navigation_allowed("https://www.example.com/"));
        assert!(!m.is_navigation_allowed("https://example.com"));
    }

    #[test]
    fn test_allow_takes_precedence_over_block() {
        let m = CompiledMatchers::compile(&["/api/.*"], &["/api/*"]);
        let decision = m.evaluate_navigation("https://www.example.com/api/");
        assert!(decision.is_allowed());
        assert_eq!(decision.pattern(), Some("/api/.*"));
        assert!(m.is_explicitly_blocked("https://www.example.com/api/"));
    }

    #[test]
    fn test_unmatched_navigation_is_denied() {
        let m = example_matchers();
        let decision = m.evaluate_navigation("https://example.com/unknown/page/");
        assert_eq!(decision, Decision::Unmatched);
        assert!(!decision.is_allowed());
        assert!(decision.pattern().is_none());
    }

    #[test]
    fn test_empty_rules_deny_navigation_but_allow_resources() {
        let m = CompiledMatchers::default();
        assert!(!m.is_navigation_allowed("https://example.com/"));
        assert!(m.is_resource_allowed("https://cdn.example.com/app.js"));
    }

    #[test]
    fn test_resources_default_allow() {
        let m = example_matchers();
        assert!(m.is_resource_allowed("https://static.cdn.example.net/some/script.js"));
        assert!(!m.is_resource_allowed("https://www.example.com/reels/awesome/content.js"));
    }

    #[test]
    fn test_explicitly_blocked_ignores_allow() {
        let m = example_matchers();
        assert!(m.is_explicitly_blocked("https://www.example.com/explore/"));
        assert!(!m.is_explicitly_blocked("https://www.example.com/direct/inbox/"));
    }

    #[test]
    fn test_unparseable_url_uses_raw_string() {
        let m = example_matchers();
        assert!(m.is_navigation_allowed("/direct/t/123"));
        assert!(!m.is_navigation_allowed("::not a url::"));
        assert!(m.is_resource_allowed("::not a url::"));
    }

    #[test]
    fn test_nearest_allowed_route_is_start() {
        let m = example_matchers();
        assert_eq!(
            nearest_allowed_route(
                "https://www.example.com/explore/",
                &m.allow,
                "https://www.example.com/direct/inbox/"
            ),
            "https://www.example.com/direct/inbox/"
        );
    }

    #[test]
    fn test_resource_type_wire_names() {
        assert_eq!(
            "xmlhttprequest".parse::<ResourceType>().unwrap(),
            ResourceType::XmlHttpRequest
        );
        assert_eq!("mainFrame".parse::<ResourceType>().unwrap(), ResourceType::MainFrame);
        let err = "iframe".parse::<ResourceType>().unwrap_err();
        assert!(err.to_string().contains("unknown variant `iframe`"));
        assert!(ResourceType::SubFrame.is_frame());
        assert!(!ResourceType::Image.is_frame());
    }
}
