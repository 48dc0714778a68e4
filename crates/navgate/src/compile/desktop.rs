//! Desktop compiler: network request filters plus content script.

use glob::{MatchOptions, Pattern};
use serde::Serialize;
use url::Url;

use super::{Platform, PlatformCompiler, Prepared};
use crate::decision::{CompiledMatchers, ResourceType};
use crate::error::CompileError;
use crate::options::ScriptOptions;
use crate::policy::DestinationPolicy;

/// Resource types every filter applies to.
const FILTERED_TYPES: [ResourceType; 6] = [
    ResourceType::MainFrame,
    ResourceType::SubFrame,
    ResourceType::Script,
    ResourceType::Image,
    ResourceType::Media,
    ResourceType::XmlHttpRequest,
];

const WILDCARD: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A request filter for the browser's network hook.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequestFilter {
    /// Absolute URL wildcards
    pub urls: Vec<String>,
    /// Resource types the filter applies to
    pub types: Vec<ResourceType>,
    #[serde(skip)]
    patterns: Vec<Pattern>,
}

impl RequestFilter {
    /// Create a filter, compiling its wildcards once.
    ///
    /// A wildcard that cannot be compiled matches nothing.
    pub fn new(urls: Vec<String>, types: Vec<ResourceType>) -> Self {
        let patterns = urls.iter().filter_map(|url| compile_wildcard(url)).collect();
        Self {
            urls,
            types,
            patterns,
        }
    }

    /// Whether the filter covers this request. `*` matches any run of
    /// characters, `?` a single one; the whole URL must match.
    pub fn matches(&self, url: &str, resource_type: ResourceType) -> bool {
        self.types.contains(&resource_type)
            && self
                .patterns
                .iter()
                .any(|pattern| pattern.matches_with(url, WILDCARD))
    }
}

fn compile_wildcard(wildcard: &str) -> Option<Pattern> {
    // Brackets are literal in filter wildcards but classes in glob syntax.
    let mut escaped = String::with_capacity(wildcard.len());
    for c in wildcard.chars() {
        match c {
            '[' => escaped.push_str("[[]"),
            ']' => escaped.push_str("[]]"),
            c => escaped.push(c),
        }
    }
    Pattern::new(&escaped)
        .inspect_err(|e| tracing::warn!(wildcard, error = %e, "unusable request filter wildcard"))
        .ok()
}

/// Resolve a block string to an absolute URL wildcard against the start URL.
pub fn resolve_block_url(pattern: &str, start: &Url) -> String {
    if pattern.starts_with("http") || pattern.contains("://") {
        return pattern.to_string();
    }
    if pattern.starts_with("//") {
        return format!("{}:{pattern}", start.scheme());
    }
    let origin = start.origin().ascii_serialization();
    if pattern.starts_with('/') {
        format!("{origin}{pattern}")
    } else {
        format!("{origin}/{pattern}")
    }
}

/// Compiled rules for the desktop browser.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesktopArtifact {
    /// One filter per block string, base patterns first
    pub web_request_filters: Vec<RequestFilter>,
    /// Script injected into every page of the destination
    pub content_script: String,
    /// Matchers for the decision engine
    pub matchers: CompiledMatchers,
    /// The destination's start URL, verbatim
    pub start_url: String,
}

impl DesktopArtifact {
    /// Decide a request seen by the network hook.
    ///
    /// Frames are navigations inside the destination and are only denied when
    /// explicitly blocked; top-level policy is enforced separately by
    /// [`CompiledMatchers::is_navigation_allowed`]. Other resources are denied
    /// when a filter for their type covers the URL or a block matcher hits.
    pub fn is_request_allowed(&self, url: &str, resource_type: ResourceType) -> bool {
        if resource_type.is_frame() {
            return !self.matchers.is_explicitly_blocked(url);
        }
        if self
            .web_request_filters
            .iter()
            .any(|filter| filter.matches(url, resource_type))
        {
            return false;
        }
        self.matchers.is_resource_allowed(url)
    }
}

/// Compiler for the desktop browser.
#[derive(Clone, Debug, Default)]
pub struct DesktopCompiler {
    options: ScriptOptions,
}

impl DesktopCompiler {
    /// Create a compiler with the given script options.
    pub fn new(options: ScriptOptions) -> Self {
        Self { options }
    }
}

impl PlatformCompiler for DesktopCompiler {
    type Artifact = DesktopArtifact;

    fn platform(&self) -> Platform {
        Platform::Desktop
    }

    fn compile(
        &self,
        destination: &DestinationPolicy,
        filter_mode: Option<&str>,
    ) -> Result<DesktopArtifact, CompileError> {
        let prepared = Prepared::new(destination, filter_mode)?;
        let web_request_filters = destination
            .effective_block(filter_mode)
            .iter()
            .map(|pattern| {
                RequestFilter::new(
                    vec![resolve_block_url(pattern, &prepared.start)],
                    FILTERED_TYPES.to_vec(),
                )
            })
            .collect();

        Ok(DesktopArtifact {
            web_request_filters,
            content_script: prepared.script(destination, self.platform(), &self.options)?,
            matchers: prepared.matchers,
            start_url: destination.start.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::policy::FilterMode;

    fn destination() -> DestinationPolicy {
        DestinationPolicy::new(
            "https://video.example.com/feed/subscriptions",
            vec!["/feed/subscriptions".to_string(), "/watch*".to_string()],
            vec!["/shorts/*".to_string(), "/".to_string()],
        )
        .with_filter_mode(
            "safe",
            FilterMode {
                block_urls: vec!["*://*.doubleclick.net/*".to_string()],
                ..Default::default()
            },
        )
    }

    fn compiled() -> DesktopArtifact {
        DesktopCompiler::default()
            .compile(&destination(), Some("safe"))
            .unwrap()
    }

    #[test]
    fn test_block_urls_resolve_against_start_origin() {
        let start = Url::parse("https://video.example.com:8443/feed").unwrap();
        assert_eq!(
            resolve_block_url("/shorts/*", &start),
            "https://video.example.com:8443/shorts/*"
        );
        assert_eq!(
            resolve_block_url("shorts", &start),
            "https://video.example.com:8443/shorts"
        );
        assert_eq!(
            resolve_block_url("//cdn.example.com/*", &start),
            "https://cdn.example.com/*"
        );
        assert_eq!(
            resolve_block_url("https://ads.example.net/*", &start),
            "https://ads.example.net/*"
        );
        assert_eq!(
            resolve_block_url("*://*.doubleclick.net/*", &start),
            "*://*.doubleclick.net/*"
        );
    }

    #[test]
    fn test_one_filter_per_block_string() {
        let artifact = compiled();
        let value = serde_json::to_value(&artifact.web_request_filters).unwrap();
        let types = json!(["mainFrame", "subFrame", "script", "image", "media", "xmlhttprequest"]);
        assert_eq!(
            value,
            json!([
                { "urls": ["https://video.example.com/shorts/*"], "types": types },
                { "urls": ["https://video.example.com/"], "types": types },
                { "urls": ["*://*.doubleclick.net/*"], "types": types }
            ])
        );
    }

    fn wildcard_matches(wildcard: &str, url: &str) -> bool {
        RequestFilter::new(vec![wildcard.to_string()], vec![ResourceType::Image])
            .matches(url, ResourceType::Image)
    }

    #[test]
    fn test_filters_hold_compiled_wildcards() {
        let artifact = compiled();
        for filter in &artifact.web_request_filters {
            assert_eq!(filter.patterns.len(), filter.urls.len());
        }

        let filter = RequestFilter::new(
            vec!["https://a.example.com/*".to_string()],
            vec![ResourceType::Script],
        );
        assert!(filter.matches("https://a.example.com/app.js", ResourceType::Script));
        assert!(!filter.matches("https://a.example.com/app.js", ResourceType::Image));
    }

    #[test]
    fn test_wildcards() {
        assert!(wildcard_matches(
            "*://*.doubleclick.net/*",
            "https://ad.doubleclick.net/pixel?id=1"
        ));
        assert!(!wildcard_matches(
            "*://*.doubleclick.net/*",
            "https://doubleclick.net.example.com"
        ));
        assert!(wildcard_matches("https://a.example.com/p?", "https://a.example.com/p1"));
        assert!(wildcard_matches("https://a.example.com/[x]", "https://a.example.com/[x]"));
        assert!(!wildcard_matches("https://a.example.com/[x]", "https://a.example.com/x"));
    }

    #[test]
    fn test_request_decisions() {
        let artifact = compiled();

        assert!(!artifact.is_request_allowed(
            "https://ad.doubleclick.net/pixel.gif",
            ResourceType::Image
        ));
        assert!(!artifact.is_request_allowed(
            "https://video.example.com/shorts/clip.mp4",
            ResourceType::Media
        ));
        assert!(artifact.is_request_allowed(
            "https://static.example.net/player.js",
            ResourceType::Script
        ));
        // Fonts have no filter, but the block matchers still apply.
        assert!(!artifact.is_request_allowed(
            "https://video.example.com/shorts/font.woff2",
            ResourceType::Font
        ));
        assert!(artifact.is_request_allowed(
            "https://fonts.example.net/a.woff2",
            ResourceType::Font
        ));
    }

    #[test]
    fn test_frames_only_denied_when_explicitly_blocked() {
        let artifact = compiled();
        assert!(artifact.is_request_allowed(
            "https://elsewhere.example.org/embed",
            ResourceType::SubFrame
        ));
        assert!(!artifact.is_request_allowed(
            "https://video.example.com/shorts/abc",
            ResourceType::MainFrame
        ));
        assert!(artifact.is_request_allowed(
            "https://video.example.com/watch?v=1",
            ResourceType::MainFrame
        ));
    }

    #[test]
    fn test_content_script_shows_notice() {
        let artifact = compiled();
        assert!(artifact.content_script.contains(r#"interception: "notice","#));
        assert_eq!(artifact.start_url, "https://video.example.com/feed/subscriptions");
    }
}
