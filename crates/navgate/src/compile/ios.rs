//! iOS compiler: content-rule list plus user script.

use serde::Serialize;

use super::{Platform, PlatformCompiler, Prepared};
use crate::decision::CompiledMatchers;
use crate::error::CompileError;
use crate::options::ScriptOptions;
use crate::policy::DestinationPolicy;

/// Characters escaped in a content-rule `url-filter`.
const URL_FILTER_META: &[char] = &[
    '.', '*', '+', '?', '^', '$', '{', '}', '(', ')', '|', '[', ']', '\\',
];

/// Compiled rules for an iOS web view.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRuleArtifact {
    /// Content-rule list, as JSON text
    pub content_rules: String,
    /// Script injected as a user script
    pub user_script: String,
    /// Matchers for the decision engine
    pub matchers: CompiledMatchers,
    /// The destination's start URL, verbatim
    pub start_url: String,
}

/// One content-rule list entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContentRule {
    /// When the rule fires
    pub trigger: Trigger,
    /// What it does
    pub action: Action,
}

/// Content-rule trigger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Trigger {
    /// Escaped URL filter
    #[serde(rename = "url-filter")]
    pub url_filter: String,
    /// Hosts the rule is scoped to
    #[serde(rename = "if-domain", skip_serializing_if = "Option::is_none")]
    pub if_domain: Option<Vec<String>>,
}

/// Content-rule action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Action {
    /// Action type
    #[serde(rename = "type")]
    pub kind: ActionKind,
}

/// Content-rule action types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Block the load
    Block,
}

impl ContentRule {
    fn block(pattern: &str, if_domain: Option<Vec<String>>) -> Self {
        Self {
            trigger: Trigger {
                url_filter: url_filter(pattern),
                if_domain,
            },
            action: Action {
                kind: ActionKind::Block,
            },
        }
    }
}

/// Escape a policy pattern for the content-rule filter grammar.
///
/// Works from the pattern as written, not the translated expression.
pub fn url_filter(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    for c in pattern.chars() {
        if URL_FILTER_META.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Compiler for iOS web views.
#[derive(Clone, Debug, Default)]
pub struct IosCompiler {
    options: ScriptOptions,
}

impl IosCompiler {
    /// Create a compiler with the given script options.
    pub fn new(options: ScriptOptions) -> Self {
        Self { options }
    }

    /// Build the content-rule list: base block patterns scoped to the start
    /// host, then the filter mode's URLs unscoped.
    pub fn content_rules(
        &self,
        destination: &DestinationPolicy,
        filter_mode: Option<&str>,
        start_host: Option<&str>,
    ) -> Vec<ContentRule> {
        let scope = start_host.map(|host| vec![host.to_string()]);
        let mut rules: Vec<ContentRule> = destination
            .block
            .iter()
            .map(|pattern| ContentRule::block(pattern, scope.clone()))
            .collect();

        if let Some(mode) = filter_mode.and_then(|name| destination.filter_mode(name)) {
            rules.extend(
                mode.block_urls
                    .iter()
                    .map(|pattern| ContentRule::block(pattern, None)),
            );
        }
        rules
    }
}

impl PlatformCompiler for IosCompiler {
    type Artifact = ContentRuleArtifact;

    fn platform(&self) -> Platform {
        Platform::Ios
    }

    fn compile(
        &self,
        destination: &DestinationPolicy,
        filter_mode: Option<&str>,
    ) -> Result<ContentRuleArtifact, CompileError> {
        let prepared = Prepared::new(destination, filter_mode)?;
        let rules = self.content_rules(destination, filter_mode, prepared.start.host_str());

        Ok(ContentRuleArtifact {
            content_rules: serde_json::to_string(&rules)?,
            user_script: prepared.script(destination, self.platform(), &self.options)?,
            matchers: prepared.matchers,
            start_url: destination.start.clone(),
        })
    }
}
