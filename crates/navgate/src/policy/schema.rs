//! Typed policy document.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CompileError;

/// Root policy document.
///
/// Immutable once parsed; a refresh replaces the whole value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Opaque version string, used for cache invalidation and display
    pub version: String,
    /// Named filter mode applied by default to destinations that declare it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_mode_default: Option<FilterModeLevel>,
    /// Rules per destination, in document order
    pub destinations: IndexMap<String, DestinationPolicy>,
}

impl Policy {
    /// The policy version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Identifiers of every destination, in document order.
    pub fn destination_ids(&self) -> Vec<&str> {
        self.destinations.keys().map(String::as_str).collect()
    }

    /// Look up one destination's rules.
    pub fn destination(&self, id: &str) -> Result<&DestinationPolicy, CompileError> {
        self.destinations
            .get(id)
            .ok_or_else(|| CompileError::DestinationNotFound(id.to_string()))
    }

    /// The default filter mode for a destination, if the policy names one and
    /// the destination declares a mode by that name.
    pub fn default_filter_mode_for(&self, id: &str) -> Option<&'static str> {
        let level = self.filter_mode_default?;
        let destination = self.destinations.get(id)?;
        destination
            .filter_mode(level.as_str())
            .map(|_| level.as_str())
    }
}

/// Named strictness tier selectable through `filterModeDefault`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterModeLevel {
    /// Block the obvious distractions only
    Safe,
    /// Block everything the destination's aggressive tier lists
    Aggressive,
}

impl FilterModeLevel {
    /// All accepted values, in wire form.
    pub const VALUES: [&'static str; 2] = ["safe", "aggressive"];

    /// Wire name of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterModeLevel::Safe => "safe",
            FilterModeLevel::Aggressive => "aggressive",
        }
    }
}

/// One destination's rules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationPolicy {
    /// Absolute entry URL; also the fallback navigation target
    pub start: String,
    /// Allow patterns (glob or regex)
    pub allow: Vec<String>,
    /// Block patterns (glob or regex)
    pub block: Vec<String>,
    /// In-page enforcement instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dom: Option<DomRules>,
    /// Graduated strictness tiers, by name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_modes: Option<IndexMap<String, FilterMode>>,
    /// Named shortcut URLs; never consulted for authorization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_actions: Option<IndexMap<String, String>>,
}

impl DestinationPolicy {
    /// Create a destination with only a start URL and rule lists.
    pub fn new(start: impl Into<String>, allow: Vec<String>, block: Vec<String>) -> Self {
        Self {
            start: start.into(),
            allow,
            block,
            dom: None,
            filter_modes: None,
            quick_actions: None,
        }
    }

    /// Attach DOM rules.
    pub fn with_dom(mut self, dom: DomRules) -> Self {
        self.dom = Some(dom);
        self
    }

    /// Add a named filter mode.
    pub fn with_filter_mode(mut self, name: impl Into<String>, mode: FilterMode) -> Self {
        self.filter_modes
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), mode);
        self
    }

    /// Resolve a filter mode by name. Unknown names resolve to `None`.
    pub fn filter_mode(&self, name: &str) -> Option<&FilterMode> {
        self.filter_modes.as_ref()?.get(name)
    }

    /// Block patterns with the named mode's extra URLs appended.
    pub fn effective_block(&self, filter_mode: Option<&str>) -> Vec<String> {
        let mut block = self.block.clone();
        if let Some(mode) = filter_mode.and_then(|name| self.filter_mode(name)) {
            block.extend(mode.block_urls.iter().cloned());
        }
        block
    }
}

/// Enforcement instructions for in-page manipulation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomRules {
    /// Selectors of elements to suppress
    #[serde(default, deserialize_with = "null_as_empty")]
    pub hide: Vec<String>,
    /// Path prefixes of links whose navigation is intercepted
    #[serde(default, deserialize_with = "null_as_empty")]
    pub disable_anchors_to: Vec<String>,
    /// Raw supplementary script, appended verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

/// Additive strictness tier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterMode {
    /// Extra block patterns merged in while the mode is active
    #[serde(default, deserialize_with = "null_as_empty")]
    pub block_urls: Vec<String>,
    /// Extra selectors to hide while the mode is active
    #[serde(default, deserialize_with = "null_as_empty")]
    pub hide_selectors: Vec<String>,
    /// Opaque script fragments appended after `dom.script`
    #[serde(default, deserialize_with = "null_as_empty")]
    pub scriptlets: Vec<String>,
}

/// Lists written as `null` deserialize as empty.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
