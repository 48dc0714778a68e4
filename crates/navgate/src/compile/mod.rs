//! Platform compilers.
//!
//! One destination's rules compile into a platform-native artifact: a
//! content-rule list for iOS, a block list for the Android WebView, request
//! filters for the desktop browser. Every artifact also carries the same
//! [`CompiledMatchers`] and the verbatim start URL, so the decision engine
//! answers identically whichever platform produced them.
//!
//! ## Example
//!
//! ```rust,ignore
//! use navgate::compile::{Platform, compile};
//!
//! let compiled = compile(&policy, Platform::Desktop, Some("photos"))?;
//! let artifact = compiled.into_single().expect("single destination");
//! if !artifact.is_navigation_allowed(url) {
//!     redirect(artifact.nearest_allowed_route(url));
//! }
//! ```

mod android;
mod desktop;
mod ios;
pub mod script;

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

pub use android::{AndroidCompiler, WebViewArtifact};
pub use desktop::{DesktopArtifact, DesktopCompiler, RequestFilter, resolve_block_url};
pub use ios::{
    Action, ActionKind, ContentRule, ContentRuleArtifact, IosCompiler, Trigger, url_filter,
};

use crate::decision::{self, CompiledMatchers, Decision};
use crate::error::CompileError;
use crate::options::{CompilerOptions, ScriptOptions};
use crate::policy::{DestinationPolicy, FilterMode, Policy};
use script::ScriptSpec;

/// Enforcement environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Embedded web view with native content-rule lists
    Ios,
    /// WebView with script injection and a URL block list
    Android,
    /// Embedded browser process with network request filtering
    Desktop,
}

impl Platform {
    /// Every platform.
    pub const ALL: [Platform; 3] = [Platform::Ios, Platform::Android, Platform::Desktop];

    /// Wire name of the platform.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Desktop => "desktop",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|platform| platform.as_str() == s)
            .ok_or_else(|| CompileError::UnknownPlatform(s.to_string()))
    }
}

/// A compiler for one platform's artifact.
pub trait PlatformCompiler {
    /// The artifact this compiler produces.
    type Artifact;

    /// The platform this compiler targets.
    fn platform(&self) -> Platform;

    /// Compile one destination. An unknown `filter_mode` means no extra mode.
    fn compile(
        &self,
        destination: &DestinationPolicy,
        filter_mode: Option<&str>,
    ) -> Result<Self::Artifact, CompileError>;
}

/// Shared compiler input: validated start URL, active mode and matchers.
#[derive(Debug)]
struct Prepared<'a> {
    start: Url,
    mode: Option<&'a FilterMode>,
    matchers: CompiledMatchers,
}

impl<'a> Prepared<'a> {
    fn new(
        destination: &'a DestinationPolicy,
        filter_mode: Option<&str>,
    ) -> Result<Self, CompileError> {
        let start = Url::parse(&destination.start).map_err(|e| CompileError::InvalidStartUrl {
            url: destination.start.clone(),
            reason: e.to_string(),
        })?;

        let mode = filter_mode.and_then(|name| {
            let mode = destination.filter_mode(name);
            if mode.is_none() {
                tracing::debug!(filter_mode = name, "unknown filter mode, compiling without it");
            }
            mode
        });
        let active = mode.and(filter_mode);

        Ok(Self {
            start,
            mode,
            matchers: CompiledMatchers::compile(
                &destination.allow,
                &destination.effective_block(active),
            ),
        })
    }

    fn script(
        &self,
        destination: &DestinationPolicy,
        platform: Platform,
        options: &ScriptOptions,
    ) -> Result<String, CompileError> {
        let spec = ScriptSpec {
            dom: destination.dom.as_ref(),
            mode: self.mode,
            options,
            interception: options.interception_for(platform),
        };
        Ok(spec.render()?)
    }
}

/// A compiled artifact for any platform.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "platform", rename_all = "lowercase")]
pub enum PlatformArtifact {
    /// iOS content-rule list and user script
    Ios(ContentRuleArtifact),
    /// Android block list and DOM script
    Android(WebViewArtifact),
    /// Desktop request filters and content script
    Desktop(DesktopArtifact),
}

impl PlatformArtifact {
    /// The platform the artifact was compiled for.
    pub fn platform(&self) -> Platform {
        match self {
            PlatformArtifact::Ios(_) => Platform::Ios,
            PlatformArtifact::Android(_) => Platform::Android,
            PlatformArtifact::Desktop(_) => Platform::Desktop,
        }
    }

    /// The matchers shared with the decision engine.
    pub fn matchers(&self) -> &CompiledMatchers {
        match self {
            PlatformArtifact::Ios(a) => &a.matchers,
            PlatformArtifact::Android(a) => &a.matchers,
            PlatformArtifact::Desktop(a) => &a.matchers,
        }
    }

    /// The destination's start URL, verbatim.
    pub fn start_url(&self) -> &str {
        match self {
            PlatformArtifact::Ios(a) => &a.start_url,
            PlatformArtifact::Android(a) => &a.start_url,
            PlatformArtifact::Desktop(a) => &a.start_url,
        }
    }

    /// The injectable enforcement script.
    pub fn script(&self) -> &str {
        match self {
            PlatformArtifact::Ios(a) => &a.user_script,
            PlatformArtifact::Android(a) => &a.dom_script,
            PlatformArtifact::Desktop(a) => &a.content_script,
        }
    }

    /// See [`decision::evaluate_navigation`].
    pub fn evaluate_navigation(&self, url: &str) -> Decision {
        self.matchers().evaluate_navigation(url)
    }

    /// See [`decision::is_navigation_allowed`].
    pub fn is_navigation_allowed(&self, url: &str) -> bool {
        self.matchers().is_navigation_allowed(url)
    }

    /// See [`decision::is_resource_allowed`].
    pub fn is_resource_allowed(&self, url: &str) -> bool {
        self.matchers().is_resource_allowed(url)
    }

    /// See [`decision::is_explicitly_blocked`].
    pub fn is_explicitly_blocked(&self, url: &str) -> bool {
        self.matchers().is_explicitly_blocked(url)
    }

    /// See [`decision::nearest_allowed_route`].
    pub fn nearest_allowed_route(&self, url: &str) -> String {
        decision::nearest_allowed_route(url, &self.matchers().allow, self.start_url())
    }
}

/// Result of [`compile`]: one destination, or every destination by id.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Compilation {
    /// A single destination was requested
    Destination(PlatformArtifact),
    /// Every destination, in policy order
    All(IndexMap<String, PlatformArtifact>),
}

impl Compilation {
    /// The single artifact, or `None` for a whole-policy compilation.
    pub fn into_single(self) -> Option<PlatformArtifact> {
        match self {
            Compilation::Destination(artifact) => Some(artifact),
            Compilation::All(_) => None,
        }
    }
}

/// Compile one destination for a platform with explicit options.
pub fn compile_destination(
    destination: &DestinationPolicy,
    platform: Platform,
    filter_mode: Option<&str>,
    options: &CompilerOptions,
) -> Result<PlatformArtifact, CompileError> {
    tracing::debug!(%platform, start = %destination.start, filter_mode, "compiling destination");
    Ok(match platform {
        Platform::Ios => PlatformArtifact::Ios(
            IosCompiler::new(options.ios.clone()).compile(destination, filter_mode)?,
        ),
        Platform::Android => PlatformArtifact::Android(
            AndroidCompiler::new(options.android.clone()).compile(destination, filter_mode)?,
        ),
        Platform::Desktop => PlatformArtifact::Desktop(
            DesktopCompiler::new(options.desktop.clone()).compile(destination, filter_mode)?,
        ),
    })
}

/// Compile a policy for a platform with default options.
///
/// With a destination id, compiles that destination (unknown ids fail with
/// [`CompileError::DestinationNotFound`]); without one, compiles them all.
pub fn compile(
    policy: &Policy,
    platform: Platform,
    destination_id: Option<&str>,
) -> Result<Compilation, CompileError> {
    compile_with(policy, platform, destination_id, &CompilerOptions::default())
}

/// [`compile`] with explicit options.
pub fn compile_with(
    policy: &Policy,
    platform: Platform,
    destination_id: Option<&str>,
    options: &CompilerOptions,
) -> Result<Compilation, CompileError> {
    if let Some(id) = destination_id {
        let destination = policy.destination(id)?;
        let artifact = compile_destination(
            destination,
            platform,
            policy.default_filter_mode_for(id),
            options,
        )?;
        return Ok(Compilation::Destination(artifact));
    }

    let mut artifacts = IndexMap::with_capacity(policy.destinations.len());
    for (id, destination) in &policy.destinations {
        let artifact = compile_destination(
            destination,
            platform,
            policy.default_filter_mode_for(id),
            options,
        )?;
        artifacts.insert(id.clone(), artifact);
    }
    Ok(Compilation::All(artifacts))
}

/// One destination compiled for every platform.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledDestination {
    /// iOS artifact
    pub ios: ContentRuleArtifact,
    /// Android artifact
    pub android: WebViewArtifact,
    /// Desktop artifact
    pub desktop: DesktopArtifact,
    /// The destination's quick actions, passed through
    pub quick_actions: IndexMap<String, String>,
}

/// A whole policy compiled for every platform.
#[derive(Clone, Debug, Serialize)]
pub struct CompiledPolicy {
    /// Version of the source policy
    pub version: String,
    /// Compiled destinations, in policy order
    pub destinations: IndexMap<String, CompiledDestination>,
}

/// Compile every destination of a policy for every platform.
pub fn compile_all(policy: &Policy) -> Result<CompiledPolicy, CompileError> {
    compile_all_with(policy, &CompilerOptions::default())
}

/// [`compile_all`] with explicit options.
pub fn compile_all_with(
    policy: &Policy,
    options: &CompilerOptions,
) -> Result<CompiledPolicy, CompileError> {
    let ios = IosCompiler::new(options.ios.clone());
    let android = AndroidCompiler::new(options.android.clone());
    let desktop = DesktopCompiler::new(options.desktop.clone());

    let mut destinations = IndexMap::with_capacity(policy.destinations.len());
    for (id, destination) in &policy.destinations {
        let mode = policy.default_filter_mode_for(id);
        destinations.insert(
            id.clone(),
            CompiledDestination {
                ios: ios.compile(destination, mode)?,
                android: android.compile(destination, mode)?,
                desktop: desktop.compile(destination, mode)?,
                quick_actions: destination.quick_actions.clone().unwrap_or_default(),
            },
        );
    }

    Ok(CompiledPolicy {
        version: policy.version.clone(),
        destinations,
    })
}
