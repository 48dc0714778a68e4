//! Hot-swappable policy cache.
//!
//! Hosts keep one [`PolicyCache`] for the life of the process. Readers take a
//! [`PolicySnapshot`] and answer every query for a navigation against it, so a
//! concurrent refresh never mixes two policies inside a single decision.
//!
//! ## Example
//!
//! ```rust,ignore
//! use navgate::cache::PolicyCache;
//! use navgate::compile::Platform;
//!
//! let cache = PolicyCache::with_bundled_default()?;
//! if cache.refresh_from_json(&fetched).is_err() {
//!     // still serving the previous policy
//! }
//!
//! let snapshot = cache.current_or_default();
//! if !snapshot.is_navigation_allowed("youtube", Platform::Android, url)? {
//!     webview.load(&snapshot.nearest_allowed_route("youtube", Platform::Android, url)?);
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use arc_swap::ArcSwap;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::compile::{Platform, PlatformArtifact, compile_destination};
use crate::decision::Decision;
use crate::defaults::bundled_default;
use crate::error::{CompileError, PolicyValidationError};
use crate::options::CompilerOptions;
use crate::policy::{Policy, parse};

/// Where the policy of a snapshot came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicySource {
    /// The cache's embedded default
    Default,
    /// A policy installed by [`PolicyCache::refresh`]
    Refreshed,
}

type ArtifactKey = (String, Platform, Option<String>);

/// An immutable policy plus the artifacts compiled from it so far.
#[derive(Debug)]
pub struct PolicySnapshot {
    policy: Arc<Policy>,
    source: PolicySource,
    options: Arc<CompilerOptions>,
    artifacts: RwLock<HashMap<ArtifactKey, Arc<PlatformArtifact>>>,
}

impl PolicySnapshot {
    fn new(policy: Arc<Policy>, source: PolicySource, options: Arc<CompilerOptions>) -> Self {
        Self {
            policy,
            source,
            options,
            artifacts: RwLock::new(HashMap::new()),
        }
    }

    /// The policy this snapshot serves.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// The policy version.
    pub fn version(&self) -> &str {
        self.policy.version()
    }

    /// Whether this is the embedded default or a refreshed policy.
    pub fn source(&self) -> PolicySource {
        self.source
    }

    /// The compiled artifact for a destination, compiling it on first use.
    ///
    /// Without an explicit `filter_mode` the policy's `filterModeDefault`
    /// applies when the destination declares that mode. Mode names the
    /// destination does not declare compile as no mode and share its entry.
    pub fn artifact(
        &self,
        destination_id: &str,
        platform: Platform,
        filter_mode: Option<&str>,
    ) -> Result<Arc<PlatformArtifact>, CompileError> {
        let destination = self.policy.destination(destination_id)?;
        let mode = filter_mode
            .or_else(|| self.policy.default_filter_mode_for(destination_id))
            .filter(|name| destination.filter_mode(name).is_some());
        let key = (destination_id.to_string(), platform, mode.map(str::to_string));

        if let Some(artifact) = self
            .artifacts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(artifact));
        }

        let artifact = Arc::new(compile_destination(
            destination,
            platform,
            mode,
            &self.options,
        )?);
        debug!(
            destination = destination_id,
            %platform,
            version = self.version(),
            "cached compiled artifact"
        );

        let mut artifacts = self.artifacts.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(artifacts.entry(key).or_insert(artifact)))
    }

    /// Number of artifacts compiled so far.
    pub fn cached_artifacts(&self) -> usize {
        self.artifacts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Evaluate a navigation with the destination's default filter mode.
    pub fn evaluate_navigation(
        &self,
        destination_id: &str,
        platform: Platform,
        url: &str,
    ) -> Result<Decision, CompileError> {
        Ok(self
            .artifact(destination_id, platform, None)?
            .evaluate_navigation(url))
    }

    /// Whether a top-level navigation may proceed.
    pub fn is_navigation_allowed(
        &self,
        destination_id: &str,
        platform: Platform,
        url: &str,
    ) -> Result<bool, CompileError> {
        Ok(self
            .artifact(destination_id, platform, None)?
            .is_navigation_allowed(url))
    }

    /// Whether a sub-resource may load.
    pub fn is_resource_allowed(
        &self,
        destination_id: &str,
        platform: Platform,
        url: &str,
    ) -> Result<bool, CompileError> {
        Ok(self
            .artifact(destination_id, platform, None)?
            .is_resource_allowed(url))
    }

    /// Where to send a denied navigation.
    pub fn nearest_allowed_route(
        &self,
        destination_id: &str,
        platform: Platform,
        url: &str,
    ) -> Result<String, CompileError> {
        Ok(self
            .artifact(destination_id, platform, None)?
            .nearest_allowed_route(url))
    }
}

/// The process-wide policy holder.
///
/// Reads are a single atomic load; refreshes build a new snapshot and swap it
/// in. Readers holding an older snapshot keep using it until they drop it.
#[derive(Debug)]
pub struct PolicyCache {
    default: Arc<Policy>,
    options: Arc<CompilerOptions>,
    current: ArcSwap<PolicySnapshot>,
}

impl PolicyCache {
    /// Create a cache serving `default` until the first refresh.
    pub fn new(default: Policy) -> Self {
        Self::with_options(default, CompilerOptions::default())
    }

    /// Create a cache with explicit compiler options.
    pub fn with_options(default: Policy, options: CompilerOptions) -> Self {
        let default = Arc::new(default);
        let options = Arc::new(options);
        let snapshot = PolicySnapshot::new(
            Arc::clone(&default),
            PolicySource::Default,
            Arc::clone(&options),
        );
        Self {
            default,
            options,
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    /// Create a cache around the bundled default policy.
    pub fn with_bundled_default() -> Result<Self, PolicyValidationError> {
        Ok(Self::new(bundled_default()?))
    }

    /// The snapshot in effect: the last refreshed policy, or the default.
    pub fn current_or_default(&self) -> Arc<PolicySnapshot> {
        self.current.load_full()
    }

    /// The version currently served.
    pub fn version(&self) -> String {
        self.current.load().version().to_string()
    }

    /// Install an already validated policy.
    pub fn refresh(&self, policy: Policy) {
        info!(
            from = %self.current.load().version(),
            to = %policy.version,
            "refreshing policy"
        );
        self.current.store(Arc::new(PolicySnapshot::new(
            Arc::new(policy),
            PolicySource::Refreshed,
            Arc::clone(&self.options),
        )));
    }

    /// Validate and install a raw policy document.
    ///
    /// A document that fails validation is rejected as a whole; the cache
    /// keeps serving its current policy.
    pub fn refresh_from_json(&self, raw: &Value) -> Result<(), PolicyValidationError> {
        match parse(raw) {
            Ok(policy) => {
                self.refresh(policy);
                Ok(())
            }
            Err(e) => {
                warn!(
                    errors = e.errors.len(),
                    version = %self.current.load().version(),
                    "rejected policy refresh, keeping current policy"
                );
                Err(e)
            }
        }
    }

    /// Drop any refreshed policy and serve the default again.
    pub fn reset(&self) {
        info!(version = %self.default.version, "resetting policy to default");
        self.current.store(Arc::new(PolicySnapshot::new(
            Arc::clone(&self.default),
            PolicySource::Default,
            Arc::clone(&self.options),
        )));
    }
}
