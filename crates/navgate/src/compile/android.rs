//! Android compiler: URL block list plus injected DOM script.

use serde::Serialize;

use super::{Platform, PlatformCompiler, Prepared};
use crate::decision::CompiledMatchers;
use crate::error::CompileError;
use crate::options::ScriptOptions;
use crate::policy::DestinationPolicy;

/// Compiled rules for an Android WebView.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebViewArtifact {
    /// Block strings as written, base patterns first, then the mode's URLs
    pub block_urls: Vec<String>,
    /// Script evaluated after each page load
    pub dom_script: String,
    /// Matchers for the decision engine
    pub matchers: CompiledMatchers,
    /// The destination's start URL, verbatim
    pub start_url: String,
}

/// Compiler for Android WebViews.
#[derive(Clone, Debug, Default)]
pub struct AndroidCompiler {
    options: ScriptOptions,
}

impl AndroidCompiler {
    /// Create a compiler with the given script options.
    pub fn new(options: ScriptOptions) -> Self {
        Self { options }
    }
}

impl PlatformCompiler for AndroidCompiler {
    type Artifact = WebViewArtifact;

    fn platform(&self) -> Platform {
        Platform::Android
    }

    fn compile(
        &self,
        destination: &DestinationPolicy,
        filter_mode: Option<&str>,
    ) -> Result<WebViewArtifact, CompileError> {
        let prepared = Prepared::new(destination, filter_mode)?;

        Ok(WebViewArtifact {
            block_urls: destination.effective_block(filter_mode),
            dom_script: prepared.script(destination, self.platform(), &self.options)?,
            matchers: prepared.matchers,
            start_url: destination.start.clone(),
        })
    }
}
