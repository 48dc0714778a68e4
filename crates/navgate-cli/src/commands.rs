//! Subcommand implementations.
//!
//! Each command writes its report to the given writer and returns whether the
//! outcome was a success, so `main` can map it to an exit code.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use navgate::compile::{PlatformArtifact, compile_destination};
use navgate::{
    Compilation, CompilerOptions, Decision, Platform, Policy, ResourceType, bundled_default,
    compile_with, parse_str,
};

/// Load a policy file, or the bundled default when no path is given.
pub fn load_policy(path: Option<&Path>) -> Result<Policy> {
    let Some(path) = path else {
        tracing::debug!("no policy given, using the bundled default");
        return bundled_default().context("bundled policy is invalid");
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read policy {}", path.display()))?;
    parse_str(&text).with_context(|| format!("invalid policy {}", path.display()))
}

/// Load compiler options, or the defaults when no path is given.
pub fn load_options(path: Option<&Path>) -> Result<CompilerOptions> {
    let Some(path) = path else {
        return Ok(CompilerOptions::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read options {}", path.display()))?;
    CompilerOptions::from_json(&text)
        .with_context(|| format!("invalid options {}", path.display()))
}

/// Report whether a policy file validates, listing every violation.
pub fn validate(path: Option<&Path>, out: &mut impl Write) -> Result<bool> {
    let policy = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read policy {}", path.display()))?;
            match parse_str(&text) {
                Ok(policy) => policy,
                Err(e) => {
                    writeln!(out, "invalid: {} error(s)", e.errors.len())?;
                    for message in e.messages() {
                        writeln!(out, "  {message}")?;
                    }
                    return Ok(false);
                }
            }
        }
        None => load_policy(None)?,
    };

    writeln!(
        out,
        "valid: version {}, destinations: {}",
        policy.version(),
        policy.destination_ids().join(", ")
    )?;
    Ok(true)
}

/// Compile one destination, or all of them, and print the artifacts as JSON.
pub fn compile(
    policy: &Policy,
    options: &CompilerOptions,
    platform: Platform,
    destination: Option<&str>,
    filter_mode: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    let compilation = match (destination, filter_mode) {
        (Some(id), Some(mode)) => Compilation::Destination(compile_destination(
            policy.destination(id)?,
            platform,
            Some(mode),
            options,
        )?),
        (None, Some(mode)) => {
            let mut artifacts = IndexMap::with_capacity(policy.destinations.len());
            for (id, destination) in &policy.destinations {
                let artifact = compile_destination(destination, platform, Some(mode), options)
                    .with_context(|| format!("failed to compile {id}"))?;
                artifacts.insert(id.clone(), artifact);
            }
            Compilation::All(artifacts)
        }
        (_, None) => compile_with(policy, platform, destination, options)?,
    };

    serde_json::to_writer_pretty(&mut *out, &compilation)?;
    writeln!(out)?;
    Ok(())
}

/// A single URL to decide.
#[derive(Debug)]
pub struct CheckRequest<'a> {
    /// Enforcement platform
    pub platform: Platform,
    /// Destination id
    pub destination: &'a str,
    /// Filter mode; the policy default applies when absent
    pub filter_mode: Option<&'a str>,
    /// URL to decide
    pub url: &'a str,
    /// Decide as a sub-resource of this type instead of a navigation
    pub resource: Option<ResourceType>,
}

/// Decide one URL and print the verdict with the rule responsible.
///
/// Returns `true` when the URL is allowed.
pub fn check(
    policy: &Policy,
    options: &CompilerOptions,
    request: &CheckRequest<'_>,
    out: &mut impl Write,
) -> Result<bool> {
    let CheckRequest {
        platform,
        destination,
        filter_mode,
        url,
        resource,
    } = *request;
    let mode = filter_mode.or_else(|| policy.default_filter_mode_for(destination));
    let artifact = compile_destination(policy.destination(destination)?, platform, mode, options)?;

    if let Some(resource) = resource {
        let allowed = match &artifact {
            PlatformArtifact::Desktop(desktop) => desktop.is_request_allowed(url, resource),
            other => other.is_resource_allowed(url),
        };
        let verdict = if allowed { "allowed" } else { "blocked" };
        writeln!(out, "{verdict}: {resource:?} {url}")?;
        return Ok(allowed);
    }

    let decision = artifact.evaluate_navigation(url);
    match &decision {
        Decision::Allowed { pattern } => writeln!(out, "allowed: {url} (allow {pattern})")?,
        Decision::Blocked { pattern } => writeln!(out, "blocked: {url} (block {pattern})")?,
        Decision::Unmatched => writeln!(out, "blocked: {url} (no rule matched)")?,
    }
    if !decision.is_allowed() {
        writeln!(out, "redirect: {}", artifact.nearest_allowed_route(url))?;
    }
    Ok(decision.is_allowed())
}
