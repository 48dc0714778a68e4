//! Error types for policy parsing and compilation.

use thiserror::Error;

/// A single schema violation found while validating a policy document.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{}: {message}", display_path(.path))]
pub struct FieldError {
    /// Dotted path to the offending field (empty for the document root)
    pub path: String,
    /// Human-readable description of the violation
    pub message: String,
}

impl FieldError {
    /// Create a new field error.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an error about the document as a whole.
    pub fn root(message: impl Into<String>) -> Self {
        Self::new("", message)
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "(root)" } else { path }
}

/// A policy document did not conform to the schema.
///
/// Carries every violation found, not just the first one.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid policy: {}", join_messages(.errors))]
pub struct PolicyValidationError {
    /// All violations, in document order
    pub errors: Vec<FieldError>,
}

impl PolicyValidationError {
    /// Wrap a list of violations.
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Violations rendered as `path: message` strings.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that can occur while compiling a policy for a platform.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The requested destination is not part of the policy
    #[error("destination {0} not found in policy")]
    DestinationNotFound(String),
    /// The platform name is not one of `ios`, `android`, `desktop`
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
    /// The destination's start URL is not an absolute URL
    #[error("invalid start URL {url}: {reason}")]
    InvalidStartUrl {
        /// The offending URL
        url: String,
        /// Parser message
        reason: String,
    },
    /// A native rule list could not be serialized
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
