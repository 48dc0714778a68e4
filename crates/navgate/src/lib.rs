//! NavGate: policy compiler and navigation authorization engine
//!
//! A single declarative policy describes, per destination, which pages of a
//! third-party site a user may reach and which elements are hidden. NavGate
//! validates the policy, compiles it into platform-native enforcement
//! artifacts for iOS, Android and desktop hosts, and answers "may this URL
//! load?" identically on all of them.

pub mod cache;
pub mod compile;
pub mod decision;
pub mod defaults;
mod error;
pub mod options;
pub mod pattern;
pub mod policy;
pub mod targets;

pub use cache::{PolicyCache, PolicySnapshot, PolicySource};
pub use compile::{
    Compilation, CompiledDestination, CompiledPolicy, Platform, PlatformArtifact,
    PlatformCompiler, compile, compile_all, compile_all_with, compile_destination, compile_with,
};
pub use decision::{
    CompiledMatchers, Decision, ResourceType, evaluate_navigation, is_explicitly_blocked,
    is_navigation_allowed, is_resource_allowed, nearest_allowed_route,
};
pub use defaults::bundled_default;
pub use error::{CompileError, FieldError, PolicyValidationError};
pub use options::{AnchorInterception, CompilerOptions, ScriptOptions};
pub use pattern::{Matcher, MatcherKind, compile_pattern};
pub use policy::{DestinationPolicy, Policy, ValidationReport, parse, parse_str, validate};
pub use targets::build_targets;
