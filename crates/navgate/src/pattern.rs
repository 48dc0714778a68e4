//! Translation of policy pattern strings into matchers.
//!
//! A policy field accepts two notations side by side. Strings that look like
//! regular expressions (anchored with `^`/`$`, or containing `\ ( ) [ ] { } |`
//! or `.*`) are compiled as-is; everything else is a glob where `*` matches
//! any run of characters. A regex that fails to compile is retried as a glob,
//! so one bad entry never takes down a destination's rule set.
//!
//! Regexes use the `regex-lite` dialect: no lookaround (`(?=`, `(?!`, `(?<=`,
//! `(?<!`) and no backreferences. A rule written with either fails to compile,
//! falls back to a glob that only matches its own literal text, and so
//! effectively stops applying. The fallback is logged at `warn`.
//!
//! Glob anchoring depends on the pattern's shape:
//!
//! - `/path` patterns match a whole path, tolerating a trailing slash and a
//!   query or fragment suffix, but not deeper segments unless they end in `*`.
//! - `scheme://...` patterns match a whole URL, tolerating a query or fragment.
//! - Anything else (a bare host or fragment) matches as a substring, unless it
//!   ends in `*`, in which case it is anchored on both sides.

use std::fmt;

use regex_lite::Regex;
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Characters escaped when a glob is turned into an expression.
const GLOB_META: &[char] = &[
    '-', '/', '\\', '^', '$', '+', '?', '.', '(', ')', '|', '[', ']', '{', '}',
];

/// Tokens that mark a pattern as an intended regular expression.
const REGEX_TOKENS: &[char] = &['\\', '(', ')', '[', ']', '{', '}', '|'];

/// How a matcher was derived from its pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatcherKind {
    /// The pattern was compiled as a regular expression verbatim
    Regex,
    /// The pattern was translated from glob notation
    Glob,
    /// The pattern was empty; the matcher never matches
    Never,
}

impl MatcherKind {
    fn as_str(&self) -> &'static str {
        match self {
            MatcherKind::Regex => "regex",
            MatcherKind::Glob => "glob",
            MatcherKind::Never => "never",
        }
    }
}

/// A compiled policy pattern.
///
/// Immutable and cheap to clone; safe to share across threads.
#[derive(Clone)]
pub struct Matcher {
    pattern: String,
    kind: MatcherKind,
    regex: Option<Regex>,
}

impl Matcher {
    fn never(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            kind: MatcherKind::Never,
            regex: None,
        }
    }

    /// Test a candidate string. Unanchored unless the expression anchors itself.
    pub fn matches(&self, candidate: &str) -> bool {
        self.regex
            .as_ref()
            .is_some_and(|regex| regex.is_match(candidate))
    }

    /// The pattern as written in the policy.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// How the pattern was interpreted.
    pub fn kind(&self) -> MatcherKind {
        self.kind
    }

    /// The compiled expression, if any.
    pub fn expression(&self) -> Option<&str> {
        self.regex.as_ref().map(Regex::as_str)
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("pattern", &self.pattern)
            .field("kind", &self.kind)
            .field("expression", &self.expression())
            .finish()
    }
}

impl Serialize for Matcher {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Matcher", 3)?;
        state.serialize_field("pattern", &self.pattern)?;
        state.serialize_field("kind", self.kind.as_str())?;
        state.serialize_field("expression", &self.expression())?;
        state.end()
    }
}

/// Whether a trimmed pattern should be treated as a regular expression.
pub fn looks_like_regex(pattern: &str) -> bool {
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        return false;
    }
    trimmed.starts_with('^')
        || trimmed.ends_with('$')
        || trimmed.contains(REGEX_TOKENS)
        || trimmed.contains(".*")
}

/// Compile one policy pattern. Never fails.
pub fn compile_pattern(pattern: &str) -> Matcher {
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        return Matcher::never(pattern);
    }

    if looks_like_regex(trimmed) {
        match Regex::new(trimmed) {
            Ok(regex) => {
                return Matcher {
                    pattern: pattern.to_string(),
                    kind: MatcherKind::Regex,
                    regex: Some(regex),
                };
            }
            Err(e) => {
                tracing::warn!(pattern = trimmed, error = %e, "invalid regex, compiling as glob");
            }
        }
    }

    let expression = glob_expression(trimmed);
    match Regex::new(&expression) {
        Ok(regex) => Matcher {
            pattern: pattern.to_string(),
            kind: MatcherKind::Glob,
            regex: Some(regex),
        },
        Err(e) => {
            tracing::warn!(pattern = trimmed, error = %e, "glob expression rejected, pattern disabled");
            Matcher::never(pattern)
        }
    }
}

/// Compile a list of patterns, preserving order.
pub fn compile_patterns<S: AsRef<str>>(patterns: &[S]) -> Vec<Matcher> {
    patterns
        .iter()
        .map(|pattern| compile_pattern(pattern.as_ref()))
        .collect()
}

fn escape_glob(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    for c in glob.chars() {
        if c == '*' {
            out.push_str(".*");
        } else {
            if GLOB_META.contains(&c) {
                out.push('\\');
            }
            out.push(c);
        }
    }
    out
}

fn glob_expression(glob: &str) -> String {
    let wildcard_tail = glob.ends_with('*');

    if glob.starts_with('/') {
        if wildcard_tail {
            return format!("^{}(?:[?#].*)?$", escape_glob(glob));
        }
        // `/explore/` and `/explore` both name the same section.
        let stem = match glob.strip_suffix('/') {
            Some(stem) if !stem.is_empty() => stem,
            _ => glob,
        };
        return format!("^{}(?:\\/)?(?:[?#].*)?$", escape_glob(stem));
    }

    let body = escape_glob(glob);
    if glob.contains("://") {
        if wildcard_tail {
            format!("^{body}$")
        } else {
            format!("^{body}(?:[?#].*)?$")
        }
    } else if wildcard_tail {
        format!("^{body}$")
    } else {
        body
    }
}
