//! Name matching strategies for selecting source databases and tables.
//!
//! Discovery never hard-wires a pattern syntax: it receives a [`Matcher`]
//! for database names and one for table names. Every strategy matches the
//! whole name, never a substring.

use crate::error::{Result, SyncError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A predicate over database or table names.
pub trait Matcher: Send + Sync + fmt::Debug {
    /// Returns true if `name` is selected.
    fn matches(&self, name: &str) -> bool;

    /// The pattern as configured, for diagnostics.
    fn pattern(&self) -> &str;
}

/// Regular-expression matcher. The compiled pattern must match the full name.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    pattern: String,
    regex: Regex,
}

impl RegexMatcher {
    /// Compiles `pattern` anchored at both ends.
    ///
    /// # Errors
    /// Returns `InvalidPattern` if the pattern is not a valid regular expression.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex =
            Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| SyncError::InvalidPattern {
                pattern: pattern.to_string(),
                source: e,
            })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }
}

impl Matcher for RegexMatcher {
    fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Glob matcher supporting `*` (any sequence) and `?` (any single character).
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    pattern: String,
}

impl GlobMatcher {
    /// Creates a matcher for `pattern`.
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
        }
    }
}

impl Matcher for GlobMatcher {
    fn matches(&self, name: &str) -> bool {
        glob_match(&self.pattern, name)
    }

    fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Matches an explicit list of names exactly.
#[derive(Debug, Clone)]
pub struct ExactMatcher {
    pattern: String,
    names: Vec<String>,
}

impl ExactMatcher {
    /// Builds a matcher from a comma-separated list of names.
    pub fn new(list: &str) -> Self {
        Self {
            pattern: list.to_string(),
            names: list
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl Matcher for ExactMatcher {
    fn matches(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Matching strategy selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherKind {
    /// Anchored regular expression
    #[default]
    Regex,
    /// Shell-style `*` and `?` wildcards
    Glob,
    /// Comma-separated list of literal names
    Exact,
}

impl fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatcherKind::Regex => write!(f, "regex"),
            MatcherKind::Glob => write!(f, "glob"),
            MatcherKind::Exact => write!(f, "exact"),
        }
    }
}

impl std::str::FromStr for MatcherKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "regex" => Ok(MatcherKind::Regex),
            "glob" => Ok(MatcherKind::Glob),
            "exact" => Ok(MatcherKind::Exact),
            other => Err(SyncError::configuration(format!(
                "Unknown matcher kind '{}': expected regex, glob or exact",
                other
            ))),
        }
    }
}

/// Builds a boxed matcher of the requested kind.
///
/// # Errors
/// Returns `InvalidPattern` for a regex that does not compile.
pub fn build_matcher(kind: MatcherKind, pattern: &str) -> Result<Box<dyn Matcher>> {
    Ok(match kind {
        MatcherKind::Regex => Box::new(RegexMatcher::new(pattern)?),
        MatcherKind::Glob => Box::new(GlobMatcher::new(pattern)),
        MatcherKind::Exact => Box::new(ExactMatcher::new(pattern)),
    })
}

fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();

    glob_match_recursive(&pattern_chars, &text_chars, 0, 0)
}

fn glob_match_recursive(pattern: &[char], text: &[char], mut pi: usize, mut ti: usize) -> bool {
    while pi < pattern.len() {
        match pattern[pi] {
            '*' => {
                while pi < pattern.len() && pattern[pi] == '*' {
                    pi += 1;
                }

                if pi == pattern.len() {
                    return true;
                }

                while ti <= text.len() {
                    if glob_match_recursive(pattern, text, pi, ti) {
                        return true;
                    }
                    ti += 1;
                }
                return false;
            }
            '?' => {
                if ti >= text.len() {
                    return false;
                }
                pi += 1;
                ti += 1;
            }
            c => {
                if ti >= text.len() || text[ti] != c {
                    return false;
                }
                pi += 1;
                ti += 1;
            }
        }
    }

    ti == text.len()
}
