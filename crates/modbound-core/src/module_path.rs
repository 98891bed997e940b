//! Hierarchical module paths and symbol pattern matching.
//!
//! A [`ModulePath`] is a `::`-separated path naming a module relative to a
//! source root (e.g. `app::util`). Validation is structural only: segments
//! must be non-empty and whitespace-free, so declared paths may carry regex
//! metacharacters when regex matching is enabled.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A validated `::`-separated module path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct ModulePath(String);

impl ModulePath {
    /// Creates a new module path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is empty, has an empty segment
    /// (leading/trailing/doubled `::`), or contains whitespace.
    pub fn new(path: &str) -> Result<Self, ModulePathError> {
        if path.is_empty() {
            return Err(ModulePathError::Empty);
        }
        for segment in path.split("::") {
            if segment.is_empty() {
                return Err(ModulePathError::EmptySegment {
                    path: path.to_string(),
                });
            }
            if segment.chars().any(char::is_whitespace) {
                return Err(ModulePathError::InvalidSegment {
                    path: path.to_string(),
                    segment: segment.to_string(),
                });
            }
        }
        Ok(Self(path.to_string()))
    }

    /// Builds a module path from segments. Returns `None` for an empty list.
    #[must_use]
    pub fn from_segments<'a, I>(segments: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let joined = segments.into_iter().collect::<Vec<_>>().join("::");
        if joined.is_empty() {
            None
        } else {
            Some(Self(joined))
        }
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the `::`-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split("::")
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments().count()
    }

    /// Always false: an empty path cannot be constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns the first segment.
    #[must_use]
    pub fn first_segment(&self) -> &str {
        self.0.split("::").next().unwrap_or(&self.0)
    }

    /// Returns the parent path, or `None` for a single-segment path.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0.rfind("::").map(|idx| Self(self.0[..idx].to_string()))
    }

    /// Tests segment-wise whether `self` is a (non-strict) prefix of `other`.
    ///
    /// `app` is a prefix of `app::util` but not of `apple`.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0 == other.0 {
            return true;
        }
        other
            .0
            .strip_prefix(&self.0)
            .is_some_and(|rest| rest.starts_with("::"))
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ModulePath {
    type Error = ModulePathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

/// Errors in module path construction.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModulePathError {
    /// Module path is empty.
    #[error("module path must not be empty")]
    Empty,

    /// A `::`-separated segment is empty.
    #[error("module path `{path}` has an empty segment")]
    EmptySegment {
        /// The offending path.
        path: String,
    },

    /// A segment contains whitespace.
    #[error("module path `{path}` has invalid segment `{segment}`")]
    InvalidSegment {
        /// The offending path.
        path: String,
        /// The offending segment.
        segment: String,
    },
}

/// Checks whether a symbol path matches an interface pattern.
///
/// Patterns are `::`-separated with `*` matching exactly one segment and
/// `**` matching any number of segments.
///
/// # Examples
///
/// ```ignore
/// assert!(symbol_matches("parse", "parse"));
/// assert!(symbol_matches("api::Client", "api::*"));
/// assert!(!symbol_matches("inner::detail", "api::*"));
/// ```
#[must_use]
pub fn symbol_matches(symbol: &str, pattern: &str) -> bool {
    let symbol_parts: Vec<&str> = symbol.split("::").collect();
    let pattern_parts: Vec<&str> = pattern.split("::").collect();
    match_parts(&symbol_parts, &pattern_parts)
}

fn match_parts(path: &[&str], pattern: &[&str]) -> bool {
    if pattern.is_empty() {
        return path.is_empty();
    }

    let (first, rest) = (pattern[0], &pattern[1..]);
    match first {
        "**" => (0..=path.len()).any(|i| match_parts(&path[i..], rest)),
        "*" => !path.is_empty() && match_parts(&path[1..], rest),
        literal => !path.is_empty() && path[0] == literal && match_parts(&path[1..], rest),
    }
}
