//! Path pattern matching.
//!
//! Patterns select *relative* paths inside a tree being mirrored. A pattern
//! is a regular expression anchored at the start of the path; it selects a
//! path when the match ends at a `/` component boundary or at the end of
//! the path, so selecting a directory selects everything beneath it while
//! sibling names that merely share a prefix stay unselected.
//!
//! Shell-glob sources (`20??????`, `*.rslc`) are supported through
//! [`Pattern::glob`], which translates them into the same anchored form.
//! Malformed sources fail at construction — pattern problems are
//! configuration errors, never per-file surprises.

use std::fmt;

use regex::Regex;

use crate::error::SyncError;

// ---------------------------------------------------------------------------
// Pattern
// ---------------------------------------------------------------------------

/// One compiled path pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    re: Regex,
    source: String,
}

impl Pattern {
    /// Compile a regular-expression pattern, anchored at the path start.
    pub fn new(source: &str) -> Result<Self, SyncError> {
        let re = Regex::new(&format!("^(?:{source})")).map_err(|e| SyncError::Pattern {
            pattern: source.to_owned(),
            source: e,
        })?;
        Ok(Self {
            re,
            source: source.to_owned(),
        })
    }

    /// Compile a shell-glob pattern (`*`, `?`, `[…]`; wildcards never cross
    /// a `/`).
    pub fn glob(source: &str) -> Result<Self, SyncError> {
        let translated = glob_to_regex(source);
        let re = Regex::new(&format!("^(?:{translated})")).map_err(|e| SyncError::Pattern {
            pattern: source.to_owned(),
            source: e,
        })?;
        Ok(Self {
            re,
            source: source.to_owned(),
        })
    }

    /// The original pattern text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether this pattern selects the given relative path (always `/`
    /// separated, no leading slash).
    pub fn matches(&self, rel: &str) -> bool {
        match self.re.find(rel) {
            Some(m) => {
                let end = m.end();
                end == rel.len() || rel.as_bytes()[end] == b'/'
            }
            None => false,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.source.fmt(f)
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::new();
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                // Character classes pass through; `!` negation becomes `^`.
                // An unterminated class fails at compile time.
                out.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    out.push('^');
                }
                for inner in chars.by_ref() {
                    out.push(inner);
                    if inner == ']' {
                        break;
                    }
                }
            }
            other => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(other.encode_utf8(&mut buf)));
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// PatternSet
// ---------------------------------------------------------------------------

/// An ordered list of patterns combined with logical OR. Order is
/// irrelevant to matching semantics.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Compile every source as a regex pattern; the first malformed source
    /// fails the whole set.
    pub fn compile<I, S>(sources: I) -> Result<Self, SyncError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = sources
            .into_iter()
            .map(|s| Pattern::new(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn push(&mut self, pattern: Pattern) {
        self.patterns.push(pattern);
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether any pattern selects the relative path.
    pub fn matches(&self, rel: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(rel))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
