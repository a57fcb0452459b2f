//! Glob matching of topics against subscription patterns.
//!
//! `*` matches zero or more arbitrary bytes, including `.` separators, so
//! `sensor.*` matches `sensor.kitchen.temp`. Every other byte matches
//! itself, case-sensitively.
//!
//! Matching backtracks recursively. Depth is bounded by the subject length
//! times the number of wildcards, which is fine for the short topics this
//! crate carries but is not capped.

use serde::{Deserialize, Serialize};
use std::fmt;

const WILDCARD: u8 = b'*';

/// Match `subject` against `pattern`. An absent subject never matches.
pub fn glob_match(subject: Option<&str>, pattern: &str) -> bool {
    match subject {
        Some(subject) => match_bytes(subject.as_bytes(), pattern.as_bytes()),
        None => false,
    }
}

fn match_bytes(mut subject: &[u8], mut pattern: &[u8]) -> bool {
    // Literal prefix.
    loop {
        match (pattern.split_first(), subject.split_first()) {
            (Some((&WILDCARD, _)), _) => break,
            (None, None) => return true,
            (None, Some(_)) | (Some(_), None) => return false,
            (Some((p, rest_p)), Some((s, rest_s))) => {
                if p != s {
                    return false;
                }
                pattern = rest_p;
                subject = rest_s;
            }
        }
    }

    while let Some((&WILDCARD, rest)) = pattern.split_first() {
        pattern = rest;
    }

    // Trailing wildcard swallows whatever is left.
    if pattern.is_empty() {
        return true;
    }

    (0..=subject.len()).any(|skip| match_bytes(&subject[skip..], pattern))
}

/// A subscription pattern.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pattern(String);

impl Pattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Pattern(pattern.into())
    }

    /// Whether `topic` satisfies this pattern.
    pub fn matches(&self, topic: &str) -> bool {
        match_bytes(topic.as_bytes(), self.0.as_bytes())
    }

    /// True if the pattern contains no wildcard.
    pub fn is_literal(&self) -> bool {
        !self.0.as_bytes().contains(&WILDCARD)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.0)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Pattern::new(s)
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        Pattern(s)
    }
}
