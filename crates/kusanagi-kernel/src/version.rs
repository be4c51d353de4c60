//! Version pattern matching.
//!
//! Gateways address services by version patterns where `*` stands for a
//! single version part, or for any suffix when it ends the pattern
//! (`"1.*.*"`, `"1.*"`). Resolution against a set of known versions picks
//! the highest match using the framework comparison rules rather than plain
//! semver ordering.

use regex::Regex;
use std::cmp::Ordering;

/// Characters allowed in a version or version pattern.
const VALID_CHARS: &str = r"[a-zA-Z0-9*.,_-]+";

/// A version pattern that can match and resolve concrete versions.
#[derive(Debug, Clone)]
pub struct Version {
    pattern: String,
    regex: Option<Regex>,
}

impl Version {
    /// Create a version pattern.
    ///
    /// Patterns holding characters outside `[A-Za-z0-9*.,_-]` never match.
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            regex: compile_pattern(pattern),
        }
    }

    /// The raw pattern string.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check whether a concrete version matches this pattern.
    pub fn matches(&self, version: &str) -> bool {
        if !is_valid(version) {
            return false;
        }
        match &self.regex {
            Some(regex) => regex.is_match(version),
            // Invalid patterns never match.
            None => false,
        }
    }

    /// Resolve the highest version among `candidates` that matches this
    /// pattern. Returns `None` when no candidate matches.
    pub fn resolve<S: AsRef<str>>(&self, candidates: &[S]) -> Option<String> {
        candidates
            .iter()
            .map(|c| c.as_ref())
            .filter(|c| self.matches(c))
            .max_by(|a, b| compare_versions(a, b))
            .map(|v| v.to_string())
    }
}

fn is_valid(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || "*.,_-".contains(c))
}

/// Compile a pattern into an anchored regex, collapsing `*` runs. A `*` in
/// the middle matches a single part (`[^*.]+`); a trailing `*` matches any
/// suffix.
fn compile_pattern(pattern: &str) -> Option<Regex> {
    if !is_valid(pattern) {
        return None;
    }

    // Collapse runs of consecutive wildcards into one.
    let mut collapsed = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c == '*' && collapsed.ends_with('*') {
            continue;
        }
        collapsed.push(c);
    }

    let mut expr = String::from("^");
    let last = collapsed.len();
    for (i, c) in collapsed.char_indices() {
        match c {
            '*' if i + 1 == last => expr.push_str(".*"),
            '*' => expr.push_str("[^*.]+"),
            '.' => expr.push_str(r"\."),
            other => expr.push(other),
        }
    }
    expr.push('$');
    Regex::new(&expr).ok()
}

/// Compare two versions for resolution ordering.
///
/// Versions compare dot segment by dot segment and, inside a segment,
/// hyphen subpart by hyphen subpart. Numeric subparts outrank
/// non-numeric ones. When one side is a strict prefix of the other, the
/// shorter side is the greater version (`1.2` > `1.2.0-alpha`).
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left: Vec<&str> = a.split('.').collect();
    let right: Vec<&str> = b.split('.').collect();

    for (ls, rs) in left.iter().zip(right.iter()) {
        let ordering = compare_segments(ls, rs);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    // Shared prefix: fewer segments wins.
    right.len().cmp(&left.len())
}

fn compare_segments(a: &str, b: &str) -> Ordering {
    let left: Vec<&str> = a.split('-').collect();
    let right: Vec<&str> = b.split('-').collect();

    for (ls, rs) in left.iter().zip(right.iter()) {
        let ordering = match (ls.parse::<u64>(), rs.parse::<u64>()) {
            (Ok(ln), Ok(rn)) => ln.cmp(&rn),
            // Integer subparts outrank string subparts.
            (Ok(_), Err(_)) => Ordering::Greater,
            (Err(_), Ok(_)) => Ordering::Less,
            (Err(_), Err(_)) => ls.cmp(rs),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    right.len().cmp(&left.len())
}
