// src/version.rs

//! Natural version ordering
//!
//! Version strings are split into alternating runs of digits and non-digits.
//! Digit runs compare numerically (so `1.10 > 1.9`), non-digit runs compare
//! lexicographically. When one version is a run-level prefix of the other,
//! the longer one wins unless its first extra run contains a letter, which
//! marks a pre-release suffix: `1.2.1 > 1.2`, but `2.0-rc1 < 2.0`.
//!
//! The ordering is total: every pair of strings compares, and equality means
//! the run sequences are identical.

use std::cmp::Ordering;
use std::fmt;

/// A version string carrying the natural ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version(String);

impl Version {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare two raw version strings without constructing `Version`s.
    pub fn compare(a: &str, b: &str) -> Ordering {
        let ta = tokenize(a);
        let tb = tokenize(b);

        for (x, y) in ta.iter().zip(tb.iter()) {
            let ord = match (x, y) {
                (Token::Digits(da), Token::Digits(db)) => compare_digits(da, db),
                (Token::Text(sa), Token::Text(sb)) => sa.cmp(sb),
                // Mixed kinds at the same position: a digit run sorts after
                // text, keeping the order deterministic for odd inputs.
                (Token::Digits(_), Token::Text(_)) => Ordering::Greater,
                (Token::Text(_), Token::Digits(_)) => Ordering::Less,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }

        match ta.len().cmp(&tb.len()) {
            Ordering::Equal => Ordering::Equal,
            Ordering::Less => suffix_ordering(&tb[ta.len()]).reverse(),
            Ordering::Greater => suffix_ordering(&ta[tb.len()]),
        }
    }
}

/// Ordering of the version that has `extra` as its first unmatched run,
/// relative to its run-level prefix. A suffix containing a letter is a
/// pre-release marker (`-rc1`, `a`, `beta`) and sorts below the bare
/// version; anything else (`.1`, more digits) sorts above it.
fn suffix_ordering(extra: &Token) -> Ordering {
    match extra {
        Token::Digits(_) => Ordering::Greater,
        Token::Text(s) => {
            if s.chars().any(|c| c.is_ascii_alphabetic()) {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
    }
}

/// Compare digit runs numerically without overflow: strip leading zeros,
/// then longer wins, then lexicographic.
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn tokenize(s: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let bytes = s.as_bytes();
    let mut start = 0;

    while start < bytes.len() {
        let digit = bytes[start].is_ascii_digit();
        let mut end = start + 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() == digit {
            end += 1;
        }
        let run = &s[start..end];
        tokens.push(if digit {
            Token::Digits(run)
        } else {
            Token::Text(run)
        });
        start = end;
    }

    tokens
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        Version::compare(&self.0, &other.0)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(a: &str, b: &str) -> Ordering {
        Version::compare(a, b)
    }

    #[test]
    fn test_numeric_runs() {
        assert_eq!(cmp("1.10", "1.9"), Ordering::Greater);
        assert_eq!(cmp("1.2", "1.2"), Ordering::Equal);
        assert_eq!(cmp("2.0", "10.0"), Ordering::Less);
        assert_eq!(cmp("1.02", "1.2"), Ordering::Equal);
    }

    #[test]
    fn test_prerelease_suffix() {
        assert_eq!(cmp("2.0-rc1", "2.0"), Ordering::Less);
        assert_eq!(cmp("2.0", "2.0-rc1"), Ordering::Greater);
        assert_eq!(cmp("2.0-rc1", "2.0-rc2"), Ordering::Less);
    }

    #[test]
    fn test_longer_numeric_tail_wins() {
        assert_eq!(cmp("1.2.1", "1.2"), Ordering::Greater);
        assert_eq!(cmp("1.2", "1.2.1"), Ordering::Less);
    }

    #[test]
    fn test_huge_components() {
        // Beyond u64; length-then-lex comparison keeps this exact.
        assert_eq!(
            cmp("1.184467440737095516160", "1.184467440737095516159"),
            Ordering::Greater
        );
    }

    #[test]
    fn test_totality_and_antisymmetry() {
        let samples = [
            "", "1", "1.0", "1.0.0", "1.10", "1.9", "2.0", "2.0-rc1", "2.0-rc2",
            "1.2.3-4", "0.1", "a", "1a", "a1", "3.14beta2",
        ];
        for a in samples {
            for b in samples {
                let ab = cmp(a, b);
                let ba = cmp(b, a);
                assert_eq!(ab, ba.reverse(), "antisymmetry failed for {a} vs {b}");
                if a == b {
                    assert_eq!(ab, Ordering::Equal);
                }
            }
        }
    }

    #[test]
    fn test_transitivity_sample() {
        let mut versions: Vec<Version> = ["2.0-rc1", "1.9", "2.0", "1.10", "1.2.1", "1.2"]
            .iter()
            .map(|s| Version::new(*s))
            .collect();
        versions.sort();
        let order: Vec<&str> = versions.iter().map(|v| v.as_str()).collect();
        assert_eq!(order, vec!["1.2", "1.2.1", "1.9", "1.10", "2.0-rc1", "2.0"]);
    }
}
