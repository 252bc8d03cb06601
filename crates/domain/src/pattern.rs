//! Id patterns: exact ids or `*` wildcards, compiled once and matched often.
//!
//! A pattern without `*` matches by string equality. A pattern with `*`
//! matches the whole id, where each `*` stands for any (possibly empty)
//! sequence of characters: `zone.*` matches `zone.3.switch`, `*.switch`
//! matches `zone.3.switch`, `zone.*.switch` matches `zone.3.switch`.

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::error::PatternError;

const WILDCARD: char = '*';
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// A compiled id pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    Exact,
    Wildcard(Regex),
    Never,
}

impl Pattern {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Empty`] for an empty pattern, or
    /// [`PatternError::Invalid`] when the generated expression cannot be
    /// compiled.
    pub fn compile(source: &str) -> Result<Self, PatternError> {
        if source.is_empty() {
            return Err(PatternError::Empty);
        }
        if !source.contains(WILDCARD) {
            return Ok(Self {
                source: source.to_string(),
                matcher: Matcher::Exact,
            });
        }

        let body = source
            .split(WILDCARD)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = RegexBuilder::new(&format!("^{body}$"))
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
            .map_err(|err| PatternError::Invalid {
                pattern: source.to_string(),
                reason: err.to_string(),
            })?;

        Ok(Self {
            source: source.to_string(),
            matcher: Matcher::Wildcard(regex),
        })
    }

    /// A pattern that keeps its source text but never matches anything.
    #[must_use]
    pub fn never(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            matcher: Matcher::Never,
        }
    }

    /// Whether `id` is matched by this pattern.
    #[must_use]
    pub fn matches(&self, id: &str) -> bool {
        match &self.matcher {
            Matcher::Exact => self.source == id,
            Matcher::Wildcard(regex) => regex.is_match(id),
            Matcher::Never => false,
        }
    }

    /// The text the pattern was compiled from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self.matcher, Matcher::Wildcard(_))
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_match_exact_id_only() {
        let pattern = Pattern::compile("zone.3.switch").unwrap();
        assert!(!pattern.is_wildcard());
        assert!(pattern.matches("zone.3.switch"));
        assert!(!pattern.matches("zone.3.switch.extra"));
        assert!(!pattern.matches("zone.3"));
    }

    #[test]
    fn should_match_trailing_wildcard() {
        let pattern = Pattern::compile("zone.*").unwrap();
        assert!(pattern.is_wildcard());
        assert!(pattern.matches("zone.3.switch"));
        assert!(pattern.matches("zone."));
        assert!(!pattern.matches("zones.3"));
    }

    #[test]
    fn should_match_leading_and_inner_wildcards() {
        assert!(Pattern::compile("*.switch").unwrap().matches("zone.3.switch"));
        assert!(Pattern::compile("zone.*.switch").unwrap().matches("zone.3.switch"));
        assert!(!Pattern::compile("zone.*.switch").unwrap().matches("zone.3.level"));
    }

    #[test]
    fn should_match_everything_with_lone_wildcard() {
        let pattern = Pattern::compile("*").unwrap();
        assert!(pattern.matches("anything.at.all"));
        assert!(pattern.matches(""));
    }

    #[test]
    fn should_treat_regex_metacharacters_literally() {
        let pattern = Pattern::compile("a+b.(c)*").unwrap();
        assert!(pattern.matches("a+b.(c)d"));
        assert!(!pattern.matches("aab.(c)d"));
        assert!(!pattern.matches("a+bx(c)d"));
    }

    #[test]
    fn should_reject_empty_pattern() {
        assert_eq!(Pattern::compile("").unwrap_err(), PatternError::Empty);
    }

    #[test]
    fn should_never_match_with_never_pattern() {
        let pattern = Pattern::never("zone.*");
        assert!(!pattern.matches("zone.1"));
        assert_eq!(pattern.as_str(), "zone.*");
    }

    #[test]
    fn should_compare_by_source_text() {
        assert_eq!(
            Pattern::compile("zone.*").unwrap(),
            Pattern::never("zone.*")
        );
    }
}
