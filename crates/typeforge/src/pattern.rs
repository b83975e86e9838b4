//! Pattern-matching collaborator used to validate generated examples.

use dashmap::DashMap;
use regex::Regex;
use tracing::warn;

/// Whole-value pattern matching.
///
/// Implementations must be thread-safe (Send + Sync) so one matcher can be
/// shared by concurrent generation requests.
pub trait PatternMatcher: Send + Sync {
    /// Whether `pattern` is usable at all.
    fn is_valid(&self, pattern: &str) -> bool;

    /// Whether `text` matches `pattern` in its entirety.
    ///
    /// An invalid pattern never matches.
    fn matches(&self, pattern: &str, text: &str) -> bool;
}

/// [`PatternMatcher`] backed by the `regex` crate.
///
/// Patterns are anchored at both ends so a match always covers the whole
/// value, and compiled patterns are cached by source text.
#[derive(Default)]
pub struct RegexMatcher {
    compiled: DashMap<String, Option<Regex>>,
}

impl RegexMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn compile(&self, pattern: &str) -> Option<Regex> {
        if let Some(cached) = self.compiled.get(pattern) {
            return cached.clone();
        }
        let compiled = match Regex::new(&format!(r"\A(?:{})\z", pattern)) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Invalid regex pattern '{}': {}", pattern, e);
                None
            }
        };
        self.compiled.insert(pattern.to_string(), compiled.clone());
        compiled
    }
}

impl PatternMatcher for RegexMatcher {
    fn is_valid(&self, pattern: &str) -> bool {
        !pattern.trim().is_empty() && self.compile(pattern).is_some()
    }

    fn matches(&self, pattern: &str, text: &str) -> bool {
        self.compile(pattern)
            .map(|re| re.is_match(text))
            .unwrap_or(false)
    }
}

/// Whether `text` matches any of `patterns`.
pub fn matches_any(matcher: &dyn PatternMatcher, patterns: &[String], text: &str) -> bool {
    patterns.iter().any(|p| matcher.matches(p, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_is_anchored() {
        let m = RegexMatcher::new();
        assert!(m.matches("[A-Z][a-z]+", "Maria"));
        assert!(!m.matches("[A-Z][a-z]+", "Maria123"));
        assert!(!m.matches("[A-Z][a-z]+", "xMaria"));
    }

    #[test]
    fn test_explicit_anchors_still_work() {
        let m = RegexMatcher::new();
        assert!(m.matches("^[A-Z][a-z]+$", "Maria"));
        assert!(!m.matches("^[A-Z][a-z]+$", "123"));
    }

    #[test]
    fn test_alternation_is_grouped() {
        let m = RegexMatcher::new();
        assert!(!m.matches("a|b", "ab"));
        assert!(m.matches("a|b", "b"));
    }

    #[test]
    fn test_invalid_pattern_never_matches() {
        let m = RegexMatcher::new();
        assert!(!m.is_valid("([a-z"));
        assert!(!m.matches("([a-z", "abc"));
        assert!(!m.is_valid("   "));
    }

    #[test]
    fn test_matches_any() {
        let m = RegexMatcher::new();
        let patterns = vec!["(?i).*first.*".to_string(), "(?i)fname".to_string()];
        assert!(matches_any(&m, &patterns, "First_Name"));
        assert!(matches_any(&m, &patterns, "FNAME"));
        assert!(!matches_any(&m, &patterns, "surname"));
    }
}
