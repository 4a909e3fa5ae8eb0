use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::sync::Arc;
use tracing::trace;

use crate::errors::{ScourError, ScourResult};
use crate::results::MatchSpan;

const LITERAL_PATTERN_THRESHOLD: usize = 32;

static PATTERN_CACHE: Lazy<DashMap<String, PatternKind>> = Lazy::new(DashMap::new);

/// Strategy for pattern matching
#[derive(Debug, Clone)]
enum PatternKind {
    Literal(String),
    Regex(Arc<Regex>),
}

/// A compiled pattern: immutable after construction, cheap to clone.
///
/// Short patterns with no regex metacharacters use plain substring search;
/// everything else compiles to a regex honoring the case and multiline
/// flags. Compiled forms are shared through a global cache so repeated
/// constructions (one per search invocation) stay cheap.
#[derive(Debug, Clone)]
pub struct Pattern {
    kind: PatternKind,
    text: String,
}

impl Pattern {
    /// Compiles `text`. A malformed pattern fails here, before any file
    /// I/O happens.
    pub fn new(text: &str, ignore_case: bool, multiline: bool) -> ScourResult<Self> {
        let cache_key = format!("{}:{}:{}", ignore_case as u8, multiline as u8, text);

        let kind = if let Some(entry) = PATTERN_CACHE.get(&cache_key) {
            trace!("Pattern cache hit: {}", text);
            entry.clone()
        } else {
            let kind = if Self::is_literal(text) && !ignore_case {
                PatternKind::Literal(text.to_string())
            } else {
                let regex = RegexBuilder::new(text)
                    .case_insensitive(ignore_case)
                    .multi_line(multiline)
                    .build()
                    .map_err(|e| ScourError::invalid_pattern(e.to_string()))?;
                PatternKind::Regex(Arc::new(regex))
            };
            PATTERN_CACHE.insert(cache_key, kind.clone());
            kind
        };

        Ok(Self {
            kind,
            text: text.to_string(),
        })
    }

    /// The pattern text as given at construction.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Determines if a pattern can use plain substring matching
    fn is_literal(pattern: &str) -> bool {
        pattern.len() < LITERAL_PATTERN_THRESHOLD
            && !pattern.contains(|c: char| c.is_ascii_punctuation() && c != '_' && c != '-')
    }

    pub fn is_match(&self, text: &str) -> bool {
        match &self.kind {
            PatternKind::Literal(literal) => text.contains(literal.as_str()),
            PatternKind::Regex(regex) => regex.is_match(text),
        }
    }

    /// Finds all matches in `text`, left to right, non-overlapping.
    pub fn find_all(&self, text: &str) -> Vec<MatchSpan> {
        match &self.kind {
            PatternKind::Literal(literal) => text
                .match_indices(literal.as_str())
                .map(|(start, matched)| MatchSpan::new(matched, start))
                .collect(),
            PatternKind::Regex(regex) => regex
                .find_iter(text)
                .map(|m| MatchSpan::new(m.as_str(), m.start()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_matching() {
        let pattern = Pattern::new("test", false, false).unwrap();
        let text = "this is a test string with test pattern";
        let spans = pattern.find_all(text);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "test");
        assert_eq!(&text[spans[0].start..spans[0].start + spans[0].len], "test");
    }

    #[test]
    fn test_regex_matching() {
        let pattern = Pattern::new(r"\btest\w+", false, false).unwrap();
        let spans = pattern.find_all("testing tests tested");
        assert_eq!(spans.len(), 3);
    }

    #[test]
    fn test_spans_ordered() {
        let pattern = Pattern::new(r"\bt\w+", false, false).unwrap();
        let spans = pattern.find_all("two tests today");
        let mut prev_start = 0;
        for span in spans {
            assert!(span.start >= prev_start);
            prev_start = span.start;
        }
    }

    #[test]
    fn test_ignore_case() {
        let pattern = Pattern::new("todo", true, false).unwrap();
        assert!(pattern.is_match("TODO: fix"));
        assert!(pattern.is_match("Todo later"));

        let spans = pattern.find_all("TODO and todo");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "TODO");
        assert_eq!(spans[0].start, 0);
    }

    #[test]
    fn test_invalid_pattern_fails_at_construction() {
        let result = Pattern::new("(unclosed", false, false);
        assert!(matches!(result, Err(ScourError::InvalidPattern(_))));
    }

    #[test]
    fn test_is_literal() {
        assert!(Pattern::is_literal("test"));
        assert!(Pattern::is_literal("hello_world"));
        assert!(!Pattern::is_literal(r"\btest\w+"));
        assert!(!Pattern::is_literal("test.*pattern"));
    }
}
