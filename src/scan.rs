//! Multi-line pattern scanning.
//!
//! A [`PatternList`] matches when its first pattern matches some line and
//! each following pattern matches the next line down. [`scan`] walks the
//! candidate start lines in either direction, but confirmation of the
//! trailing patterns always reads forward through the document.

use crate::edit::{compile_pattern, EditError};
use regex::Regex;

/// An ordered list of compiled patterns matched against consecutive lines.
///
/// Compiled once per request and passed explicitly into [`scan`].
#[derive(Debug, Clone, Default)]
pub struct PatternList {
    patterns: Vec<Regex>,
}

impl PatternList {
    /// Compile every pattern, failing on the first invalid one.
    pub fn new<I, S>(patterns: I) -> Result<Self, EditError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| compile_pattern(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn from_regexes(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn first(&self) -> Option<&Regex> {
        self.patterns.first()
    }

    pub fn as_slice(&self) -> &[Regex] {
        &self.patterns
    }

    /// Check whether the whole list matches starting at `idx`, without
    /// reading at or past `max_line`.
    fn confirms_at<S: AsRef<str>>(&self, lines: &[S], idx: usize, max_line: usize) -> bool {
        if idx + self.patterns.len() > max_line {
            return false;
        }
        self.patterns
            .iter()
            .zip(&lines[idx..])
            .all(|(pattern, line)| pattern.is_match(line.as_ref()))
    }
}

/// Which way candidate start lines are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// A confirmed multi-line match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Index of the line matched by the first pattern.
    pub line_index: usize,
    /// Text of that line.
    pub line_text: String,
}

/// Find the first line, visiting from `start_line` in `direction`, where the
/// whole pattern list matches.
///
/// Only lines below `max_line` (clamped to the document length) are
/// considered, both as candidates and for confirmation. A candidate whose
/// confirmation would run past `max_line` is skipped and scanning goes on.
/// Returns `None` for an empty pattern list.
pub fn scan<S: AsRef<str>>(
    lines: &[S],
    patterns: &PatternList,
    start_line: usize,
    max_line: usize,
    direction: Direction,
) -> Option<PatternMatch> {
    let first = patterns.first()?;
    let max_line = max_line.min(lines.len());

    let confirmed = |idx: usize| {
        first.is_match(lines[idx].as_ref()) && patterns.confirms_at(lines, idx, max_line)
    };

    let found = match direction {
        Direction::Forward => (start_line..max_line).find(|&idx| confirmed(idx)),
        Direction::Backward => {
            if start_line >= max_line {
                None
            } else {
                (0..=start_line).rev().find(|&idx| confirmed(idx))
            }
        }
    }?;

    Some(PatternMatch {
        line_index: found,
        line_text: lines[found].as_ref().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<&str> {
        text.split('\n').collect()
    }

    #[test]
    fn test_single_pattern_forward() {
        let doc = lines("a\nkey: 1\nb\nkey: 2");
        let patterns = PatternList::new(["^key"]).unwrap();
        let found = scan(&doc, &patterns, 0, doc.len(), Direction::Forward).unwrap();
        assert_eq!(found.line_index, 1);
        assert_eq!(found.line_text, "key: 1");
    }

    #[test]
    fn test_start_line_skips_earlier_matches() {
        let doc = lines("a\nkey: 1\nb\nkey: 2");
        let patterns = PatternList::new(["^key"]).unwrap();
        let found = scan(&doc, &patterns, 2, doc.len(), Direction::Forward).unwrap();
        assert_eq!(found.line_index, 3);
    }

    #[test]
    fn test_multi_pattern_requires_consecutive_lines() {
        let doc = lines("start\nx\nstart\nbody\nend");
        let patterns = PatternList::new(["^start$", "^body$"]).unwrap();
        let found = scan(&doc, &patterns, 0, doc.len(), Direction::Forward).unwrap();
        assert_eq!(found.line_index, 2);
    }

    #[test]
    fn test_backward_finds_nearest_above() {
        let doc = lines("[a]\nx\n[b]\ny\nmarker");
        let patterns = PatternList::new([r"^\["]).unwrap();
        let found = scan(&doc, &patterns, 4, doc.len(), Direction::Backward).unwrap();
        assert_eq!(found.line_index, 2);
    }

    #[test]
    fn test_backward_confirms_forward() {
        // Scanning up from line 3, the two-line pattern is confirmed by
        // reading down from each candidate, so the match starts at line 1.
        let doc = lines("top\nhead\nbody\nmarker");
        let patterns = PatternList::new(["^head$", "^body$"]).unwrap();
        let found = scan(&doc, &patterns, 3, doc.len(), Direction::Backward).unwrap();
        assert_eq!(found.line_index, 1);
    }

    #[test]
    fn test_confirmation_past_max_line_continues_scanning() {
        let doc = lines("a\nb\na\nb");
        let patterns = PatternList::new(["^a$", "^b$"]).unwrap();
        // The candidate at index 2 cannot be confirmed inside max_line = 3.
        assert!(scan(&doc, &patterns, 2, 3, Direction::Forward).is_none());
        // Scanning backward from it still finds the complete match at 0.
        let found = scan(&doc, &patterns, 2, 3, Direction::Backward).unwrap();
        assert_eq!(found.line_index, 0);
    }

    #[test]
    fn test_empty_pattern_list_never_matches() {
        let doc = lines("a\nb");
        let patterns = PatternList::default();
        assert!(scan(&doc, &patterns, 0, doc.len(), Direction::Forward).is_none());
    }

    #[test]
    fn test_start_beyond_document() {
        let doc = lines("a\nb");
        let patterns = PatternList::new(["a"]).unwrap();
        assert!(scan(&doc, &patterns, 5, doc.len(), Direction::Forward).is_none());
        assert!(scan(&doc, &patterns, 5, doc.len(), Direction::Backward).is_none());
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let result = PatternList::new(["ok", "(unclosed"]);
        assert!(matches!(result, Err(EditError::InvalidPattern { pattern, .. }) if pattern == "(unclosed"));
    }
}
