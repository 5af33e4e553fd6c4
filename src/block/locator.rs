use crate::edit::{Document, EditError, TargetFile};
use crate::scan::{scan, Direction, PatternList};
use std::path::Path;

/// Text standing in for end-of-file when matching a lower boundary.
const EOF_SENTINEL: &str = "EOF";

/// What a block must contain.
#[derive(Debug, Clone)]
pub enum Marker {
    /// Zero-based line index.
    Line(usize),
    /// Patterns that must match consecutive lines.
    Patterns(PatternList),
}

/// Resolved position of a block.
///
/// `start_line` is the first line of the upper boundary. `end_line` is the
/// first line of the lower boundary, or the line count when the block runs to
/// end-of-file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub start_line: usize,
    pub end_line: usize,
    /// Lines taken by the upper boundary (at least the start line).
    pub upper_lines: usize,
    /// Lines taken by the lower boundary; zero at end-of-file.
    pub lower_lines: usize,
}

impl BlockSpan {
    /// First line after the upper boundary.
    pub fn interior_start(&self) -> usize {
        (self.start_line + self.upper_lines).min(self.end_line)
    }

    /// One past the last line of the lower boundary.
    pub fn block_end(&self, line_count: usize) -> usize {
        (self.end_line + self.lower_lines).min(line_count)
    }

    /// The block including both boundaries.
    pub fn text<S: AsRef<str>>(&self, lines: &[S]) -> String {
        join(&lines[self.start_line..self.block_end(lines.len())])
    }

    /// The block without its boundaries.
    pub fn inner_text<S: AsRef<str>>(&self, lines: &[S]) -> String {
        let end = self.end_line.min(lines.len());
        let start = self.interior_start().min(end);
        join(&lines[start..end])
    }
}

fn join<S: AsRef<str>>(lines: &[S]) -> String {
    lines
        .iter()
        .map(|line| line.as_ref())
        .collect::<Vec<&str>>()
        .join("\n")
}

/// A block found in a file, together with the file's lines.
#[derive(Debug, Clone)]
pub struct LocatedBlock {
    pub text: String,
    pub span: BlockSpan,
    pub document: Document,
}

/// Locate the first block whose marker sits at or after `resume_from`.
///
/// The upper boundary is searched upward from the marker line (inclusive),
/// the lower boundary downward from the line after it. Any failed search
/// yields `None`.
pub fn locate<S: AsRef<str>>(
    lines: &[S],
    upper_bound: &PatternList,
    lower_bound: &PatternList,
    marker: &Marker,
    resume_from: usize,
) -> Option<BlockSpan> {
    let line_count = lines.len();
    let marker_line = match marker {
        Marker::Line(idx) => Some(*idx).filter(|&idx| idx >= resume_from && idx < line_count),
        Marker::Patterns(patterns) => {
            scan(lines, patterns, resume_from, line_count, Direction::Forward)
                .map(|found| found.line_index)
        }
    }?;

    let (start_line, upper_lines) = if marker_line == 0 || upper_bound.is_empty() {
        (marker_line, 1)
    } else {
        let found = scan(lines, upper_bound, marker_line, line_count, Direction::Backward)?;
        (found.line_index, upper_bound.len())
    };

    let (end_line, lower_lines) = if marker_line + 1 == line_count {
        (line_count, 0)
    } else {
        match scan(
            lines,
            lower_bound,
            marker_line + 1,
            line_count,
            Direction::Forward,
        ) {
            Some(found) => (found.line_index, lower_bound.len()),
            None if accepts_eof(lower_bound) => (line_count, 0),
            None => return None,
        }
    };

    Some(BlockSpan {
        start_line,
        end_line,
        upper_lines,
        lower_lines,
    })
}

fn accepts_eof(lower_bound: &PatternList) -> bool {
    lower_bound
        .first()
        .is_some_and(|pattern| pattern.is_match(EOF_SENTINEL))
}

/// Read `path` and locate a block in it.
pub fn locate_in_file(
    path: impl AsRef<Path>,
    upper_bound: &PatternList,
    lower_bound: &PatternList,
    marker: &Marker,
    resume_from: usize,
) -> Result<Option<LocatedBlock>, EditError> {
    let document = TargetFile::open(path)?.read_document()?;
    let located = locate(
        document.lines(),
        upper_bound,
        lower_bound,
        marker,
        resume_from,
    )
    .map(|span| LocatedBlock {
        text: span.text(document.lines()),
        span,
        document,
    });
    Ok(located)
}
