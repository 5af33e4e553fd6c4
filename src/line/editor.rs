use crate::edit::{compile_pattern, Document, EditError, TargetFile};
use crate::line::capture::{self, Groups};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

/// Anchor text meaning "start of file".
pub const BOF_ANCHOR: &str = "BOF";
/// Anchor text meaning "end of file".
pub const EOF_ANCHOR: &str = "EOF";

/// What to do with the matched line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineState {
    /// Make sure the line exists.
    #[default]
    Present,
    /// Remove matching lines.
    Absent,
    /// Report matching lines without writing.
    Print,
}

/// A single-line edit.
///
/// The primary locator is `line_number`, else `search_string`, else
/// `regexp`. `insert_after`/`insert_before` are consulted only when the
/// locator finds nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineEditRequest {
    pub insert_after: Option<String>,
    pub insert_before: Option<String>,
    /// Desired line; may contain `$N` placeholders in regexp mode.
    pub line: String,
    /// 1-based.
    pub line_number: Option<usize>,
    pub regexp: Option<String>,
    pub search_string: Option<String>,
    pub state: LineState,
    pub backup: bool,
    pub replace_all: bool,
}

impl LineEditRequest {
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            ..Self::default()
        }
    }

    pub fn search_string(mut self, search: impl Into<String>) -> Self {
        self.search_string = Some(search.into());
        self
    }

    pub fn regexp(mut self, pattern: impl Into<String>) -> Self {
        self.regexp = Some(pattern.into());
        self
    }

    pub fn line_number(mut self, line_number: usize) -> Self {
        self.line_number = Some(line_number);
        self
    }

    pub fn insert_after(mut self, pattern: impl Into<String>) -> Self {
        self.insert_after = Some(pattern.into());
        self
    }

    pub fn insert_before(mut self, pattern: impl Into<String>) -> Self {
        self.insert_before = Some(pattern.into());
        self
    }

    pub fn state(mut self, state: LineState) -> Self {
        self.state = state;
        self
    }

    pub fn backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    pub fn replace_all(mut self, replace_all: bool) -> Self {
        self.replace_all = replace_all;
        self
    }

    /// Reject mutually exclusive options.
    pub fn validate(&self) -> Result<(), EditError> {
        if self.search_string.is_some() && self.regexp.is_some() {
            return Err(EditError::ConflictingOptions {
                first: "search_string",
                second: "regexp",
            });
        }
        if self.insert_after.is_some() && self.insert_before.is_some() {
            return Err(EditError::ConflictingOptions {
                first: "insert_after",
                second: "insert_before",
            });
        }
        if self.line_number.is_some() && self.regexp.is_some() {
            return Err(EditError::ConflictingOptions {
                first: "line_number",
                second: "regexp",
            });
        }
        Ok(())
    }

    fn compile(&self) -> Result<CompiledRequest<'_>, EditError> {
        self.validate()?;

        let locator = if let Some(number) = self.line_number {
            Locator::LineNumber(number)
        } else if let Some(search) = &self.search_string {
            Locator::Substring(search.as_str())
        } else if let Some(pattern) = &self.regexp {
            Locator::Regex(compile_pattern(pattern)?)
        } else {
            Locator::Nothing
        };

        let anchor = match (&self.insert_after, &self.insert_before) {
            (Some(pattern), _) => Anchor::After(AnchorPattern::parse(pattern)?),
            (None, Some(pattern)) => Anchor::Before(AnchorPattern::parse(pattern)?),
            (None, None) => Anchor::End,
        };

        Ok(CompiledRequest { locator, anchor })
    }
}

enum Locator<'r> {
    LineNumber(usize),
    Substring(&'r str),
    Regex(Regex),
    Nothing,
}

enum AnchorPattern {
    Bof,
    Eof,
    Regex(Regex),
}

impl AnchorPattern {
    fn parse(pattern: &str) -> Result<Self, EditError> {
        Ok(match pattern {
            BOF_ANCHOR => AnchorPattern::Bof,
            EOF_ANCHOR => AnchorPattern::Eof,
            _ => AnchorPattern::Regex(compile_pattern(pattern)?),
        })
    }
}

enum Anchor {
    After(AnchorPattern),
    Before(AnchorPattern),
    End,
}

impl Anchor {
    /// Where a new line goes. An anchor that matches nothing falls back to
    /// end-of-file; with several matches the last one is used.
    fn insertion_index(&self, lines: &[String]) -> usize {
        let len = lines.len();
        let last_match = |re: &Regex| lines.iter().rposition(|line| re.is_match(line));
        match self {
            Anchor::End => len,
            Anchor::After(AnchorPattern::Bof) | Anchor::Before(AnchorPattern::Bof) => 0,
            Anchor::After(AnchorPattern::Eof) | Anchor::Before(AnchorPattern::Eof) => len,
            Anchor::After(AnchorPattern::Regex(re)) => last_match(re).map_or(len, |idx| idx + 1),
            Anchor::Before(AnchorPattern::Regex(re)) => last_match(re).unwrap_or(len),
        }
    }
}

struct CompiledRequest<'r> {
    locator: Locator<'r>,
    anchor: Anchor,
}

/// Result of a line edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use = "LineOutcome reports whether the file changed"]
pub struct LineOutcome {
    pub changed: bool,
    /// Lines selected for removal (absent) or reporting (print), by
    /// zero-based index.
    pub matched_lines: BTreeMap<usize, String>,
}

impl LineOutcome {
    fn unchanged() -> Self {
        Self::default()
    }
}

/// Apply `request` to an in-memory document.
///
/// In print mode the document is left untouched and `changed` is false.
pub fn edit_lines(
    document: &mut Document,
    request: &LineEditRequest,
) -> Result<LineOutcome, EditError> {
    let compiled = request.compile()?;
    let line = request.line.as_str();
    let lines = document.lines();

    let mut index_list: Vec<usize> = Vec::new();
    let mut existing: BTreeSet<usize> = BTreeSet::new();
    let mut captures: BTreeMap<usize, Groups> = BTreeMap::new();

    // Records lines already equal to the desired one. Returns true when the
    // request is already satisfied.
    let mut note_existing = |idx: usize, text: &str| {
        if text != line {
            return false;
        }
        if request.state == LineState::Present {
            return true;
        }
        if !line.is_empty() {
            existing.insert(idx);
        }
        false
    };

    match &compiled.locator {
        Locator::LineNumber(number) => {
            if *number == 0 || *number > lines.len() {
                return Err(EditError::LineNumberOutOfRange {
                    line_number: *number,
                    line_count: lines.len(),
                });
            }
            let idx = number - 1;
            if request.state == LineState::Present && lines[idx] == line {
                return Ok(LineOutcome::unchanged());
            }
            index_list.push(idx);
        }
        Locator::Substring(_) | Locator::Nothing => {
            for (idx, text) in lines.iter().enumerate() {
                if let Locator::Substring(search) = &compiled.locator {
                    if text.contains(search) {
                        index_list.push(idx);
                    }
                }
                if note_existing(idx, text) {
                    return Ok(LineOutcome::unchanged());
                }
            }
        }
        Locator::Regex(re) => {
            for (idx, text) in lines.iter().enumerate() {
                if let Some(caps) = re.captures(text) {
                    index_list.push(idx);
                    captures.insert(idx, capture::groups(&caps));
                }
            }
            if index_list.is_empty() {
                for (idx, text) in lines.iter().enumerate() {
                    if note_existing(idx, text) {
                        return Ok(LineOutcome::unchanged());
                    }
                }
                // A regexp alone never adds a line; that needs an anchor.
                if request.state == LineState::Present && matches!(compiled.anchor, Anchor::End)
                {
                    return Ok(LineOutcome::unchanged());
                }
            }
        }
    }

    let content_match = !index_list.is_empty();

    match request.state {
        LineState::Absent | LineState::Print => {
            let mut selected: BTreeMap<usize, String> = existing
                .iter()
                .map(|&idx| (idx, lines[idx].clone()))
                .collect();
            if content_match {
                for &idx in &index_list {
                    selected.insert(idx, lines[idx].clone());
                }
            }

            if request.state == LineState::Print || selected.is_empty() {
                return Ok(LineOutcome {
                    changed: false,
                    matched_lines: selected,
                });
            }

            // Removal is by value: every line equal to a selected line goes.
            let values: HashSet<&str> = selected.values().map(String::as_str).collect();
            let kept: Vec<String> = lines
                .iter()
                .filter(|text| !values.contains(text.as_str()))
                .cloned()
                .collect();
            let changed = kept.len() != lines.len();
            *document.lines_mut() = kept;

            Ok(LineOutcome {
                changed,
                matched_lines: selected,
            })
        }
        LineState::Present if content_match => {
            let targets: &[usize] = if request.replace_all {
                &index_list
            } else {
                std::slice::from_ref(index_list.last().unwrap_or(&0))
            };

            let replacements: Vec<(usize, String)> = targets
                .iter()
                .map(|&idx| {
                    let new_line = match captures.get(&idx) {
                        Some(groups) => capture::expand(line, groups),
                        None => line.to_string(),
                    };
                    (idx, new_line)
                })
                .collect();

            let lines = document.lines_mut();
            let mut changed = false;
            for (idx, new_line) in replacements {
                if lines[idx] != new_line {
                    lines[idx] = new_line;
                    changed = true;
                }
            }

            Ok(LineOutcome {
                changed,
                matched_lines: BTreeMap::new(),
            })
        }
        LineState::Present => {
            if document.is_blank() {
                *document.lines_mut() = vec![line.to_string()];
            } else {
                let position = compiled.anchor.insertion_index(lines);
                document.lines_mut().insert(position, line.to_string());
            }
            Ok(LineOutcome {
                changed: true,
                matched_lines: BTreeMap::new(),
            })
        }
    }
}

/// Apply `request` to the file at `path`.
///
/// Options are validated before the file is touched. With `backup` set (and
/// not in print mode) the pre-edit content goes to `<path>.bak`; that file
/// is removed again when nothing changed, and any stray `.bak` is removed
/// when no backup was requested.
pub fn apply(path: impl AsRef<Path>, request: &LineEditRequest) -> Result<LineOutcome, EditError> {
    request.validate()?;
    let target = TargetFile::open(path)?;

    let result = edit_file(&target, request);

    let keep_backup = request.backup && matches!(&result, Ok(outcome) if outcome.changed);
    let cleanup = if keep_backup {
        Ok(())
    } else {
        target.remove_backup()
    };

    let outcome = result?;
    cleanup?;
    Ok(outcome)
}

fn edit_file(target: &TargetFile, request: &LineEditRequest) -> Result<LineOutcome, EditError> {
    let content = target.read()?;
    if request.backup && request.state != LineState::Print {
        target.write_backup(&content)?;
    }

    let mut document = Document::parse(&content);
    let outcome = edit_lines(&mut document, request)?;

    if outcome.changed {
        target.write(&document.render())?;
    }
    Ok(outcome)
}

/// Lines of `content` matching `pattern`.
pub fn grep<'a>(content: &'a str, pattern: &Regex) -> Vec<&'a str> {
    content
        .split('\n')
        .filter(|line| pattern.is_match(line))
        .collect()
}
