//! Per-file results, serialized as the JSON report.

use crate::block::LocatedBlock;
use crate::line::LineOutcome;
use serde::Serialize;
use std::collections::BTreeMap;

/// One processed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockChange {
    pub changed: bool,
    pub start_line_no: usize,
    pub end_line_no: usize,
}

/// One extracted block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedBlock {
    pub content: String,
    pub content_no_boundary: String,
    pub start_line_no: usize,
    pub end_line_no: usize,
}

impl From<&LocatedBlock> for ExtractedBlock {
    fn from(block: &LocatedBlock) -> Self {
        Self {
            content: block.text.clone(),
            content_no_boundary: block.span.inner_text(block.document.lines()),
            start_line_no: block.span.start_line,
            end_line_no: block.span.end_line,
        }
    }
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FileReport {
    Line {
        changed: bool,
        error: Option<String>,
    },
    Print {
        /// Keyed by 1-based line number.
        matched_lines: BTreeMap<usize, String>,
    },
    Replace {
        count: usize,
        error: Option<String>,
    },
    Block {
        changes: Vec<BlockChange>,
    },
    Extract {
        blocks: Vec<ExtractedBlock>,
    },
    Failed {
        error: String,
    },
}

impl FileReport {
    pub fn from_line_outcome(outcome: LineOutcome, print: bool) -> Self {
        if print {
            FileReport::Print {
                matched_lines: outcome
                    .matched_lines
                    .into_iter()
                    .map(|(idx, text)| (idx + 1, text))
                    .collect(),
            }
        } else {
            FileReport::Line {
                changed: outcome.changed,
                error: None,
            }
        }
    }

    /// Whether the file was modified.
    pub fn changed(&self) -> bool {
        match self {
            FileReport::Line { changed, .. } => *changed,
            FileReport::Replace { count, .. } => *count > 0,
            FileReport::Block { changes } => changes.iter().any(|c| c.changed),
            FileReport::Print { .. } | FileReport::Extract { .. } | FileReport::Failed { .. } => {
                false
            }
        }
    }
}

/// Reports keyed by file path (or edit id for plans).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Report {
    files: BTreeMap<String, FileReport>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, report: FileReport) {
        self.files.insert(key.into(), report);
    }

    pub fn get(&self, key: &str) -> Option<&FileReport> {
        self.files.get(key)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn any_changed(&self) -> bool {
        self.files.values().any(FileReport::changed)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
