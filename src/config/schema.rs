use crate::block::{BlockEditRequest, Marker};
use crate::edit::{compile_pattern, EditError};
use crate::line::{LineEditRequest, LineState, BOF_ANCHOR, EOF_ANCHOR};
use crate::replace::ReplaceRequest;
use crate::scan::PatternList;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EditPlan {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub edits: Vec<EditDefinition>,
}

impl EditPlan {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.edits.is_empty() {
            issues.push(ValidationIssue::EmptyEditList);
        }

        for (idx, edit) in self.edits.iter().enumerate() {
            let edit_ref = || EditRef::new(idx, edit);

            if edit.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    edit: edit_ref(),
                    field: "id",
                });
            }
            if edit.file.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    edit: edit_ref(),
                    field: "file",
                });
            }
            if edit.expected.is_some() && !matches!(edit.operation, Operation::Block(_)) {
                issues.push(ValidationIssue::InvalidCombo {
                    edit: edit_ref(),
                    message: "expected is only meaningful for block edits".to_string(),
                });
            }

            match &edit.operation {
                Operation::Line(line) if line.line_number == Some(0) => {
                    issues.push(ValidationIssue::InvalidCombo {
                        edit: edit_ref(),
                        message: "line_number is 1-based".to_string(),
                    });
                }
                Operation::Block(BlockOperation { marker, .. })
                | Operation::Extract(ExtractOperation { marker, .. })
                    if marker.is_empty() =>
                {
                    issues.push(ValidationIssue::MissingField {
                        edit: edit_ref(),
                        field: "operation.marker",
                    });
                }
                Operation::Replace(replace) if replace.pattern.is_empty() => {
                    issues.push(ValidationIssue::MissingField {
                        edit: edit_ref(),
                        field: "operation.pattern",
                    });
                    continue;
                }
                _ => {}
            }

            match edit.operation.check() {
                Ok(()) => {}
                Err(err @ EditError::InvalidPattern { .. }) => {
                    issues.push(ValidationIssue::InvalidPattern {
                        edit: edit_ref(),
                        message: err.to_string(),
                    });
                }
                Err(err) => {
                    issues.push(ValidationIssue::InvalidCombo {
                        edit: edit_ref(),
                        message: err.to_string(),
                    });
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Resolve `file` entries against the plan file's directory.
    #[serde(default)]
    pub relative_to_plan: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EditDefinition {
    pub id: String,
    pub file: String,
    pub operation: Operation,
    /// Exact number of blocks a block edit must process.
    #[serde(default)]
    pub expected: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Operation {
    Line(LineOperation),
    Block(BlockOperation),
    Replace(ReplaceOperation),
    Extract(ExtractOperation),
}

impl Operation {
    /// Check option conflicts and compile every pattern without touching
    /// any file.
    pub fn check(&self) -> Result<(), EditError> {
        match self {
            Operation::Line(op) => {
                op.to_request().validate()?;
                let patterns = [&op.regexp, &op.insert_after, &op.insert_before];
                for pattern in patterns.into_iter().flatten() {
                    if pattern != BOF_ANCHOR && pattern != EOF_ANCHOR {
                        compile_pattern(pattern)?;
                    }
                }
                Ok(())
            }
            Operation::Block(op) => op.to_request().map(drop),
            Operation::Replace(op) => compile_pattern(&op.pattern).map(drop),
            Operation::Extract(op) => op.compile().map(drop),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Line(_) => "line",
            Operation::Block(_) => "block",
            Operation::Replace(_) => "replace",
            Operation::Extract(_) => "extract",
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StateSpec {
    #[default]
    Present,
    Absent,
    Print,
}

impl From<StateSpec> for LineState {
    fn from(state: StateSpec) -> Self {
        match state {
            StateSpec::Present => LineState::Present,
            StateSpec::Absent => LineState::Absent,
            StateSpec::Print => LineState::Print,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LineOperation {
    #[serde(default)]
    pub line: String,
    #[serde(default)]
    pub search_string: Option<String>,
    #[serde(default)]
    pub regexp: Option<String>,
    #[serde(default)]
    pub line_number: Option<usize>,
    #[serde(default)]
    pub insert_after: Option<String>,
    #[serde(default)]
    pub insert_before: Option<String>,
    #[serde(default)]
    pub state: StateSpec,
    #[serde(default)]
    pub backup: bool,
    #[serde(default)]
    pub replace_all: bool,
}

impl LineOperation {
    pub fn to_request(&self) -> LineEditRequest {
        LineEditRequest {
            insert_after: self.insert_after.clone(),
            insert_before: self.insert_before.clone(),
            line: self.line.clone(),
            line_number: self.line_number,
            regexp: self.regexp.clone(),
            search_string: self.search_string.clone(),
            state: self.state.into(),
            backup: self.backup,
            replace_all: self.replace_all,
        }
    }
}

/// Either a 1-based line number or a list of patterns.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum MarkerSpec {
    Line(usize),
    Patterns(Vec<String>),
}

impl Default for MarkerSpec {
    fn default() -> Self {
        MarkerSpec::Patterns(Vec::new())
    }
}

impl MarkerSpec {
    pub fn is_empty(&self) -> bool {
        match self {
            MarkerSpec::Line(number) => *number == 0,
            MarkerSpec::Patterns(patterns) => patterns.is_empty(),
        }
    }

    pub fn compile(&self) -> Result<Marker, EditError> {
        Ok(match self {
            MarkerSpec::Line(number) => Marker::Line(number.saturating_sub(1)),
            MarkerSpec::Patterns(patterns) => Marker::Patterns(PatternList::new(patterns)?),
        })
    }
}

fn default_keep_boundary() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct BlockOperation {
    #[serde(default)]
    pub upper_bound: Vec<String>,
    #[serde(default)]
    pub lower_bound: Vec<String>,
    #[serde(default)]
    pub marker: MarkerSpec,
    #[serde(default)]
    pub replacement: String,
    #[serde(default = "default_keep_boundary")]
    pub keep_boundary: bool,
    #[serde(default)]
    pub backup: bool,
}

impl BlockOperation {
    pub fn to_request(&self) -> Result<BlockEditRequest, EditError> {
        Ok(BlockEditRequest::new(
            PatternList::new(&self.upper_bound)?,
            PatternList::new(&self.lower_bound)?,
            self.marker.compile()?,
            self.replacement.clone(),
        )
        .keep_boundary_lines(self.keep_boundary)
        .backup(self.backup))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplaceOperation {
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub backup: bool,
}

impl ReplaceOperation {
    pub fn to_request(&self) -> ReplaceRequest {
        ReplaceRequest {
            pattern: self.pattern.clone(),
            replacement: self.replacement.clone(),
            count: self.count,
            backup: self.backup,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExtractOperation {
    #[serde(default)]
    pub upper_bound: Vec<String>,
    #[serde(default)]
    pub lower_bound: Vec<String>,
    #[serde(default)]
    pub marker: MarkerSpec,
}

/// Compiled boundaries of an extract operation.
#[derive(Debug, Clone)]
pub struct ExtractPatterns {
    pub upper_bound: PatternList,
    pub lower_bound: PatternList,
    pub marker: Marker,
}

impl ExtractOperation {
    pub fn compile(&self) -> Result<ExtractPatterns, EditError> {
        Ok(ExtractPatterns {
            upper_bound: PatternList::new(&self.upper_bound)?,
            lower_bound: PatternList::new(&self.lower_bound)?,
            marker: self.marker.compile()?,
        })
    }
}

/// Which edit of a plan an issue belongs to: its position, plus the id and
/// target file when they are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRef {
    /// 1-based position in `[[edits]]`.
    pub position: usize,
    pub id: Option<String>,
    pub file: Option<String>,
}

impl EditRef {
    fn new(idx: usize, edit: &EditDefinition) -> Self {
        let non_blank = |value: &str| {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        };
        Self {
            position: idx + 1,
            id: non_blank(&edit.id),
            file: non_blank(&edit.file),
        }
    }
}

impl fmt::Display for EditRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "edit '{id}'")?,
            None => write!(f, "edit #{}", self.position)?,
        }
        if let Some(file) = &self.file {
            write!(f, " on {file}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut issues = self.issues.iter();
        if let Some(first) = issues.next() {
            write!(f, "- {first}")?;
        }
        for issue in issues {
            write!(f, "\n- {issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyEditList,
    MissingField { edit: EditRef, field: &'static str },
    InvalidCombo { edit: EditRef, message: String },
    InvalidPattern { edit: EditRef, message: String },
}

impl ValidationIssue {
    pub fn edit(&self) -> Option<&EditRef> {
        match self {
            ValidationIssue::EmptyEditList => None,
            ValidationIssue::MissingField { edit, .. }
            | ValidationIssue::InvalidCombo { edit, .. }
            | ValidationIssue::InvalidPattern { edit, .. } => Some(edit),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyEditList => write!(f, "plan has no [[edits]] entries"),
            ValidationIssue::MissingField { edit, field } => {
                write!(f, "{edit}: `{field}` must not be empty")
            }
            ValidationIssue::InvalidCombo { edit, message }
            | ValidationIssue::InvalidPattern { edit, message } => write!(f, "{edit}: {message}"),
        }
    }
}
