//! Edit applicator: runs one operation against one file
//!
//! This module sits between the per-file engine and the batch callers
//! (the CLI and plan runner). It:
//! - Creates missing targets for line edits that add a line
//! - Repeats block edits with the resume cursor until no block is left
//! - Enforces the expected block count
//! - Turns engine outcomes into [`FileReport`]s

use crate::block::{self, locate_in_file, Marker};
use crate::config::schema::{EditPlan, Operation, StateSpec};
use crate::edit::EditError;
use crate::line;
use crate::replace::search_replace_file;
use crate::report::{BlockChange, ExtractedBlock, FileReport};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// Errors during edit application
#[derive(Debug)]
pub enum ApplicationError {
    /// Engine error on one file
    Edit { file: PathBuf, source: EditError },
    /// Creating a missing target failed
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Block edit processed a different number of blocks than required
    UnexpectedBlockCount {
        file: PathBuf,
        expected: usize,
        actual: usize,
    },
}

impl ApplicationError {
    /// Whether this error must stop a batch run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ApplicationError::UnexpectedBlockCount { .. })
    }

    /// The report entry recorded for a file that failed with this error.
    pub fn to_report(&self, operation: &Operation) -> FileReport {
        let error = Some(self.to_string());
        match operation {
            Operation::Line(_) => FileReport::Line {
                changed: false,
                error,
            },
            Operation::Replace(_) => FileReport::Replace { count: 0, error },
            Operation::Block(_) | Operation::Extract(_) => FileReport::Failed {
                error: self.to_string(),
            },
        }
    }
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::Edit { file, source } => {
                write!(f, "{}: {}", file.display(), source)
            }
            ApplicationError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            ApplicationError::UnexpectedBlockCount {
                file,
                expected,
                actual,
            } => write!(
                f,
                "{}: processed {} blocks, expected {}",
                file.display(),
                actual,
                expected
            ),
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Edit { source, .. } => Some(source),
            ApplicationError::Io { source, .. } => Some(source),
            ApplicationError::UnexpectedBlockCount { .. } => None,
        }
    }
}

fn edit_error(path: &Path) -> impl FnOnce(EditError) -> ApplicationError + '_ {
    move |source| ApplicationError::Edit {
        file: path.to_path_buf(),
        source,
    }
}

/// Apply `operation` to the file at `path`.
///
/// `expected` only applies to block edits: when set, the number of blocks
/// processed must match it exactly.
pub fn apply_operation(
    path: &Path,
    operation: &Operation,
    expected: Option<usize>,
) -> Result<FileReport, ApplicationError> {
    match operation {
        Operation::Line(op) => {
            let request = op.to_request();
            request.validate().map_err(edit_error(path))?;
            if op.state == StateSpec::Present && !path.exists() {
                tracing::debug!(path = %path.display(), "creating missing target");
                create_empty(path)?;
            }
            let outcome = line::apply(path, &request).map_err(edit_error(path))?;
            tracing::debug!(path = %path.display(), changed = outcome.changed, "line edit");
            Ok(FileReport::from_line_outcome(
                outcome,
                op.state == StateSpec::Print,
            ))
        }
        Operation::Replace(op) => {
            let count = search_replace_file(path, &op.to_request()).map_err(edit_error(path))?;
            tracing::debug!(path = %path.display(), count, "search and replace");
            Ok(FileReport::Replace { count, error: None })
        }
        Operation::Block(op) => {
            let request = op.to_request().map_err(edit_error(path))?;
            let changes = apply_blocks(path, request)?;
            tracing::info!(path = %path.display(), blocks = changes.len(), "block edit");

            if let Some(expected) = expected {
                if changes.len() != expected {
                    return Err(ApplicationError::UnexpectedBlockCount {
                        file: path.to_path_buf(),
                        expected,
                        actual: changes.len(),
                    });
                }
            }
            Ok(FileReport::Block { changes })
        }
        Operation::Extract(op) => {
            let patterns = op.compile().map_err(edit_error(path))?;
            let mut blocks = Vec::new();
            let mut cursor = 0;
            while let Some(located) = locate_in_file(
                path,
                &patterns.upper_bound,
                &patterns.lower_bound,
                &patterns.marker,
                cursor,
            )
            .map_err(edit_error(path))?
            {
                blocks.push(ExtractedBlock::from(&located));
                cursor = located.span.end_line.max(cursor + 1);
            }
            tracing::debug!(path = %path.display(), blocks = blocks.len(), "extract");
            Ok(FileReport::Extract { blocks })
        }
    }
}

/// Replace every block in the file, one pass per block.
///
/// A line-number marker names one line, so it selects one block and the
/// loop stops after it. The `.bak` copy, when requested, holds the content from before the first
/// write.
fn apply_blocks(
    path: &Path,
    mut request: block::BlockEditRequest,
) -> Result<Vec<BlockChange>, ApplicationError> {
    let mut backup_pending = request.backup;
    let mut changes = Vec::new();
    let mut cursor = 0;

    loop {
        request = request.backup(backup_pending).resume_from(cursor);
        let Some(outcome) = block::apply(path, &request).map_err(edit_error(path))? else {
            break;
        };
        if outcome.changed {
            backup_pending = false;
        }
        changes.push(BlockChange {
            changed: outcome.changed,
            start_line_no: outcome.start_line,
            end_line_no: outcome.end_line,
        });
        if matches!(request.marker, Marker::Line(_)) {
            break;
        }
        cursor = outcome.next_resume.max(cursor + 1);
    }

    Ok(changes)
}

fn create_empty(path: &Path) -> Result<(), ApplicationError> {
    let io_error = |source| ApplicationError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_error)?;
    Ok(())
}

/// Resolve an edit's `file` entry.
pub fn resolve_target(plan: &EditPlan, file: &str, plan_dir: &Path) -> PathBuf {
    let file = Path::new(file);
    if plan.meta.relative_to_plan && file.is_relative() {
        plan_dir.join(file)
    } else {
        file.to_path_buf()
    }
}

/// Apply every edit in `plan`, in order.
///
/// Results are keyed by edit id. A fatal error stops the run; edits after it
/// are not attempted.
pub fn apply_plan(
    plan: &EditPlan,
    plan_dir: &Path,
) -> Vec<(String, PathBuf, Result<FileReport, ApplicationError>)> {
    let mut results = Vec::with_capacity(plan.edits.len());

    for edit in &plan.edits {
        let target = resolve_target(plan, &edit.file, plan_dir);
        tracing::debug!(id = %edit.id, kind = edit.operation.kind(), path = %target.display(), "applying edit");
        let result = apply_operation(&target, &edit.operation, edit.expected);
        let fatal = matches!(&result, Err(err) if err.is_fatal());
        if let Err(err) = &result {
            tracing::warn!(id = %edit.id, error = %err, "edit failed");
        }
        results.push((edit.id.clone(), target, result));
        if fatal {
            break;
        }
    }

    results
}
