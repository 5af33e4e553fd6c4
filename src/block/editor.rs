use crate::block::locator::{locate, BlockSpan, Marker};
use crate::edit::{Document, EditError, TargetFile};
use crate::scan::PatternList;
use std::path::Path;

/// A request to replace one boundary-delimited block.
#[derive(Debug, Clone)]
pub struct BlockEditRequest {
    pub upper_bound: PatternList,
    pub lower_bound: PatternList,
    pub marker: Marker,
    pub replacement: String,
    /// Keep the boundary lines and replace only what lies between them.
    pub keep_boundary_lines: bool,
    pub backup: bool,
    /// Line index the marker search starts from.
    pub resume_from: usize,
}

impl BlockEditRequest {
    /// Request with boundaries kept, no backup, scanning from the top.
    pub fn new(
        upper_bound: PatternList,
        lower_bound: PatternList,
        marker: Marker,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            upper_bound,
            lower_bound,
            marker,
            replacement: replacement.into(),
            keep_boundary_lines: true,
            backup: false,
            resume_from: 0,
        }
    }

    pub fn keep_boundary_lines(mut self, keep: bool) -> Self {
        self.keep_boundary_lines = keep;
        self
    }

    pub fn backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    pub fn resume_from(mut self, line: usize) -> Self {
        self.resume_from = line;
        self
    }
}

/// Result of one block replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "BlockOutcome carries the cursor for the next pass"]
pub struct BlockOutcome {
    /// The block as it was, boundaries included.
    pub old_block_text: String,
    pub start_line: usize,
    pub end_line: usize,
    /// Whether the file content actually differs after the rewrite.
    pub changed: bool,
    /// First line after the written replacement in the new file. Passing it
    /// back as `resume_from` continues past this block.
    pub next_resume: usize,
}

/// Splice `replacement` into `document` at `span`.
///
/// Returns the new document and the index of the first line following the
/// replacement (the kept lower boundary, or whatever followed the block).
pub fn rewrite(
    document: &Document,
    span: &BlockSpan,
    replacement: &str,
    keep_boundary_lines: bool,
) -> (Document, usize) {
    let lines = document.lines();
    let (above, below) = if keep_boundary_lines {
        (
            &lines[..span.interior_start()],
            &lines[span.end_line.min(lines.len())..],
        )
    } else {
        (
            &lines[..span.start_line],
            &lines[span.block_end(lines.len())..],
        )
    };

    let mut output = Vec::with_capacity(above.len() + below.len() + 1);
    output.extend_from_slice(above);
    output.extend(replacement.split('\n').map(str::to_string));
    let next_resume = output.len();
    output.extend_from_slice(below);

    (Document::from_lines(output), next_resume)
}

/// Replace the first block found at or after `request.resume_from`.
///
/// Returns `Ok(None)` when no complete block is found; nothing is written in
/// that case. The file is only written when its content changes, and the
/// `.bak` copy is only taken then.
pub fn apply(
    path: impl AsRef<Path>,
    request: &BlockEditRequest,
) -> Result<Option<BlockOutcome>, EditError> {
    let target = TargetFile::open(path)?;
    let content = target.read()?;
    let document = Document::parse(&content);

    let Some(span) = locate(
        document.lines(),
        &request.upper_bound,
        &request.lower_bound,
        &request.marker,
        request.resume_from,
    ) else {
        return Ok(None);
    };

    let old_block_text = span.text(document.lines());
    let (updated, next_resume) = rewrite(
        &document,
        &span,
        &request.replacement,
        request.keep_boundary_lines,
    );
    let new_content = updated.render();
    let changed = new_content != content;

    if changed {
        if request.backup {
            target.write_backup(&content)?;
        }
        target.write(&new_content)?;
    }

    Ok(Some(BlockOutcome {
        old_block_text,
        start_line: span.start_line,
        end_line: span.end_line,
        changed,
        next_resume,
    }))
}
