//! Single-line editing.
//!
//! A target line is found by line number, substring or regular expression.
//! When nothing matches, an `insert_after`/`insert_before` anchor (or the end
//! of the file) decides where a new line goes. Lines can be made present,
//! removed, or just reported.

pub mod capture;
pub mod editor;

pub use editor::{
    apply, edit_lines, grep, LineEditRequest, LineOutcome, LineState, BOF_ANCHOR, EOF_ANCHOR,
};
