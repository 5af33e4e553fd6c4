//! Boundary-delimited block editing.
//!
//! A block is found from a marker (a line index or a [`PatternList`]): the
//! nearest upper boundary at or above the marker and the nearest lower
//! boundary below it frame the block. The editor then replaces the block,
//! with or without its boundary lines.
//!
//! [`PatternList`]: crate::scan::PatternList

pub mod editor;
pub mod locator;

pub use editor::{apply, rewrite, BlockEditRequest, BlockOutcome};
pub use locator::{locate, locate_in_file, BlockSpan, LocatedBlock, Marker};
