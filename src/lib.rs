//! lineinfile: in-place line and block editing for text files
//!
//! Files are treated as lists of `\n`-separated lines. Two editors sit on
//! top of a shared pattern scanner:
//!
//! - the line editor ([`line`]) finds one line by number, substring or
//!   regex and replaces, inserts, removes or prints it;
//! - the block editor ([`block`]) finds a region delimited by upper and
//!   lower boundary patterns around a marker and replaces it.
//!
//! Batch runs over directory trees ([`walk`]) and TOML edit plans
//! ([`config`]) are built on the same per-file operations.
//!
//! # Example
//!
//! ```no_run
//! use lineinfile::line::{self, LineEditRequest};
//!
//! let request = LineEditRequest::new("port = 8080").regexp(r"^port\s*=");
//!
//! match line::apply("app.conf", &request) {
//!     Ok(outcome) => println!("changed: {}", outcome.changed),
//!     Err(e) => eprintln!("edit failed: {}", e),
//! }
//! ```

pub mod block;
pub mod config;
pub mod edit;
pub mod line;
pub mod logging;
pub mod replace;
pub mod report;
pub mod scan;
pub mod walk;

// Re-exports
pub use block::{BlockEditRequest, BlockOutcome, BlockSpan, LocatedBlock, Marker};
pub use config::{
    apply_operation, apply_plan, load_from_path, load_from_str, ApplicationError, ConfigError,
    EditPlan, Operation,
};
pub use edit::{Document, EditError};
pub use line::{LineEditRequest, LineOutcome, LineState};
pub use replace::{search_replace_file, ReplaceRequest};
pub use report::{FileReport, Report};
pub use scan::{scan, Direction, PatternList, PatternMatch};
pub use walk::{collect_files, FileFilter};
