//! Selecting files for a batch run.
//!
//! A target path may be a single file or a directory tree. Entries are kept
//! when their file name matches the name pattern and no exclude pattern;
//! excluded directories are not descended into.

use crate::edit::{compile_pattern, EditError};
use regex::Regex;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Names skipped unless the caller overrides them: VCS metadata, archives
/// and common binary formats.
pub const DEFAULT_EXCLUDE: &str =
    r"^(\.git|.*\.zip|.*\.gz|.*\.xz|.*\.bz2|.*\.zst|.*\.7z|.*\.dll|.*\.iso|.*\.bin|.*\.tar|.*\.exe)$";

/// Bytes inspected by [`is_binary`].
const SNIFF_LEN: usize = 512;

#[derive(Debug, Clone)]
pub struct FileFilter {
    name_pattern: Regex,
    exclude: Option<Regex>,
    default_exclude: Option<Regex>,
    skip_binary: bool,
}

impl Default for FileFilter {
    fn default() -> Self {
        Self {
            name_pattern: Regex::new(".*").expect("literal pattern is valid"),
            exclude: None,
            default_exclude: Regex::new(DEFAULT_EXCLUDE).ok(),
            skip_binary: false,
        }
    }
}

impl FileFilter {
    /// Build a filter. Empty exclude patterns disable that exclusion.
    pub fn new(
        name_pattern: &str,
        exclude: &str,
        default_exclude: &str,
        skip_binary: bool,
    ) -> Result<Self, EditError> {
        let optional = |pattern: &str| {
            if pattern.is_empty() {
                Ok(None)
            } else {
                compile_pattern(pattern).map(Some)
            }
        };
        Ok(Self {
            name_pattern: compile_pattern(name_pattern)?,
            exclude: optional(exclude)?,
            default_exclude: optional(default_exclude)?,
            skip_binary,
        })
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.exclude.as_ref().is_some_and(|re| re.is_match(name))
            || self
                .default_exclude
                .as_ref()
                .is_some_and(|re| re.is_match(name))
    }

    /// Whether a file with this name is selected (ignoring binary sniffing).
    pub fn accepts_name(&self, name: &str) -> bool {
        self.name_pattern.is_match(name) && !self.is_excluded(name)
    }

    fn keeps_directory(&self, entry: &DirEntry) -> bool {
        entry.depth() == 0
            || !entry.file_type().is_dir()
            || !self.is_excluded(&entry.file_name().to_string_lossy())
    }
}

/// Collect the files under `root` selected by `filter`, in walk order.
///
/// Unreadable entries are logged and skipped.
pub fn collect_files(root: &Path, filter: &FileFilter) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| filter.keeps_directory(entry))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }
        if !filter.accepts_name(&entry.file_name().to_string_lossy()) {
            continue;
        }
        if filter.skip_binary {
            match is_binary(entry.path()) {
                Ok(true) => {
                    tracing::debug!(path = %entry.path().display(), "skipping binary file");
                    continue;
                }
                Ok(false) => {}
                Err(err) => {
                    tracing::debug!(path = %entry.path().display(), error = %err, "could not sniff file");
                }
            }
        }
        files.push(entry.into_path());
    }

    files
}

/// Heuristic: a NUL or a control byte other than tab, LF or CR within the
/// first 512 bytes marks the file as binary.
pub fn is_binary(path: &Path) -> io::Result<bool> {
    let mut buffer = [0u8; SNIFF_LEN];
    let mut file = File::open(path)?;
    let read = file.read(&mut buffer)?;
    Ok(buffer[..read]
        .iter()
        .any(|&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r')))
}
