use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A file's contents as an ordered sequence of lines.
///
/// Lines are split on `\n` only. No line-ending normalization happens here:
/// a trailing `\r` stays part of its line, and a trailing newline shows up as
/// a final empty line. Joining the lines back with `\n` reproduces the input
/// byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    lines: Vec<String>,
}

impl Document {
    /// Split content into lines.
    pub fn parse(content: &str) -> Self {
        Self {
            lines: content.split('\n').map(str::to_string).collect(),
        }
    }

    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut Vec<String> {
        &mut self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// True for the document of an empty file (a single empty line).
    pub fn is_blank(&self) -> bool {
        self.lines.is_empty() || (self.lines.len() == 1 && self.lines[0].is_empty())
    }

    /// Join the lines back with `\n`.
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("conflicting options: {first} and {second} cannot both be set")]
    ConflictingOptions {
        first: &'static str,
        second: &'static str,
    },

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("non-regular destination file: {0}")]
    NotRegularFile(PathBuf),

    #[error("line number {line_number} is out of range for a file of {line_count} lines")]
    LineNumberOutOfRange {
        line_number: usize,
        line_count: usize,
    },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 validation error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Compile a pattern, keeping the offending text in the error.
pub(crate) fn compile_pattern(pattern: &str) -> Result<regex::Regex, EditError> {
    regex::Regex::new(pattern).map_err(|source| EditError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// A regular file opened for editing, with the permissions to restore on write.
#[derive(Debug)]
pub struct TargetFile {
    path: PathBuf,
    permissions: fs::Permissions,
}

impl TargetFile {
    /// Stat `path` (following symlinks) and refuse anything that is not a
    /// regular file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EditError> {
        let path = path.as_ref();
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(EditError::NotRegularFile(path.to_path_buf()));
        }
        Ok(Self {
            path: path.to_path_buf(),
            permissions: metadata.permissions(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file as UTF-8 text.
    pub fn read(&self) -> Result<String, EditError> {
        let bytes = fs::read(&self.path)?;
        Ok(String::from_utf8(bytes)?)
    }

    pub fn read_document(&self) -> Result<Document, EditError> {
        Ok(Document::parse(&self.read()?))
    }

    /// Overwrite the file in place, then reapply the original mode bits.
    ///
    /// Not atomic: a crash mid-write can leave a truncated file.
    pub fn write(&self, content: &str) -> Result<(), EditError> {
        write_with_permissions(&self.path, content, &self.permissions)
    }

    /// Path of the `.bak` sibling.
    pub fn backup_path(&self) -> PathBuf {
        backup_path(&self.path)
    }

    /// Write `content` to the `.bak` sibling with the same mode bits.
    pub fn write_backup(&self, content: &str) -> Result<(), EditError> {
        write_with_permissions(&self.backup_path(), content, &self.permissions)
    }

    /// Remove the `.bak` sibling if there is one.
    pub fn remove_backup(&self) -> Result<(), EditError> {
        match fs::remove_file(self.backup_path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// `<path>.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

fn write_with_permissions(
    path: &Path,
    content: &str,
    permissions: &fs::Permissions,
) -> Result<(), EditError> {
    fs::write(path, content)?;
    fs::set_permissions(path, permissions.clone())?;
    Ok(())
}
