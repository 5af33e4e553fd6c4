//! Whole-file regular-expression search and replace.
//!
//! Unlike the line editor this works on the full text, so a pattern may span
//! lines. Replacement text uses the same `$N` placeholders as the line editor.

use crate::edit::{compile_pattern, EditError, TargetFile};
use crate::line::capture;
use regex::Regex;
use std::path::Path;

/// Replace up to `limit` matches of `pattern` in `input` (all when `None`).
///
/// Returns the new text and the number of replacements made.
pub fn replace_pattern(
    input: &str,
    pattern: &Regex,
    replacement: &str,
    limit: Option<usize>,
) -> (String, usize) {
    let limit = limit.unwrap_or(usize::MAX);
    let mut output = String::with_capacity(input.len());
    let mut last_end = 0;
    let mut count = 0;

    for caps in pattern.captures_iter(input).take(limit) {
        let Some(whole) = caps.get(0) else { continue };
        output.push_str(&input[last_end..whole.start()]);
        output.push_str(&capture::expand(replacement, &capture::groups(&caps)));
        last_end = whole.end();
        count += 1;
    }

    output.push_str(&input[last_end..]);
    (output, count)
}

/// Regex search and replace over a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceRequest {
    pub pattern: String,
    pub replacement: String,
    /// Maximum number of replacements; all when `None`.
    pub count: Option<usize>,
    pub backup: bool,
}

impl ReplaceRequest {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
            count: None,
            backup: false,
        }
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }
}

/// Apply `request` to the file at `path`, returning the replacement count.
///
/// The file (and its `.bak`, when requested) is only written when at least
/// one replacement was made.
pub fn search_replace_file(
    path: impl AsRef<Path>,
    request: &ReplaceRequest,
) -> Result<usize, EditError> {
    let pattern = compile_pattern(&request.pattern)?;
    let target = TargetFile::open(path)?;
    let content = target.read()?;

    let (output, count) = replace_pattern(&content, &pattern, &request.replacement, request.count);
    if count > 0 {
        if request.backup {
            target.write_backup(&content)?;
        }
        target.write(&output)?;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_replace_all_with_captures() {
        let re = Regex::new(r"(\w+)@example\.com").unwrap();
        let (output, count) = replace_pattern(
            "a@example.com, b@example.com",
            &re,
            "$1@example.org",
            None,
        );
        assert_eq!(output, "a@example.org, b@example.org");
        assert_eq!(count, 2);
    }

    #[test]
    fn test_replace_limit() {
        let re = Regex::new("x").unwrap();
        let (output, count) = replace_pattern("xxxx", &re, "y", Some(2));
        assert_eq!(output, "yyxx");
        assert_eq!(count, 2);

        let (output, count) = replace_pattern("xxxx", &re, "y", Some(0));
        assert_eq!(output, "xxxx");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_replace_spans_lines() {
        let re = Regex::new(r"begin\n(.*)\nend").unwrap();
        let (output, _) = replace_pattern("begin\nold\nend\n", &re, "[$1]", None);
        assert_eq!(output, "[old]\n");
    }

    #[test]
    fn test_search_replace_file_counts_and_backs_up() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("app.conf");
        fs::write(&file_path, "debug=true\nlevel=debug\n").unwrap();

        let request = ReplaceRequest::new("debug", "info").backup(true);
        let count = search_replace_file(&file_path, &request).unwrap();

        assert_eq!(count, 2);
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "info=true\nlevel=info\n");
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("app.conf.bak")).unwrap(),
            "debug=true\nlevel=debug\n"
        );
    }

    #[test]
    fn test_search_replace_file_no_match_leaves_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("app.conf");
        fs::write(&file_path, "a\n").unwrap();

        let request = ReplaceRequest::new("zzz", "y").backup(true);
        assert_eq!(search_replace_file(&file_path, &request).unwrap(), 0);
        assert!(!temp_dir.path().join("app.conf.bak").exists());
    }
}
