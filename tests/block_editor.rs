//! On-disk behaviour of the block locator and editor

use lineinfile::block::{self, locate_in_file, BlockEditRequest, Marker};
use lineinfile::scan::PatternList;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn patterns(list: &[&str]) -> PatternList {
    PatternList::new(list).unwrap()
}

fn fixture(content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("block.txt");
    fs::write(&path, content).unwrap();
    (dir, path)
}

const HOSTS: &str = "127.0.0.1 localhost\n# BEGIN managed\n10.0.0.1 db\n10.0.0.2 cache\n# END managed\n::1 localhost\n";

#[test]
fn test_replace_keeps_boundaries() {
    let (_dir, path) = fixture("A\n---start---\nold1\nold2\n---end---\nB");
    let request = BlockEditRequest::new(
        patterns(&["---start---"]),
        patterns(&["---end---"]),
        Marker::Patterns(patterns(&["old1"])),
        "new1\nnew2",
    );

    let outcome = block::apply(&path, &request).unwrap().unwrap();
    assert!(outcome.changed);
    assert_eq!(outcome.old_block_text, "---start---\nold1\nold2\n---end---");
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "A\n---start---\nnew1\nnew2\n---end---\nB"
    );
}

#[test]
fn test_replace_including_boundaries() {
    let (_dir, path) = fixture(HOSTS);
    let request = BlockEditRequest::new(
        patterns(&["^# BEGIN managed$"]),
        patterns(&["^# END managed$"]),
        Marker::Patterns(patterns(&["^10\\.0\\.0\\.1 "])),
        "10.0.0.9 all",
    )
    .keep_boundary_lines(false);

    block::apply(&path, &request).unwrap().unwrap();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "127.0.0.1 localhost\n10.0.0.9 all\n::1 localhost\n"
    );
}

#[test]
fn test_missing_marker_is_a_no_op() {
    let (dir, path) = fixture(HOSTS);
    let request = BlockEditRequest::new(
        patterns(&["^# BEGIN managed$"]),
        patterns(&["^# END managed$"]),
        Marker::Patterns(patterns(&["^192\\.168\\."])),
        "ignored",
    )
    .backup(true);

    assert!(block::apply(&path, &request).unwrap().is_none());
    assert_eq!(fs::read_to_string(&path).unwrap(), HOSTS);
    assert!(!dir.path().join("block.txt.bak").exists());
}

#[test]
fn test_line_marker() {
    let (_dir, path) = fixture(HOSTS);
    let request = BlockEditRequest::new(
        patterns(&["^# BEGIN"]),
        patterns(&["^# END"]),
        Marker::Line(3),
        "10.0.0.3 queue",
    );

    let outcome = block::apply(&path, &request).unwrap().unwrap();
    assert_eq!(outcome.start_line, 1);
    assert_eq!(outcome.end_line, 4);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "127.0.0.1 localhost\n# BEGIN managed\n10.0.0.3 queue\n# END managed\n::1 localhost\n"
    );
}

#[test]
fn test_locate_in_file_with_eof_lower_bound() {
    let (_dir, path) = fixture("header\n[vault]\npassword=x\nuser=y");
    let located = locate_in_file(
        &path,
        &patterns(&[r"^\[vault\]$"]),
        &patterns(&["^EOF$"]),
        &Marker::Patterns(patterns(&["^password="])),
        0,
    )
    .unwrap()
    .unwrap();

    assert_eq!(located.span.start_line, 1);
    assert_eq!(located.span.end_line, 4);
    assert_eq!(located.text, "[vault]\npassword=x\nuser=y");
}

#[test]
fn test_resume_cursor_walks_every_block() {
    let (_dir, path) = fixture("[a]\nk=1\n[end]\n[a]\nk=2\n[end]");
    let mut request = BlockEditRequest::new(
        patterns(&[r"^\[a\]$"]),
        patterns(&[r"^\[end\]$"]),
        Marker::Patterns(patterns(&["^k="])),
        "k=0",
    );

    let mut starts = Vec::new();
    let mut cursor = 0;
    while let Some(outcome) = block::apply(&path, &request).unwrap() {
        starts.push(outcome.start_line);
        cursor = outcome.next_resume.max(cursor + 1);
        request = request.resume_from(cursor);
    }

    assert_eq!(starts, vec![0, 3]);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "[a]\nk=0\n[end]\n[a]\nk=0\n[end]"
    );
}
