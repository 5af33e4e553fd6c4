//! Integration tests for the command-line interface
//!
//! Runs the built binary against temporary files and checks the JSON report
//! on stdout, the edited files and the exit status.

use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn lineinfile(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lineinfile"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn report(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not a JSON report ({e}): {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_help() {
    let output = lineinfile(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Edit lines and blocks of text files in place"));
    assert!(stdout.contains("--insertafter"));
}

#[test]
fn test_lineinfile_regexp_replace() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("app.conf");
    fs::write(&file, "port = 80\nhost = a").unwrap();

    let output = lineinfile(&[path_str(&file), "-r", r"^port\s*=", "-l", "port = 8080"]);

    assert!(output.status.success());
    let value = report(&output);
    assert_eq!(value[path_str(&file)]["changed"], true);
    assert!(value[path_str(&file)]["error"].is_null());
    assert_eq!(fs::read_to_string(&file).unwrap(), "port = 8080\nhost = a");
}

#[test]
fn test_conflicting_options_fail_before_writing() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("app.conf");
    fs::write(&file, "a").unwrap();

    let output = lineinfile(&[path_str(&file), "-r", "a", "-s", "a", "-l", "b"]);

    assert!(!output.status.success());
    assert_eq!(fs::read_to_string(&file).unwrap(), "a");
}

#[test]
fn test_errorifnochange() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("app.conf");
    fs::write(&file, "present").unwrap();

    let output = lineinfile(&[path_str(&file), "-l", "present", "--errorifnochange"]);
    assert!(!output.status.success());
    assert_eq!(report(&output)[path_str(&file)]["changed"], false);

    let output = lineinfile(&[path_str(&file), "-l", "added", "--errorifnochange"]);
    assert!(output.status.success());
}

#[test]
fn test_creates_missing_file_for_present() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("new.conf");

    let output = lineinfile(&[path_str(&file), "-l", "first"]);

    assert!(output.status.success());
    assert_eq!(fs::read_to_string(&file).unwrap(), "first");
}

#[test]
fn test_grep_prints_matched_lines() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("log.txt");
    fs::write(&file, "ok\nerror: disk\nok\nerror: net").unwrap();

    let output = lineinfile(&[path_str(&file), "-g", "^error"]);

    assert!(output.status.success());
    let value = report(&output);
    let matched = &value[path_str(&file)]["matched_lines"];
    assert_eq!(matched["2"], "error: disk");
    assert_eq!(matched["4"], "error: net");
    assert_eq!(
        fs::read_to_string(&file).unwrap(),
        "ok\nerror: disk\nok\nerror: net"
    );
}

#[test]
fn test_grep_stdin() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_lineinfile"))
        .args(["-", "-g", "b"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"abc\nxyz\nbcd")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "abc\nbcd");
}

#[test]
fn test_search_replace_counts() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("app.conf");
    fs::write(&file, "a=1\nb=1\nc=1\n").unwrap();

    let output = lineinfile(&[
        path_str(&file),
        "-c",
        "replace",
        "-r",
        r"=(\d)",
        "-l",
        "=$1$1",
        "--count",
        "2",
    ]);

    assert!(output.status.success());
    assert_eq!(report(&output)[path_str(&file)]["count"], 2);
    assert_eq!(fs::read_to_string(&file).unwrap(), "a=11\nb=11\nc=1\n");
}

#[test]
fn test_blockinfile_and_expected() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("hosts");
    let original = "# BEGIN\n10.0.0.1 db\n# END\nx\n# BEGIN\n10.0.0.2 db\n# END\n";
    fs::write(&file, original).unwrap();

    let args = [
        path_str(&file),
        "-c",
        "blockinfile",
        "-a",
        r#"["^# BEGIN$"]"#,
        "-b",
        r#"["^# END$"]"#,
        "-r",
        r#"["db$"]"#,
        "-l",
        "10.0.0.9 db",
    ];

    let mut mismatched = args.to_vec();
    mismatched.extend(["--expected", "1"]);
    let output = lineinfile(&mismatched);
    assert!(!output.status.success());

    fs::write(&file, original).unwrap();
    let mut matching = args.to_vec();
    matching.extend(["--expected", "2"]);
    let output = lineinfile(&matching);
    assert!(output.status.success());

    let value = report(&output);
    let changes = value[path_str(&file)]["changes"].as_array().unwrap();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[1]["start_line_no"], 4);
    assert_eq!(
        fs::read_to_string(&file).unwrap(),
        "# BEGIN\n10.0.0.9 db\n# END\nx\n# BEGIN\n10.0.0.9 db\n# END\n"
    );
    // --expected turns on the backup.
    assert_eq!(
        fs::read_to_string(dir.path().join("hosts.bak")).unwrap(),
        original
    );
}

#[test]
fn test_blockinfile_line_number_edits_one_block() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("hosts");
    fs::write(&file, "B\nold1\nold2\nold3\nE\nB\nkeep\nE").unwrap();

    let output = lineinfile(&[
        path_str(&file),
        "-c",
        "blockinfile",
        "-a",
        r#"["^B$"]"#,
        "-b",
        r#"["^E$"]"#,
        "-n",
        "4",
        "-l",
        "new",
        "--expected",
        "1",
    ]);

    assert!(output.status.success());
    let value = report(&output);
    assert_eq!(value[path_str(&file)]["changes"].as_array().unwrap().len(), 1);
    assert_eq!(
        fs::read_to_string(&file).unwrap(),
        "B\nnew\nE\nB\nkeep\nE"
    );
}

#[test]
fn test_expected_rejected_outside_blockinfile() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("app.conf");
    fs::write(&file, "a").unwrap();

    for args in [
        vec![path_str(&file), "-l", "b", "--expected", "1"],
        vec![path_str(&file), "-c", "replace", "-r", "a", "-l", "b", "--expected", "1"],
    ] {
        let output = lineinfile(&args);
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("--expected"));
    }
    assert_eq!(fs::read_to_string(&file).unwrap(), "a");
    assert!(!dir.path().join("app.conf.bak").exists());
}

#[test]
fn test_extract_does_not_write() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("vault.ini");
    let content = "[main]\na=1\n[vault]\npassword=x\nuser=y";
    fs::write(&file, content).unwrap();

    let output = lineinfile(&[
        path_str(&file),
        "-c",
        "blockinfile",
        "-S",
        "extract",
        "-a",
        r#"["^\\[vault\\]$"]"#,
        "-b",
        r#"["EOF"]"#,
        "-r",
        r#"["^password="]"#,
    ]);

    assert!(output.status.success());
    let value = report(&output);
    let blocks = value[path_str(&file)]["blocks"].as_array().unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0]["content"], "[vault]\npassword=x\nuser=y");
    assert_eq!(blocks[0]["content_no_boundary"], "password=x\nuser=y");
    assert_eq!(fs::read_to_string(&file).unwrap(), content);
}

#[test]
fn test_directory_walk_with_filters() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("conf")).unwrap();
    fs::write(root.join("conf/a.yaml"), "debug: true").unwrap();
    fs::write(root.join("conf/b.yaml"), "debug: true").unwrap();
    fs::write(root.join("conf/c.txt"), "debug: true").unwrap();

    let output = lineinfile(&[
        path_str(root),
        "-r",
        "^debug:",
        "-l",
        "debug: false",
        "-f",
        r"\.yaml$",
        "-e",
        r"^b\.yaml$",
    ]);

    assert!(output.status.success());
    let value = report(&output);
    assert_eq!(value.as_object().unwrap().len(), 1);
    assert_eq!(
        fs::read_to_string(root.join("conf/a.yaml")).unwrap(),
        "debug: false"
    );
    assert_eq!(
        fs::read_to_string(root.join("conf/b.yaml")).unwrap(),
        "debug: true"
    );
    assert_eq!(
        fs::read_to_string(root.join("conf/c.txt")).unwrap(),
        "debug: true"
    );
}

#[test]
fn test_apply_plan() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.conf"), "mode=dev\n").unwrap();
    let plan = dir.path().join("plan.toml");
    fs::write(
        &plan,
        r#"
[meta]
name = "prod"
relative_to_plan = true

[[edits]]
id = "mode"
file = "app.conf"

[edits.operation]
type = "line"
regexp = "^mode="
line = "mode=prod"
"#,
    )
    .unwrap();

    let output = lineinfile(&[path_str(&plan), "-c", "apply"]);

    assert!(output.status.success());
    assert_eq!(report(&output)["mode"]["changed"], true);
    assert_eq!(
        fs::read_to_string(dir.path().join("app.conf")).unwrap(),
        "mode=prod\n"
    );
}
