use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use lineinfile::config::{
    apply_operation, apply_plan, load_from_path, BlockOperation, ExtractOperation, LineOperation,
    MarkerSpec, Operation, ReplaceOperation, StateSpec,
};
use lineinfile::line::grep;
use lineinfile::report::Report;
use lineinfile::walk::{collect_files, FileFilter, DEFAULT_EXCLUDE};
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "lineinfile")]
#[command(about = "Edit lines and blocks of text files in place", long_about = None)]
#[command(version)]
struct Cli {
    /// File or directory to edit, `-` to grep stdin, or the plan file for `apply`
    path: PathBuf,

    /// Operation to run
    #[arg(short = 'c', long = "cmd", value_enum, default_value_t = Command::Lineinfile)]
    cmd: Command,

    /// Insert after the last line matching this regex (`BOF`/`EOF` allowed).
    /// For blockinfile: JSON list of upper boundary patterns
    #[arg(short = 'a', long = "insertafter")]
    insert_after: Option<String>,

    /// Insert before the last line matching this regex (`BOF`/`EOF` allowed).
    /// For blockinfile: JSON list of lower boundary patterns
    #[arg(short = 'b', long = "insertbefore")]
    insert_before: Option<String>,

    /// Line to write; replacement text for search_replace and blockinfile
    #[arg(short = 'l', long, default_value = "")]
    line: String,

    /// Regex locating the line. For blockinfile: JSON list of marker
    /// patterns, or a 1-based line number
    #[arg(short = 'r', long)]
    regexp: Option<String>,

    /// Literal substring locating the line
    #[arg(short = 's', long = "search-string", visible_alias = "search_string")]
    search_string: Option<String>,

    /// 1-based line number to replace or remove
    #[arg(short = 'n', long)]
    line_number: Option<usize>,

    #[arg(short = 'S', long, value_enum, default_value_t = State::Present)]
    state: State,

    /// Keep the pre-edit content in `<file>.bak`
    #[arg(long)]
    backup: bool,

    /// Exit non-zero when no file changed
    #[arg(long = "errorifnochange")]
    error_if_no_change: bool,

    /// Number of blocks each file must contain (blockinfile); implies --backup
    #[arg(long)]
    expected: Option<usize>,

    /// With --regexp, replace every matching line instead of the last one
    #[arg(long)]
    replace_all: bool,

    /// Maximum replacements per file for search_replace
    #[arg(long)]
    count: Option<usize>,

    /// Print the lines matching this regex
    #[arg(short = 'g', long)]
    grep: Option<String>,

    /// File name regex for directory walks
    #[arg(short = 'f', long = "fptn", default_value = ".*")]
    file_pattern: String,

    /// File or directory names to skip
    #[arg(short = 'e', long, default_value = "")]
    exclude: String,

    /// Names skipped by default; pass an empty string to disable
    #[arg(short = 'd', long = "defaultexclude", default_value = DEFAULT_EXCLUDE)]
    default_exclude: String,

    /// Skip files that look binary
    #[arg(short = 'y', long = "skipbinary")]
    skip_binary: bool,

    /// Log the parsed operation and per-file progress
    #[arg(long)]
    debug: bool,

    /// Show a diff of each change on stderr
    #[arg(long)]
    diff: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Command {
    Lineinfile,
    #[value(name = "search_replace", alias = "replace")]
    SearchReplace,
    Blockinfile,
    Extract,
    /// Run a TOML edit plan
    Apply,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum State {
    Present,
    Absent,
    Print,
    Keepboundary,
    Includeboundary,
    Extract,
}

fn main() -> Result<()> {
    let mut cli = Cli::parse();
    if let Err(e) = lineinfile::logging::init(cli.debug) {
        eprintln!("warning: logging disabled: {e}");
    }

    if cli.path.as_os_str() == "-" {
        return cmd_grep_stdin(&cli);
    }
    if cli.cmd == Command::Apply {
        return cmd_apply(&cli.path, cli.diff, cli.error_if_no_change);
    }

    if let Some(pattern) = cli.grep.take() {
        cli.cmd = Command::Lineinfile;
        cli.state = State::Print;
        cli.regexp = Some(pattern);
        cli.search_string = None;
        cli.backup = false;
        cli.line.clear();
    }

    let operation = build_operation(&cli)?;
    operation.check().context("invalid options")?;
    tracing::debug!(cmd = ?cli.cmd, operation = ?operation, "parsed request");

    cmd_edit(&cli, &operation)
}

fn parse_patterns(flag: &str, raw: Option<&str>) -> Result<Vec<String>> {
    match raw {
        None => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(raw)
            .with_context(|| format!("{flag} must be a JSON list of patterns, got {raw}")),
    }
}

fn parse_marker(cli: &Cli) -> Result<MarkerSpec> {
    let marker = match (&cli.regexp, cli.line_number) {
        (Some(raw), _) => serde_json::from_str(raw).with_context(|| {
            format!("--regexp must be a JSON list of patterns or a line number, got {raw}")
        })?,
        (None, Some(number)) => MarkerSpec::Line(number),
        (None, None) => MarkerSpec::default(),
    };
    if marker.is_empty() {
        bail!("blockinfile needs a marker (--regexp)");
    }
    Ok(marker)
}

fn build_operation(cli: &Cli) -> Result<Operation> {
    let counts_blocks = cli.cmd == Command::Blockinfile && cli.state != State::Extract;
    if cli.expected.is_some() && !counts_blocks {
        bail!("--expected only applies to blockinfile edits");
    }

    let block_state = match cli.cmd {
        Command::Lineinfile => {
            let state = match cli.state {
                State::Present => StateSpec::Present,
                State::Absent => StateSpec::Absent,
                State::Print => StateSpec::Print,
                other => bail!("state {other:?} is only valid for blockinfile"),
            };
            return Ok(Operation::Line(LineOperation {
                line: cli.line.clone(),
                search_string: cli.search_string.clone(),
                regexp: cli.regexp.clone(),
                line_number: cli.line_number,
                insert_after: cli.insert_after.clone(),
                insert_before: cli.insert_before.clone(),
                state,
                backup: cli.backup,
                replace_all: cli.replace_all,
            }));
        }
        Command::SearchReplace => {
            let pattern = match cli.regexp.as_deref() {
                Some(pattern) if !pattern.is_empty() => pattern.to_string(),
                _ => bail!("search_replace needs a pattern (--regexp)"),
            };
            return Ok(Operation::Replace(ReplaceOperation {
                pattern,
                replacement: cli.line.clone(),
                count: cli.count,
                backup: cli.backup,
            }));
        }
        Command::Apply => bail!("apply takes a plan file and no edit options"),
        Command::Extract => State::Extract,
        Command::Blockinfile => cli.state,
    };

    let upper_bound = parse_patterns("--insertafter", cli.insert_after.as_deref())?;
    let lower_bound = parse_patterns("--insertbefore", cli.insert_before.as_deref())?;
    let marker = parse_marker(cli)?;

    match block_state {
        State::Extract => Ok(Operation::Extract(ExtractOperation {
            upper_bound,
            lower_bound,
            marker,
        })),
        State::Present | State::Keepboundary | State::Includeboundary => {
            Ok(Operation::Block(BlockOperation {
                upper_bound,
                lower_bound,
                marker,
                replacement: cli.line.clone(),
                keep_boundary: block_state != State::Includeboundary,
                // --expected implies --backup
                backup: cli.backup || cli.expected.is_some(),
            }))
        }
        other => bail!("state {other:?} is not valid for blockinfile"),
    }
}

fn display_diff(file: &Path, original: &str, modified: &str) {
    eprintln!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    eprintln!("{}", format!("+++ {} (edited)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        eprint!("{}", sign);
    }
    if !modified.ends_with('\n') {
        eprintln!();
    }
}

fn show_diff_if_changed(file: &Path, before: Option<&str>) {
    let Some(before) = before else { return };
    if let Ok(after) = fs::read_to_string(file) {
        if before != after {
            display_diff(file, before, &after);
        }
    }
}

fn finish(report: &Report, error_if_no_change: bool) -> Result<()> {
    println!("{}", report.to_json()?);
    if error_if_no_change && !report.any_changed() {
        eprintln!("{} expected a change but no file changed", "✗".red());
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_grep_stdin(cli: &Cli) -> Result<()> {
    let pattern = match cli.grep.as_deref().or(cli.regexp.as_deref()) {
        Some(pattern) => pattern,
        None => bail!("grepping stdin needs a pattern (--grep or --regexp)"),
    };
    let pattern = regex::Regex::new(pattern).with_context(|| format!("invalid pattern {pattern}"))?;

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;
    print!("{}", grep(&input, &pattern).join("\n"));
    Ok(())
}

fn cmd_edit(cli: &Cli, operation: &Operation) -> Result<()> {
    let files = if cli.path.exists() {
        let filter = FileFilter::new(
            &cli.file_pattern,
            &cli.exclude,
            &cli.default_exclude,
            cli.skip_binary,
        )
        .context("invalid file filter")?;
        collect_files(&cli.path, &filter)
    } else {
        // Line edits create the file; everything else reports it missing.
        vec![cli.path.clone()]
    };
    tracing::debug!(files = files.len(), "collected targets");

    let mut report = Report::new();
    for file in files {
        let before = if cli.diff {
            fs::read_to_string(&file).ok()
        } else {
            None
        };

        match apply_operation(&file, operation, cli.expected) {
            Ok(file_report) => {
                report.insert(file.display().to_string(), file_report);
            }
            Err(e) if e.is_fatal() => {
                println!("{}", report.to_json()?);
                eprintln!("{} {}", "✗".red(), e);
                std::process::exit(1);
            }
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "edit failed");
                report.insert(file.display().to_string(), e.to_report(operation));
            }
        }

        show_diff_if_changed(&file, before.as_deref());
    }

    let modifies = !matches!(
        operation,
        Operation::Extract(_) | Operation::Line(LineOperation { state: StateSpec::Print, .. })
    );
    finish(&report, cli.error_if_no_change && modifies)
}

fn cmd_apply(plan_path: &Path, show_diff: bool, error_if_no_change: bool) -> Result<()> {
    let plan = load_from_path(plan_path)?;
    let plan_dir = plan_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    if !plan.meta.name.is_empty() {
        eprintln!("Applying plan {}...", plan.meta.name.bold());
    }

    let mut before = Vec::new();
    if show_diff {
        for edit in &plan.edits {
            let target = lineinfile::config::resolve_target(&plan, &edit.file, &plan_dir);
            before.push(fs::read_to_string(&target).ok());
        }
    }

    let results = apply_plan(&plan, &plan_dir);

    let mut report = Report::new();
    let mut failed = 0;
    for (idx, (id, target, result)) in results.into_iter().enumerate() {
        let operation = &plan.edits[idx].operation;
        match result {
            Ok(file_report) => {
                let mark = if file_report.changed() {
                    "✓".green()
                } else {
                    "⊙".yellow()
                };
                eprintln!("{} {}: {}", mark, id, target.display());
                report.insert(id, file_report);
            }
            Err(e) => {
                eprintln!("{} {}: Error - {}", "✗".red(), id, e);
                report.insert(id, e.to_report(operation));
                failed += 1;
                if e.is_fatal() {
                    println!("{}", report.to_json()?);
                    std::process::exit(1);
                }
            }
        }
        // Edits run in order, so a later edit on the same file shows its
        // cumulative diff.
        if let Some(Some(content)) = before.get(idx) {
            show_diff_if_changed(&target, Some(content.as_str()));
        }
    }

    if failed > 0 {
        println!("{}", report.to_json()?);
        std::process::exit(1);
    }
    finish(&report, error_if_no_change)
}
