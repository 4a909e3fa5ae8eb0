use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use scour::{
    Finder, ParallelScan, ScanReport, ScanSink, SearchConfig,
};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Recursively search file contents for a pattern.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pattern to search for (regex)
    #[arg(short = 'p', long = "pattern")]
    pattern: String,

    /// Folder to scan recursively
    #[arg(short = 'F', long, default_value = ".")]
    folder: PathBuf,

    /// Scan a single file instead of a folder tree
    #[arg(short = 'f', long)]
    file: Option<PathBuf>,

    /// Select lines that do NOT match the pattern
    #[arg(short = 'n', long = "not")]
    negate: bool,

    /// Reject lines matching this pattern even when the main pattern matches
    #[arg(short = 'u', long)]
    unless: Option<String>,

    /// Case-insensitive matching
    #[arg(short = 'i', long)]
    ignore_case: bool,

    /// Multiline pattern semantics
    #[arg(short = 'm', long)]
    multiline: bool,

    /// Match the whole file text, one result per match
    #[arg(long)]
    whole_text: bool,

    /// Only files whose name matches this pattern
    #[arg(short = 'I', long)]
    include: Option<String>,

    /// Only files whose extension ends with this suffix (ignored with --include)
    #[arg(long)]
    include_ext: Option<String>,

    /// Skip files whose name matches this pattern
    #[arg(short = 'X', long)]
    exclude: Option<String>,

    /// Skip files whose extension ends with this suffix (ignored with --exclude)
    #[arg(long)]
    exclude_ext: Option<String>,

    /// Scan across a worker pool with live progress
    #[arg(short = 't', long)]
    threaded: bool,

    /// Number of workers when threaded
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// Print the report as JSON instead of plain text
    #[arg(long)]
    json: bool,

    /// Print elapsed time and tallies
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Path to a config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn to_search_config(&self) -> SearchConfig {
        SearchConfig {
            pattern: self.pattern.clone(),
            negate: self.negate,
            unless: self.unless.clone(),
            ignore_case: self.ignore_case,
            multiline: self.multiline,
            whole_text: self.whole_text,
            include: self.include.clone(),
            include_ext: self.include_ext.clone(),
            exclude: self.exclude.clone(),
            exclude_ext: self.exclude_ext.clone(),
            root_path: self.folder.clone(),
            threaded: self.threaded,
            thread_count: self.threads.unwrap_or_else(|| {
                NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::new(1).unwrap())
            }),
            log_level: self.log_level.clone(),
        }
    }
}

/// Counts files as the scan visits them and records skipped paths, for
/// the verbose tally and the report's error list.
#[derive(Default)]
struct TallySink {
    files: AtomicUsize,
    failures: Mutex<Vec<(PathBuf, String)>>,
}

impl TallySink {
    fn record(&self, path: &Path, error: &scour::ScourError) {
        eprintln!("{}: {}", path.display().to_string().red(), error);
        if let Ok(mut failures) = self.failures.lock() {
            failures.push((path.to_path_buf(), error.to_string()));
        }
    }
}

impl ScanSink for TallySink {
    fn file_done(&self, _file: &Path) {
        self.files.fetch_add(1, Ordering::Relaxed);
    }

    fn file_error(&self, file: &Path, error: &scour::ScourError) {
        self.record(file, error);
    }

    fn folder_error(&self, folder: &Path, error: &scour::ScourError) {
        self.record(folder, error);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone())),
        )
        .init();

    let config = match &cli.config {
        Some(path) => SearchConfig::load_from(Some(path))
            .context("failed to load config file")?
            .merge_with_cli(cli.to_search_config()),
        None => cli.to_search_config(),
    };

    if config.pattern.is_empty() {
        bail!("a search pattern is required");
    }

    let started = Instant::now();

    if let Some(file) = &cli.file {
        scan_single_file(&config, file)?;
    } else if config.threaded {
        let report = ParallelScan::from_config(&config)?.run();
        print_report(&report, cli.json, cli.verbose)?;
    } else {
        let report = scan_plain(&config, cli.json)?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else if cli.verbose {
            println!(
                "\nFound {} matching lines in {} of {} files",
                report.lines_matched, report.files_matched, report.files_searched
            );
        }
    }

    if cli.verbose {
        println!(
            "Elapsed time: {}",
            humantime::format_duration(started.elapsed())
        );
    }

    Ok(())
}

/// Lists the admitted lines of one file; with `--not` these are the lines
/// that do NOT contain the pattern.
fn scan_single_file(config: &SearchConfig, file: &Path) -> Result<()> {
    let finder = Finder::from_config(config)?;
    let lines = scour::tree::read_lines(file)?;
    let pad = lines.len().to_string().len();

    for (index, line) in lines.iter().enumerate() {
        if !finder.match_line(line) {
            continue;
        }
        let number = format!("{:>pad$}", index + 1);
        match finder.match_spans(line) {
            Some(spans) => println!("{}: {}", number.green(), highlight(line, &spans)),
            None => println!("{}: {}", number.green(), line),
        }
    }
    Ok(())
}

/// Deterministic in-order scan, rendering matches as they stream.
fn scan_plain(config: &SearchConfig, quiet: bool) -> Result<ScanReport> {
    let finder = Finder::from_config(config)?;
    let sink = TallySink::default();
    let mut report = ScanReport::new();
    let mut pad = 1;
    let mut current_file: Option<PathBuf> = None;

    for result in finder.scan_tree_with(&config.root_path, &sink) {
        if !quiet {
            if let Some(folder) = &result.folder {
                let indent = "  ".repeat(result.indent_level);
                println!("{indent}{}", folder.display().to_string().blue().bold());
            }
            if let Some(count) = result.line_count {
                pad = count.to_string().len().max(1);
            }
            if current_file.as_deref() != Some(result.file.as_path()) {
                current_file = Some(result.file.clone());
                let indent = "  ".repeat(result.indent_level + 1);
                println!("{indent}{}", result.file.display().to_string().cyan());
            }
            let indent = "  ".repeat(result.indent_level + 2);
            match result.line_number {
                Some(n) => {
                    let number = format!("{n:>pad$}");
                    println!(
                        "{indent}{}: {}",
                        number.green(),
                        highlight(&result.line, &result.spans)
                    );
                }
                None => println!("{indent}{}", highlight(&result.line, &result.spans)),
            }
        }
        report.lines_matched += 1;
        report.results.push(result);
    }

    report.files_searched = sink.files.load(Ordering::Relaxed);
    if let Ok(failures) = sink.failures.lock() {
        for (path, reason) in failures.iter() {
            report.add_failure(path.clone(), reason.clone());
        }
    }
    report.files_matched = {
        let mut files: Vec<_> = report.results.iter().map(|r| r.file.clone()).collect();
        files.dedup();
        files.len()
    };
    Ok(report)
}

/// Rebuilds `line` with each match span emphasized.
fn highlight(line: &str, spans: &[scour::MatchSpan]) -> String {
    let mut out = String::with_capacity(line.len());
    let mut cursor = 0;
    for span in spans {
        if span.start >= cursor && span.end() <= line.len() {
            out.push_str(&line[cursor..span.start]);
            out.push_str(&line[span.start..span.end()].red().bold().to_string());
            cursor = span.end();
        }
    }
    out.push_str(&line[cursor..]);
    out
}

fn print_report(report: &ScanReport, json: bool, verbose: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "\nFound {} matching lines in {} of {} files",
        report.lines_matched, report.files_matched, report.files_searched
    );
    if verbose || !report.errors.is_empty() {
        for failure in &report.errors {
            eprintln!(
                "{}: {}",
                failure.path.display().to_string().red(),
                failure.reason
            );
        }
    }
    Ok(())
}
