//! Scan orchestration: the finder driven across the job pool, reporting
//! through the progress board.
//!
//! The root job walks the folder tree, enqueueing one job per admitted
//! file as it goes; file jobs scan, render, and fold their results into
//! the shared report. Dispatch returns only at pool quiescence, so the
//! report is complete when [`ParallelScan::run`] hands it back. With
//! `threaded` disabled the queue drains synchronously in FIFO order and
//! the report ordering is the deterministic depth-first traversal.

use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::config::SearchConfig;
use crate::errors::{ScourError, ScourResult};
use crate::finder::{Finder, NullSink, ScanSink};
use crate::pool::{JobHandle, JobPool};
use crate::progress::{LogColors, ProgressBoard};
use crate::results::{FindResult, ScanReport};
use crate::tree;

#[derive(Default)]
struct SharedState {
    report: ScanReport,
    announced: HashSet<PathBuf>,
}

struct ScanCtx<W: Write + Send> {
    finder: Finder,
    board: ProgressBoard<W>,
    handle: JobHandle,
    sink: Box<dyn ScanSink + Send + Sync>,
    // One lock covers the report and the announced-folder set so the
    // first result pushed from a folder is always the one carrying its
    // announcement, even when that folder's files race across workers.
    shared: Mutex<SharedState>,
}

/// A full scan invocation: finder + job pool + progress board.
pub struct ParallelScan<W: Write + Send + 'static> {
    ctx: Arc<ScanCtx<W>>,
    pool: JobPool,
    root: PathBuf,
}

impl ParallelScan<io::Stdout> {
    /// A scan rendering to the attached terminal, sized to the pool.
    pub fn from_config(config: &SearchConfig) -> ScourResult<Self> {
        let workers = pool_for(config).worker_count();
        let board = ProgressBoard::stdout(workers).map_err(ScourError::IoError)?;
        Self::with_board(config, board)
    }
}

impl<W: Write + Send + 'static> ParallelScan<W> {
    pub fn with_board(config: &SearchConfig, board: ProgressBoard<W>) -> ScourResult<Self> {
        Self::with_board_and_sink(config, board, Box::new(NullSink))
    }

    /// Test/observer seam: explicit board and event sink. Sink callbacks
    /// are delivered serialized, under the scan's shared lock.
    pub fn with_board_and_sink(
        config: &SearchConfig,
        board: ProgressBoard<W>,
        sink: Box<dyn ScanSink + Send + Sync>,
    ) -> ScourResult<Self> {
        let finder = Finder::from_config(config)?;
        let pool = pool_for(config);
        let handle = pool.handle();
        Ok(Self {
            ctx: Arc::new(ScanCtx {
                finder,
                board,
                handle,
                sink,
                shared: Mutex::new(SharedState::default()),
            }),
            pool,
            root: config.root_path.clone(),
        })
    }

    /// Runs the scan to completion and returns the aggregated report.
    pub fn run(self) -> ScanReport {
        info!("Starting scan of {}", self.root.display());

        let ctx = self.ctx.clone();
        let root = self.root.clone();
        self.pool.enqueue(move |_affinity| walk_folder(&ctx, &root, 0));
        self.pool.dispatch();

        let mut state = self.ctx.shared.lock().expect("scan lock poisoned");
        let report = std::mem::take(&mut state.report);
        info!(
            "Scan complete: {} matching lines in {} of {} files",
            report.lines_matched, report.files_matched, report.files_searched
        );
        report
    }
}

fn pool_for(config: &SearchConfig) -> JobPool {
    JobPool::sized(config.threaded, config.thread_count.get())
}

/// Walks `folder` depth-first, enqueueing one job per admitted file.
/// Enumeration failures skip the subtree; siblings continue.
fn walk_folder<W: Write + Send + 'static>(ctx: &Arc<ScanCtx<W>>, folder: &Path, indent: usize) {
    let files = match tree::list_files(folder) {
        Ok(files) => files,
        Err(e) => {
            record_folder_failure(ctx, folder, &e);
            return;
        }
    };

    for file in files {
        if !ctx.finder.match_file(&file) {
            continue;
        }
        let job_ctx = ctx.clone();
        let folder = folder.to_path_buf();
        ctx.handle
            .enqueue(move |affinity| scan_one_file(&job_ctx, &file, &folder, indent, affinity));
    }

    let subfolders = match tree::list_subfolders(folder) {
        Ok(subfolders) => subfolders,
        Err(e) => {
            record_folder_failure(ctx, folder, &e);
            return;
        }
    };

    for subfolder in subfolders {
        walk_folder(ctx, &subfolder, indent + 1);
    }
}

fn scan_one_file<W: Write + Send + 'static>(
    ctx: &ScanCtx<W>,
    file: &Path,
    folder: &Path,
    indent: usize,
    affinity: usize,
) {
    let label = tree::file_label(file);
    let _ = ctx.board.worker_status(affinity, &label, "scanning");

    let scan = match ctx.finder.scan_file(file) {
        Ok(scan) => scan,
        Err(e) => {
            {
                let mut state = ctx.shared.lock().expect("scan lock poisoned");
                state.report.add_failure(file, e.to_string());
            }
            let _ = ctx
                .board
                .log(&format!("{}: {}", file.display(), e), LogColors::error());
            let _ = ctx.board.worker_status(affinity, &label, "error");
            ctx.sink.file_error(file, &e);
            return;
        }
    };

    let mut results: Vec<FindResult> = scan
        .map(|mut result| {
            result.indent_level = indent;
            result
        })
        .collect();
    let count = results.len();
    let display: Vec<String> = results.iter().map(|r| format_match(&label, r)).collect();

    let announce = {
        let mut state = ctx.shared.lock().expect("scan lock poisoned");
        let mut announce = false;
        if !results.is_empty() && state.announced.insert(folder.to_path_buf()) {
            results[0].folder = Some(folder.to_path_buf());
            ctx.sink.folder_matched(folder);
            announce = true;
        }
        state.report.add_file(results);
        announce
    };

    if announce {
        let _ = ctx
            .board
            .log(&folder.display().to_string(), LogColors::highlight());
    }
    for line in &display {
        let _ = ctx.board.log(line, LogColors::plain());
    }
    let _ = ctx
        .board
        .worker_status(affinity, &label, &format!("{count} matches"));
    ctx.sink.file_done(file);
}

fn record_folder_failure<W: Write + Send>(ctx: &ScanCtx<W>, folder: &Path, error: &ScourError) {
    {
        let mut state = ctx.shared.lock().expect("scan lock poisoned");
        state.report.add_failure(folder, error.to_string());
    }
    let _ = ctx
        .board
        .log(&format!("{}: {}", folder.display(), error), LogColors::error());
    ctx.sink.folder_error(folder, error);
}

fn format_match(label: &str, result: &FindResult) -> String {
    match result.line_number {
        Some(n) => format!("{label}:{n}: {}", result.line),
        None => format!("{label}: {}", result.line),
    }
}
