//! The search engine: lazy per-line (or per-span) scanning of files and
//! folder trees.
//!
//! Scans are single-pass iterators driven entirely by the consumer, so a
//! caller wanting only the first match pays for nothing past it. Folder
//! announcements are tracked with an explicit per-frame flag rather than
//! captured mutable state, which keeps the same logic reusable when files
//! are scanned concurrently.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::SearchConfig;
use crate::errors::{ScourResult, ScourError};
use crate::filters::{FileFilter, LineFilter};
use crate::results::{FindResult, MatchSpan};
use crate::tree;

/// How a file's contents are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// One result per admitted line, carrying all spans in that line.
    #[default]
    Lines,
    /// One result per match span over the whole file text; results carry
    /// no line number.
    WholeText,
}

/// Observer for discovery events fired while a scan runs.
///
/// Callbacks fire synchronously on the thread that made the discovery;
/// under a threaded scan that is a worker thread, so implementations must
/// be safe to call re-entrantly from several threads.
pub trait ScanSink: Sync {
    /// A folder yielded its first match.
    fn folder_matched(&self, _folder: &Path) {}
    /// A file finished processing.
    fn file_done(&self, _file: &Path) {}
    /// A file could not be read; it was skipped.
    fn file_error(&self, _file: &Path, _error: &ScourError) {}
    /// A folder could not be enumerated; its subtree was skipped.
    fn folder_error(&self, _folder: &Path, _error: &ScourError) {}
}

/// Sink that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ScanSink for NullSink {}

static NULL_SINK: NullSink = NullSink;

/// Matches a pattern against files under a folder tree.
#[derive(Debug, Clone)]
pub struct Finder {
    line_filter: LineFilter,
    file_filter: FileFilter,
    mode: ScanMode,
}

impl Finder {
    pub fn new(line_filter: LineFilter, file_filter: FileFilter, mode: ScanMode) -> Self {
        Self {
            line_filter,
            file_filter,
            mode,
        }
    }

    /// Builds the finder from config. Pattern compilation errors surface
    /// here, before any file I/O.
    pub fn from_config(config: &SearchConfig) -> ScourResult<Self> {
        let line_filter = LineFilter::from_config(config)?;
        let file_filter = FileFilter::from_config(config)?;
        let mode = if config.whole_text {
            ScanMode::WholeText
        } else {
            ScanMode::Lines
        };
        Ok(Self::new(line_filter, file_filter, mode))
    }

    /// Whether the line filter admits `line`.
    pub fn match_line(&self, line: &str) -> bool {
        self.line_filter.admit(line)
    }

    /// Match spans for `line`, if the non-negated pattern admits it.
    pub fn match_spans(&self, line: &str) -> Option<Vec<MatchSpan>> {
        self.line_filter.spans(line)
    }

    /// Whether the file filter admits `file`.
    pub fn match_file(&self, file: &Path) -> bool {
        self.file_filter.admit(file)
    }

    /// Scans one file lazily.
    ///
    /// The first yielded result carries the file's total line count; later
    /// results don't. Line numbers are 1-based and strictly increasing.
    pub fn scan_file(&self, file: &Path) -> ScourResult<FileScan> {
        let inner = match self.mode {
            ScanMode::Lines => {
                let lines = tree::read_lines(file)?;
                let line_count = lines.len();
                FileScanInner::Lines {
                    lines: lines.into_iter(),
                    line_number: 0,
                    line_count: Some(line_count),
                }
            }
            ScanMode::WholeText => {
                let text = tree::read_text(file)?;
                let line_count = text.lines().count();
                let spans = self
                    .line_filter
                    .spans(&text)
                    .unwrap_or_default()
                    .into_iter();
                FileScanInner::Text {
                    spans,
                    line_count: Some(line_count),
                }
            }
        };
        Ok(FileScan {
            filter: self.line_filter.clone(),
            file: file.to_path_buf(),
            inner,
        })
    }

    /// Scans a folder tree lazily: a folder's files first, then its
    /// subfolders, each one level deeper.
    pub fn scan_tree<'s>(&'s self, root: &Path) -> TreeScan<'s> {
        self.scan_tree_with(root, &NULL_SINK)
    }

    /// Like [`scan_tree`](Self::scan_tree) with an event sink. Per-file
    /// read errors are reported to the sink and the file skipped; folder
    /// enumeration failures skip that subtree.
    pub fn scan_tree_with<'s>(&'s self, root: &Path, sink: &'s dyn ScanSink) -> TreeScan<'s> {
        let mut stack = Vec::new();
        if let Some(frame) = FolderFrame::open(root, 0, sink) {
            stack.push(frame);
        }
        TreeScan {
            finder: self,
            sink,
            stack,
            current: None,
        }
    }
}

enum FileScanInner {
    Lines {
        lines: std::vec::IntoIter<String>,
        line_number: usize,
        line_count: Option<usize>,
    },
    Text {
        spans: std::vec::IntoIter<MatchSpan>,
        line_count: Option<usize>,
    },
}

/// Lazy stream of [`FindResult`]s from a single file.
pub struct FileScan {
    filter: LineFilter,
    file: PathBuf,
    inner: FileScanInner,
}

impl Iterator for FileScan {
    type Item = FindResult;

    fn next(&mut self) -> Option<FindResult> {
        match &mut self.inner {
            FileScanInner::Lines {
                lines,
                line_number,
                line_count,
            } => {
                for line in lines.by_ref() {
                    *line_number += 1;
                    if let Some(spans) = self.filter.spans(&line) {
                        let mut result = FindResult::new(self.file.clone(), line);
                        result.line_number = Some(*line_number);
                        result.line_count = line_count.take();
                        result.spans = spans;
                        return Some(result);
                    }
                }
                None
            }
            FileScanInner::Text { spans, line_count } => spans.next().map(|span| {
                let mut result = FindResult::new(self.file.clone(), span.text.clone());
                result.line_count = line_count.take();
                // The result's line is the matched text itself, so the
                // span is rebased from its whole-file offset.
                result.spans = vec![MatchSpan::new(&span.text, 0)];
                result
            }),
        }
    }
}

struct FolderFrame {
    folder: PathBuf,
    indent: usize,
    files: std::vec::IntoIter<PathBuf>,
    subfolders: std::vec::IntoIter<PathBuf>,
    announced: bool,
}

impl FolderFrame {
    /// Enumerates `folder`; a failure is reported to the sink and the
    /// subtree skipped.
    fn open(folder: &Path, indent: usize, sink: &dyn ScanSink) -> Option<Self> {
        let files = match tree::list_files(folder) {
            Ok(files) => files,
            Err(e) => {
                sink.folder_error(folder, &e);
                return None;
            }
        };
        let subfolders = match tree::list_subfolders(folder) {
            Ok(subfolders) => subfolders,
            Err(e) => {
                sink.folder_error(folder, &e);
                return None;
            }
        };
        debug!(
            "Entering {} ({} files, {} subfolders)",
            folder.display(),
            files.len(),
            subfolders.len()
        );
        Some(Self {
            folder: folder.to_path_buf(),
            indent,
            files: files.into_iter(),
            subfolders: subfolders.into_iter(),
            announced: false,
        })
    }
}

/// Lazy, single-pass stream of [`FindResult`]s from a folder tree.
pub struct TreeScan<'s> {
    finder: &'s Finder,
    sink: &'s dyn ScanSink,
    stack: Vec<FolderFrame>,
    current: Option<FileScan>,
}

impl Iterator for TreeScan<'_> {
    type Item = FindResult;

    fn next(&mut self) -> Option<FindResult> {
        loop {
            if let Some(scan) = &mut self.current {
                if let Some(mut result) = scan.next() {
                    let frame = self
                        .stack
                        .last_mut()
                        .expect("current file always has an owning frame");
                    result.indent_level = frame.indent;
                    if !frame.announced {
                        frame.announced = true;
                        result.folder = Some(frame.folder.clone());
                        self.sink.folder_matched(&frame.folder);
                    }
                    return Some(result);
                }
                let finished = self.current.take().expect("checked above");
                self.sink.file_done(&finished.file);
            }

            let frame = self.stack.last_mut()?;

            if let Some(file) = frame.files.next() {
                if !self.finder.match_file(&file) {
                    continue;
                }
                match self.finder.scan_file(&file) {
                    Ok(scan) => self.current = Some(scan),
                    Err(e) => self.sink.file_error(&file, &e),
                }
                continue;
            }

            if let Some(subfolder) = frame.subfolders.next() {
                let indent = frame.indent + 1;
                if let Some(child) = FolderFrame::open(&subfolder, indent, self.sink) {
                    self.stack.push(child);
                }
                continue;
            }

            self.stack.pop();
        }
    }
}
