//! Live terminal progress: one status row per worker above a scrolling
//! log region.
//!
//! The board owns its terminal region for the lifetime of one scan and is
//! the only writer to it. Every operation takes the same mutex, so
//! concurrent workers can never interleave partial writes; terminal output
//! is the bottleneck anyway, so coarse locking costs nothing.

use crossterm::{
    cursor,
    queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal,
};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::Mutex;

/// Foreground/background pair for one log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogColors {
    pub fg: Color,
    pub bg: Color,
}

impl LogColors {
    pub fn new(fg: Color, bg: Color) -> Self {
        Self { fg, bg }
    }

    /// Default text colors.
    pub fn plain() -> Self {
        Self::new(Color::White, Color::Black)
    }

    /// Inverse colors for emphasized entries.
    pub fn highlight() -> Self {
        Self::new(Color::Black, Color::White)
    }

    /// Error entries.
    pub fn error() -> Self {
        Self::new(Color::Red, Color::Black)
    }
}

/// Fixed screen geometry, computed once at construction.
///
/// Rows `0..worker_count` hold the worker status lines, the next row the
/// header/separator, and the remaining `log_height` rows the scrolling
/// log.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub width: usize,
    pub height: usize,
    pub left_width: usize,
    pub right_width: usize,
    pub log_start: usize,
    pub log_height: usize,
}

impl Layout {
    pub fn new(width: usize, height: usize, worker_count: usize) -> Self {
        let left_width = width / 3;
        let right_width = width.saturating_sub(left_width + 3);
        let log_start = worker_count + 1;
        let log_height = height.saturating_sub(log_start);
        Self {
            width,
            height,
            left_width,
            right_width,
            log_start,
            log_height,
        }
    }

    /// Geometry from the attached terminal, with an 80x24 fallback.
    pub fn detect(worker_count: usize) -> Self {
        let (width, height) = terminal::size().unwrap_or((80, 24));
        Self::new(width as usize, height as usize, worker_count)
    }
}

struct BoardInner<W: Write> {
    out: W,
    worker_rows: Vec<String>,
    log: VecDeque<(String, LogColors)>,
}

/// Shared terminal renderer for a pool of workers.
pub struct ProgressBoard<W: Write> {
    layout: Layout,
    inner: Mutex<BoardInner<W>>,
}

impl ProgressBoard<io::Stdout> {
    /// A board on stdout sized to the attached terminal. Hides the cursor
    /// until the board is dropped.
    pub fn stdout(worker_count: usize) -> io::Result<Self> {
        Self::with_layout(Layout::detect(worker_count), io::stdout(), worker_count)
    }
}

impl<W: Write> ProgressBoard<W> {
    /// A board with explicit geometry writing to `out`; this is also the
    /// test seam.
    pub fn with_layout(layout: Layout, mut out: W, worker_count: usize) -> io::Result<Self> {
        queue!(out, cursor::Hide)?;

        // Header row, written once and never scrolled.
        let header = format!(
            "{}|{}",
            "-".repeat(layout.left_width + 1),
            "-".repeat(layout.right_width)
        );
        write_at(
            &mut out,
            worker_count,
            &header,
            LogColors::highlight(),
        )?;
        out.flush()?;

        Ok(Self {
            layout,
            inner: Mutex::new(BoardInner {
                out,
                worker_rows: vec![String::new(); worker_count],
                log: VecDeque::new(),
            }),
        })
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Overwrites worker `affinity`'s status row with a two-column
    /// "current item | status" line.
    pub fn worker_status(&self, affinity: usize, item: &str, status: &str) -> io::Result<()> {
        let row = two_columns(item, status, self.layout.left_width, self.layout.right_width);

        let mut inner = self.inner.lock().expect("board lock poisoned");
        if affinity >= inner.worker_rows.len() {
            return Ok(());
        }
        write_at(&mut inner.out, affinity, &row, LogColors::plain())?;
        inner.worker_rows[affinity] = row;
        inner.out.flush()
    }

    /// Appends one entry to the scrolling log, evicting the oldest entry
    /// once the region is full, and repaints the region.
    pub fn log(&self, message: &str, colors: LogColors) -> io::Result<()> {
        let mut inner = self.inner.lock().expect("board lock poisoned");

        if self.layout.log_height == 0 {
            return Ok(());
        }
        if inner.log.len() >= self.layout.log_height {
            inner.log.pop_front();
        }
        let entry = exactly(message, self.layout.width.max(1));
        inner.log.push_back((entry, colors));

        let log_start = self.layout.log_start;
        let entries: Vec<(String, LogColors)> = inner.log.iter().cloned().collect();
        for (offset, (text, entry_colors)) in entries.iter().enumerate() {
            write_at(&mut inner.out, log_start + offset, text, *entry_colors)?;
        }
        inner.out.flush()
    }

    /// Current log entries, oldest first. Introspection for consumers and
    /// tests; the terminal already shows the same content.
    pub fn log_snapshot(&self) -> Vec<String> {
        let inner = self.inner.lock().expect("board lock poisoned");
        inner
            .log
            .iter()
            .map(|(text, _)| text.trim_end().to_string())
            .collect()
    }

    /// Last rendered status row per worker.
    pub fn worker_snapshot(&self) -> Vec<String> {
        let inner = self.inner.lock().expect("board lock poisoned");
        inner.worker_rows.clone()
    }
}

impl<W: Write> Drop for ProgressBoard<W> {
    fn drop(&mut self) {
        // Restore terminal state on every exit path.
        if let Ok(mut inner) = self.inner.lock() {
            let _ = queue!(inner.out, ResetColor, cursor::Show);
            let _ = inner.out.flush();
        }
    }
}

fn write_at<W: Write>(out: &mut W, row: usize, message: &str, colors: LogColors) -> io::Result<()> {
    queue!(
        out,
        cursor::MoveTo(0, row.min(u16::MAX as usize) as u16),
        SetForegroundColor(colors.fg),
        SetBackgroundColor(colors.bg),
        Print(message),
    )
}

/// Truncates or pads `text` to exactly `width` characters.
fn exactly(text: &str, width: usize) -> String {
    let mut out: String = text.chars().take(width).collect();
    let have = out.chars().count();
    out.extend(std::iter::repeat(' ').take(width - have));
    out
}

fn two_columns(left: &str, right: &str, left_width: usize, right_width: usize) -> String {
    format!(
        "{} | {}",
        exactly(&format!(" {left}"), left_width),
        exactly(&format!(" {right}"), right_width)
    )
}
