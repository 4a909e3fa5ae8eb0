use serde::Serialize;
use std::path::PathBuf;

/// A single match occurrence within a line or block of text.
///
/// Offsets are zero-based byte positions into the text the span was found
/// in; spans are produced left to right and never overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchSpan {
    /// The matched substring
    pub text: String,
    /// Start offset of the match
    pub start: usize,
    /// Length of the match
    pub len: usize,
}

impl MatchSpan {
    pub fn new(text: &str, start: usize) -> Self {
        Self {
            text: text.to_string(),
            start,
            len: text.len(),
        }
    }

    /// End offset of the match (exclusive)
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// One record yielded by a scan: a matching line, annotated with discovery
/// context.
///
/// Every yield is an owned value; mutating a returned record never affects
/// subsequent ones.
#[derive(Debug, Clone, Serialize)]
pub struct FindResult {
    /// The file the match was found in
    pub file: PathBuf,
    /// 1-based line number; `None` for whole-text matches
    pub line_number: Option<usize>,
    /// The matching line (or matched block in whole-text mode)
    pub line: String,
    /// Total line count of the file, populated only on the file's first
    /// result so consumers can size their line-number padding
    pub line_count: Option<usize>,
    /// Match spans within `line`, in order
    pub spans: Vec<MatchSpan>,
    /// Folder announcement: set at most once per folder, on the first
    /// result that folder yields
    pub folder: Option<PathBuf>,
    /// Depth of the owning folder below the scan root
    pub indent_level: usize,
}

impl FindResult {
    pub fn new(file: impl Into<PathBuf>, line: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line_number: None,
            line: line.into(),
            line_count: None,
            spans: Vec::new(),
            folder: None,
            indent_level: 0,
        }
    }
}

/// Aggregate outcome of one scan invocation.
///
/// Errors are carried alongside the results so a failed file is
/// distinguishable from a file with no matches.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Every match record, in discovery order
    pub results: Vec<FindResult>,
    /// Number of files scanned
    pub files_searched: usize,
    /// Number of files that yielded at least one match
    pub files_matched: usize,
    /// Total matching lines
    pub lines_matched: usize,
    /// Per-path failures, reported and skipped during the scan
    pub errors: Vec<ScanFailure>,
}

/// A file or folder the scan had to skip, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl ScanReport {
    pub fn new() -> Self {
        Default::default()
    }

    /// Folds one file's results into the report.
    pub fn add_file(&mut self, results: Vec<FindResult>) {
        self.files_searched += 1;
        if !results.is_empty() {
            self.files_matched += 1;
            self.lines_matched += results.len();
        }
        self.results.extend(results);
    }

    pub fn add_failure(&mut self, path: impl Into<PathBuf>, reason: impl Into<String>) {
        self.errors.push(ScanFailure {
            path: path.into(),
            reason: reason.into(),
        });
    }

    /// Merges another report into this one.
    pub fn merge(&mut self, other: ScanReport) {
        self.files_searched += other.files_searched;
        self.files_matched += other.files_matched;
        self.lines_matched += other.lines_matched;
        self.results.extend(other.results);
        self.errors.extend(other.errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_span() {
        let span = MatchSpan::new("TODO", 4);
        assert_eq!(span.text, "TODO");
        assert_eq!(span.start, 4);
        assert_eq!(span.len, 4);
        assert_eq!(span.end(), 8);
    }

    #[test]
    fn test_find_result_defaults() {
        let result = FindResult::new("test.txt", "TODO: fix");
        assert_eq!(result.file, PathBuf::from("test.txt"));
        assert_eq!(result.line, "TODO: fix");
        assert!(result.line_number.is_none());
        assert!(result.line_count.is_none());
        assert!(result.folder.is_none());
        assert_eq!(result.indent_level, 0);
    }

    #[test]
    fn test_clone_isolates_records() {
        let original = FindResult::new("a.txt", "line");
        let mut copy = original.clone();
        copy.line_number = Some(7);
        copy.spans.push(MatchSpan::new("line", 0));
        assert!(original.line_number.is_none());
        assert!(original.spans.is_empty());
    }

    #[test]
    fn test_report_tallies() {
        let mut report = ScanReport::new();

        let mut matched = FindResult::new("a.txt", "TODO one");
        matched.line_number = Some(1);
        report.add_file(vec![matched.clone(), matched]);
        report.add_file(vec![]);

        assert_eq!(report.files_searched, 2);
        assert_eq!(report.files_matched, 1);
        assert_eq!(report.lines_matched, 2);
        assert_eq!(report.results.len(), 2);
    }

    #[test]
    fn test_report_merge() {
        let mut left = ScanReport::new();
        left.add_file(vec![FindResult::new("a.txt", "x")]);

        let mut right = ScanReport::new();
        right.add_file(vec![FindResult::new("b.txt", "y")]);
        right.add_failure("c.txt", "permission denied");

        left.merge(right);
        assert_eq!(left.files_searched, 2);
        assert_eq!(left.results.len(), 2);
        assert_eq!(left.errors.len(), 1);
        assert_eq!(left.errors[0].path, PathBuf::from("c.txt"));
    }
}
