//! Per-line and per-file admission predicates.
//!
//! Both filters are built once per search invocation, before any file is
//! opened, so a malformed pattern fails up front rather than mid-scan.

use std::path::Path;

use crate::config::SearchConfig;
use crate::errors::ScourResult;
use crate::pattern::Pattern;
use crate::results::MatchSpan;
use crate::tree;

/// Decides which lines a scan admits.
#[derive(Debug, Clone)]
pub struct LineFilter {
    pattern: Pattern,
    negate: bool,
    unless: Option<Pattern>,
}

impl LineFilter {
    pub fn new(pattern: Pattern, negate: bool, unless: Option<Pattern>) -> Self {
        Self {
            pattern,
            negate,
            unless,
        }
    }

    /// Builds the filter from config, compiling its patterns.
    pub fn from_config(config: &SearchConfig) -> ScourResult<Self> {
        let pattern = Pattern::new(&config.pattern, config.ignore_case, config.multiline)?;
        let unless = config
            .unless
            .as_deref()
            .map(|u| Pattern::new(u, config.ignore_case, config.multiline))
            .transpose()?;
        Ok(Self::new(pattern, config.negate, unless))
    }

    /// Whether `line` passes the filter:
    /// `(negate ? !match : match) && !unless_match`.
    pub fn admit(&self, line: &str) -> bool {
        let matched = if self.negate {
            !self.pattern.is_match(line)
        } else {
            self.pattern.is_match(line)
        };
        matched && !self.unless.as_ref().is_some_and(|u| u.is_match(line))
    }

    /// Match spans for an admitted line.
    ///
    /// Negated filters never produce spans: they answer "does NOT contain
    /// the pattern" and there is nothing to highlight.
    pub fn spans(&self, line: &str) -> Option<Vec<MatchSpan>> {
        if self.negate || !self.admit(line) {
            return None;
        }
        Some(self.pattern.find_all(line))
    }
}

/// Decides which files a scan visits.
///
/// On each axis a by-name pattern, when present, fully governs; only in
/// its absence does the extension suffix rule apply. With neither rule the
/// include axis admits everything and the exclude axis nothing.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    include: Option<Pattern>,
    include_ext: Option<String>,
    exclude: Option<Pattern>,
    exclude_ext: Option<String>,
}

impl FileFilter {
    pub fn new(
        include: Option<Pattern>,
        include_ext: Option<String>,
        exclude: Option<Pattern>,
        exclude_ext: Option<String>,
    ) -> Self {
        Self {
            include,
            include_ext,
            exclude,
            exclude_ext,
        }
    }

    /// Builds the filter from config, compiling its name patterns.
    pub fn from_config(config: &SearchConfig) -> ScourResult<Self> {
        let include = config
            .include
            .as_deref()
            .map(|p| Pattern::new(p, config.ignore_case, false))
            .transpose()?;
        let exclude = config
            .exclude
            .as_deref()
            .map(|p| Pattern::new(p, config.ignore_case, false))
            .transpose()?;
        Ok(Self::new(
            include,
            config.include_ext.clone(),
            exclude,
            config.exclude_ext.clone(),
        ))
    }

    pub fn admit(&self, file: &Path) -> bool {
        self.included(file) && !self.excluded(file)
    }

    fn included(&self, file: &Path) -> bool {
        if let Some(pattern) = &self.include {
            pattern.is_match(&tree::file_label(file))
        } else if let Some(suffix) = &self.include_ext {
            tree::extension(file).ends_with(suffix.as_str())
        } else {
            true
        }
    }

    fn excluded(&self, file: &Path) -> bool {
        if let Some(pattern) = &self.exclude {
            pattern.is_match(&tree::file_label(file))
        } else if let Some(suffix) = &self.exclude_ext {
            tree::extension(file).ends_with(suffix.as_str())
        } else {
            false
        }
    }
}
