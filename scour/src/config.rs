use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Configuration for one search invocation.
///
/// Values can be loaded from YAML config files in order of precedence:
/// 1. Custom config file specified via `--config`
/// 2. Local `.scour.yaml` in the current directory
/// 3. Global `$HOME/.config/scour/config.yaml`
///
/// CLI arguments take precedence over file values; merging behavior is
/// defined in [`SearchConfig::merge_with_cli`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// The search pattern (supports regex)
    #[serde(default)]
    pub pattern: String,

    /// Admit lines that do NOT match the pattern
    #[serde(default)]
    pub negate: bool,

    /// Reject lines matching this pattern even when the primary pattern
    /// admits them
    #[serde(default)]
    pub unless: Option<String>,

    /// Case-insensitive matching
    #[serde(default)]
    pub ignore_case: bool,

    /// Multiline pattern semantics (`^`/`$` match line boundaries in
    /// whole-text mode)
    #[serde(default)]
    pub multiline: bool,

    /// Match against the whole file text instead of line by line,
    /// yielding one result per match span
    #[serde(default)]
    pub whole_text: bool,

    /// Include only files whose name matches this pattern
    #[serde(default)]
    pub include: Option<String>,

    /// Include only files whose extension ends with this suffix;
    /// ignored when `include` is set
    #[serde(default)]
    pub include_ext: Option<String>,

    /// Exclude files whose name matches this pattern
    #[serde(default)]
    pub exclude: Option<String>,

    /// Exclude files whose extension ends with this suffix;
    /// ignored when `exclude` is set
    #[serde(default)]
    pub exclude_ext: Option<String>,

    /// Root directory to start the scan from
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// Run the scan across a worker pool with live progress; when false
    /// the scan is synchronous and its output deterministic
    #[serde(default)]
    pub threaded: bool,

    /// Number of workers when threaded
    /// Defaults to number of CPU cores if not specified
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_root_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::new(1).unwrap())
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            negate: false,
            unless: None,
            ignore_case: false,
            multiline: false,
            whole_text: false,
            include: None,
            include_ext: None,
            exclude: None,
            exclude_ext: None,
            root_path: default_root_path(),
            threaded: false,
            thread_count: default_thread_count(),
            log_level: default_log_level(),
        }
    }
}

impl SearchConfig {
    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from a specific file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            // Global config
            dirs::config_dir().map(|p| p.join("scour/config.yaml")),
            // Local config
            Some(PathBuf::from(".scour.yaml")),
            // Custom config
            config_path.map(PathBuf::from),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values; CLI values
    /// take precedence.
    pub fn merge_with_cli(mut self, cli: SearchConfig) -> Self {
        if !cli.pattern.is_empty() {
            self.pattern = cli.pattern;
        }
        if cli.negate {
            self.negate = true;
        }
        if cli.unless.is_some() {
            self.unless = cli.unless;
        }
        if cli.ignore_case {
            self.ignore_case = true;
        }
        if cli.multiline {
            self.multiline = true;
        }
        if cli.whole_text {
            self.whole_text = true;
        }
        if cli.include.is_some() {
            self.include = cli.include;
        }
        if cli.include_ext.is_some() {
            self.include_ext = cli.include_ext;
        }
        if cli.exclude.is_some() {
            self.exclude = cli.exclude;
        }
        if cli.exclude_ext.is_some() {
            self.exclude_ext = cli.exclude_ext;
        }
        if cli.root_path != default_root_path() {
            self.root_path = cli.root_path;
        }
        if cli.threaded {
            self.threaded = true;
        }
        // Always use CLI thread count if specified
        self.thread_count = cli.thread_count;
        if cli.log_level != default_log_level() {
            self.log_level = cli.log_level;
        }
        self
    }
}
