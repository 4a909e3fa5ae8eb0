//! Concurrent, recursive content search.
//!
//! The pieces compose in layers: [`pattern::Pattern`] compiles the match
//! text, [`filters`] turn it into per-line and per-file admission rules,
//! [`finder::Finder`] walks a tree lazily yielding [`results::FindResult`]
//! records, and [`driver::ParallelScan`] fans the per-file work out over
//! a [`pool::JobPool`] while a [`progress::ProgressBoard`] renders live
//! status without interleaving concurrent writes.

pub mod config;
pub mod driver;
pub mod errors;
pub mod filters;
pub mod finder;
pub mod pattern;
pub mod pool;
pub mod progress;
pub mod results;
pub mod tree;

pub use config::SearchConfig;
pub use driver::ParallelScan;
pub use errors::{ScourError, ScourResult};
pub use finder::{Finder, NullSink, ScanMode, ScanSink};
pub use pattern::Pattern;
pub use pool::{JobHandle, JobPool};
pub use progress::{Layout, LogColors, ProgressBoard};
pub use results::{FindResult, MatchSpan, ScanReport};
