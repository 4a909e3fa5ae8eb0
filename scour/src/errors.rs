use std::path::PathBuf;
use thiserror::Error;

/// Result type for scan operations
pub type ScourResult<T> = Result<T, ScourError>;

/// Errors that can occur while building filters or scanning a tree.
///
/// Only `InvalidPattern` is fatal, surfacing before any file is opened.
/// The per-file and per-folder kinds are recovered by the scan, which
/// reports them and moves on.
#[derive(Error, Debug)]
pub enum ScourError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to list folder {path}: {source}")]
    FolderEnumeration {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Job panicked: {0}")]
    JobPanic(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ScourError {
    pub fn invalid_pattern(msg: impl Into<String>) -> Self {
        Self::InvalidPattern(msg.into())
    }

    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    pub fn folder_enumeration(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FolderEnumeration {
            path: path.into(),
            source,
        }
    }

    pub fn job_panic(msg: impl Into<String>) -> Self {
        Self::JobPanic(msg.into())
    }

    /// True for error kinds the scan recovers from by skipping the
    /// offending file or subtree.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FileRead { .. } | Self::FolderEnumeration { .. } | Self::JobPanic(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = ScourError::invalid_pattern("unclosed group");
        assert!(matches!(err, ScourError::InvalidPattern(_)));

        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = ScourError::file_read(Path::new("test.txt"), io_err);
        assert!(matches!(err, ScourError::FileRead { .. }));

        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err = ScourError::folder_enumeration(Path::new("src"), io_err);
        assert!(matches!(err, ScourError::FolderEnumeration { .. }));
    }

    #[test]
    fn test_error_messages() {
        let err = ScourError::invalid_pattern("missing closing brace");
        assert_eq!(err.to_string(), "Invalid pattern: missing closing brace");

        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = ScourError::file_read(Path::new("test.txt"), io_err);
        assert_eq!(err.to_string(), "Failed to read test.txt: denied");

        let err = ScourError::job_panic("worker 3: boom");
        assert_eq!(err.to_string(), "Job panicked: worker 3: boom");
    }

    #[test]
    fn test_recoverable_kinds() {
        let io_err = io::Error::new(io::ErrorKind::Other, "boom");
        assert!(ScourError::file_read("a.txt", io_err).is_recoverable());
        assert!(ScourError::job_panic("worker 2").is_recoverable());
        assert!(!ScourError::invalid_pattern("bad").is_recoverable());
    }
}
