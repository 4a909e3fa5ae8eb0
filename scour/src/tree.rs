//! Filesystem access for the scan: folder enumeration and line reading.
//!
//! Enumeration order is whatever the OS yields; callers must not assume
//! sorted output. All failures carry the offending path so the scan can
//! report and skip.

use memmap2::Mmap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

use crate::errors::{ScourError, ScourResult};

pub(crate) const LARGE_FILE_THRESHOLD: u64 = 10 * 1024 * 1024; // 10MB

/// Lists the plain files directly inside `folder`.
pub fn list_files(folder: &Path) -> ScourResult<Vec<PathBuf>> {
    list_entries(folder, |file_type| file_type.is_file())
}

/// Lists the subfolders directly inside `folder`.
pub fn list_subfolders(folder: &Path) -> ScourResult<Vec<PathBuf>> {
    list_entries(folder, |file_type| file_type.is_dir())
}

fn list_entries(
    folder: &Path,
    keep: impl Fn(&fs::FileType) -> bool,
) -> ScourResult<Vec<PathBuf>> {
    let entries = fs::read_dir(folder).map_err(|e| ScourError::folder_enumeration(folder, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ScourError::folder_enumeration(folder, e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| ScourError::folder_enumeration(folder, e))?;
        if keep(&file_type) {
            paths.push(entry.path());
        }
    }
    Ok(paths)
}

/// Reads a file into lines.
///
/// Small files are read whole; large ones are memory-mapped. Invalid
/// UTF-8 is replaced rather than failing the scan, with a warning.
pub fn read_lines(path: &Path) -> ScourResult<Vec<String>> {
    trace!("Reading file: {}", path.display());

    let size = path.metadata().map(|m| m.len()).unwrap_or(0);

    if size >= LARGE_FILE_THRESHOLD {
        let file = fs::File::open(path).map_err(|e| ScourError::file_read(path, e))?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| ScourError::file_read(path, e))?;
        Ok(decode_lines(&mmap, path))
    } else {
        let bytes = fs::read(path).map_err(|e| ScourError::file_read(path, e))?;
        Ok(decode_lines(&bytes, path))
    }
}

fn decode_lines(bytes: &[u8], path: &Path) -> Vec<String> {
    let text = String::from_utf8_lossy(bytes);
    if let std::borrow::Cow::Owned(_) = text {
        warn!("Invalid UTF-8 replaced in file: {}", path.display());
    }
    text.lines().map(str::to_owned).collect()
}

/// Whole-file text, same read strategy as [`read_lines`].
pub fn read_text(path: &Path) -> ScourResult<String> {
    let size = path.metadata().map(|m| m.len()).unwrap_or(0);

    let bytes = if size >= LARGE_FILE_THRESHOLD {
        let file = fs::File::open(path).map_err(|e| ScourError::file_read(path, e))?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| ScourError::file_read(path, e))?;
        return Ok(String::from_utf8_lossy(&mmap).into_owned());
    } else {
        fs::read(path).map_err(|e| ScourError::file_read(path, e))?
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// File name with extension, e.g. `"main.rs"`.
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Extension including the leading dot, e.g. `".rs"`; empty when the file
/// has none.
pub fn extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_list_files_and_subfolders() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "x\n").unwrap();
        fs::write(dir.path().join("b.txt"), "y\n").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let mut files = list_files(dir.path()).unwrap();
        files.sort();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.txt"));

        let subfolders = list_subfolders(dir.path()).unwrap();
        assert_eq!(subfolders.len(), 1);
        assert!(subfolders[0].ends_with("sub"));
    }

    #[test]
    fn test_list_missing_folder() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let result = list_files(&missing);
        assert!(matches!(
            result,
            Err(ScourError::FolderEnumeration { .. })
        ));
    }

    #[test]
    fn test_read_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.txt");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "first").unwrap();
        writeln!(file, "second").unwrap();
        writeln!(file, "third").unwrap();

        let lines = read_lines(&path).unwrap();
        assert_eq!(lines, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_read_lines_missing_file() {
        let dir = tempdir().unwrap();
        let result = read_lines(&dir.path().join("missing.txt"));
        assert!(matches!(result, Err(ScourError::FileRead { .. })));
    }

    #[test]
    fn test_read_lines_invalid_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        fs::write(&path, b"ok line\n\xff\xfe broken\n").unwrap();

        let lines = read_lines(&path).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "ok line");
    }

    #[test]
    fn test_name_helpers() {
        let path = Path::new("src/main.rs");
        assert_eq!(file_label(path), "main.rs");
        assert_eq!(extension(path), ".rs");
        assert_eq!(extension(Path::new("Makefile")), "");
    }
}
