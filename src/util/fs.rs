//! Filesystem utilities.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::{glob, PatternError};

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if path.as_os_str().is_empty() || path.exists() {
        return Ok(());
    }
    fs::create_dir_all(path)
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) => ensure_dir(parent),
        None => Ok(()),
    }
}

/// Expand one shell-style pattern into the regular files it matches.
///
/// Matches are returned in the order the glob walker yields them;
/// directories and unreadable entries are skipped.
pub fn glob_files(pattern: &str) -> Result<Vec<PathBuf>, PatternError> {
    let mut results = Vec::new();

    for entry in glob(pattern)? {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    results.push(path);
                }
            }
            Err(e) => {
                tracing::warn!("glob error: {}", e);
            }
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_glob_files_skips_directories() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("blink.cpp"), "int main() {}").unwrap();
        fs::write(tmp.path().join("fade.cpp"), "int main() {}").unwrap();
        fs::create_dir(tmp.path().join("dir.cpp")).unwrap();

        let pattern = tmp.path().join("*.cpp");
        let files = glob_files(&pattern.to_string_lossy()).unwrap();
        assert_eq!(
            files,
            vec![tmp.path().join("blink.cpp"), tmp.path().join("fade.cpp")]
        );
    }

    #[test]
    fn test_glob_files_literal_path() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("demo.cpp");
        fs::write(&file, "").unwrap();

        assert_eq!(glob_files(&file.to_string_lossy()).unwrap(), vec![file]);
    }

    #[test]
    fn test_glob_files_no_match() {
        let tmp = TempDir::new().unwrap();
        let pattern = tmp.path().join("*.cpp");
        assert!(glob_files(&pattern.to_string_lossy()).unwrap().is_empty());
    }

    #[test]
    fn test_glob_files_invalid_pattern() {
        assert!(glob_files("src/[.cpp").is_err());
    }

    #[test]
    fn test_ensure_parent_dir() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("out/bench/fw.o");
        ensure_parent_dir(&file).unwrap();
        assert!(tmp.path().join("out/bench").is_dir());

        // Bare file names have an empty parent
        ensure_parent_dir(Path::new("fw.o")).unwrap();
    }
}
