//! Library folder scanner
//!
//! Recursive discovery of media files by extension. Hidden files, ignored
//! directories and symlink loops are skipped; unreadable entries are logged
//! and scanning continues.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

impl From<ScanError> for af_common::Error {
    fn from(err: ScanError) -> Self {
        let kind = match err {
            ScanError::PathNotFound(_) => std::io::ErrorKind::NotFound,
            ScanError::NotADirectory(_) => std::io::ErrorKind::InvalidInput,
        };
        af_common::Error::Io(std::io::Error::new(kind, err))
    }
}

/// Media file scanner
#[derive(Debug, Clone)]
pub struct FileScanner {
    extensions: Vec<String>,
    ignore_patterns: Vec<String>,
}

impl FileScanner {
    /// Scanner for the given extensions (matched case-insensitively, with or without a leading dot)
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
            ignore_patterns: vec![
                "Thumbs.db".to_string(),
                "node_modules".to_string(),
                "__MACOSX".to_string(),
            ],
        }
    }

    /// Scan a library folder, returning matching files in path order
    pub fn scan(&self, root_path: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !root_path.exists() {
            return Err(ScanError::PathNotFound(root_path.to_path_buf()));
        }

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory(root_path.to_path_buf()));
        }

        let mut symlink_visited = HashSet::new();
        let mut files = Vec::new();

        let walker = WalkDir::new(root_path)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || self.should_process_entry(e, &mut symlink_visited));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && self.has_wanted_extension(entry.path()) {
                        files.push(entry.into_path());
                    }
                }
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                }
            }
        }

        tracing::debug!(
            root = %root_path.display(),
            files = files.len(),
            "Library scan complete"
        );

        Ok(files)
    }

    /// Run `scan` on the blocking thread pool
    pub async fn scan_in_background(&self, root_path: &Path) -> af_common::Result<Vec<PathBuf>> {
        let scanner = self.clone();
        let root = root_path.to_path_buf();
        let files = tokio::task::spawn_blocking(move || scanner.scan(&root))
            .await
            .map_err(|e| af_common::Error::Internal(format!("Scan task failed: {}", e)))??;
        Ok(files)
    }

    fn should_process_entry(&self, entry: &DirEntry, symlink_visited: &mut HashSet<PathBuf>) -> bool {
        let file_name = entry.file_name().to_string_lossy();

        if file_name.starts_with('.') {
            return false;
        }

        if self.ignore_patterns.iter().any(|pattern| file_name == pattern.as_str()) {
            return false;
        }

        if entry.path_is_symlink() {
            if let Ok(canonical) = entry.path().canonicalize() {
                if !symlink_visited.insert(canonical) {
                    tracing::warn!("Symlink loop detected: {}", entry.path().display());
                    return false;
                }
            }
        }

        true
    }

    fn has_wanted_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|wanted| *wanted == ext))
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new(["mp3"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_nonexistent_path() {
        let scanner = FileScanner::default();
        let result = scanner.scan(Path::new("/nonexistent/path"));
        assert!(matches!(result, Err(ScanError::PathNotFound(_))));
    }

    #[test]
    fn test_scan_file_as_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("song.mp3");
        fs::write(&file, b"x").unwrap();

        let result = FileScanner::default().scan(&file);
        assert!(matches!(result, Err(ScanError::NotADirectory(_))));
    }

    #[test]
    fn test_scan_filters_extension_and_hidden() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("Artist/Album")).unwrap();
        fs::create_dir_all(root.join(".hidden")).unwrap();
        fs::write(root.join("Artist/Album/01.mp3"), b"x").unwrap();
        fs::write(root.join("Artist/Album/02.MP3"), b"x").unwrap();
        fs::write(root.join("Artist/Album/cover.jpg"), b"x").unwrap();
        fs::write(root.join("Artist/Album/.01.mp3"), b"x").unwrap();
        fs::write(root.join(".hidden/03.mp3"), b"x").unwrap();

        let files = FileScanner::default().scan(root).unwrap();
        assert_eq!(
            files,
            vec![
                root.join("Artist/Album/01.mp3"),
                root.join("Artist/Album/02.MP3"),
            ]
        );
    }

    #[test]
    fn test_scan_configured_extensions() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.flac"), b"x").unwrap();
        fs::write(root.join("b.mp3"), b"x").unwrap();
        fs::write(root.join("c.ogg"), b"x").unwrap();

        let files = FileScanner::new([".flac", "OGG"]).scan(root).unwrap();
        assert_eq!(files, vec![root.join("a.flac"), root.join("c.ogg")]);
    }

    #[tokio::test]
    async fn test_scan_in_background_maps_errors() {
        let result = FileScanner::default()
            .scan_in_background(Path::new("/nonexistent/path"))
            .await;
        match result {
            Err(af_common::Error::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("Expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let files = FileScanner::default().scan(temp_dir.path()).unwrap();
        assert!(files.is_empty());
    }
}
