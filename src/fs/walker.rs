//! Directory traversal for backup sources.
//!
//! Recursive walks cover the media tree, filtered by file extension; flat
//! listings cover the database and log directories. A missing source
//! directory is treated as an empty category, never an error.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Options for directory walking
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Follow symbolic links
    pub follow_links: bool,

    /// Keep only files with one of these extensions (case-insensitive);
    /// empty keeps everything
    pub extensions: Vec<String>,
}

/// Information about a file discovered during walking
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Full path to the file
    pub path: PathBuf,

    /// Path relative to the walk root
    pub relative_path: PathBuf,

    /// File size in bytes
    pub size: u64,
}

impl FileInfo {
    /// Create FileInfo from a DirEntry.
    /// For symlinks, resolves to the target to get the real file size.
    /// Returns None if the symlink target is a directory or cannot be resolved.
    fn from_entry(entry: &DirEntry, root: &Path) -> std::io::Result<Option<Self>> {
        let raw_metadata = entry.metadata()?;
        let path = entry.path().to_path_buf();
        let relative_path = path.strip_prefix(root).unwrap_or(&path).to_path_buf();

        let size = if raw_metadata.is_symlink() {
            match std::fs::metadata(&path) {
                Ok(resolved) if resolved.is_dir() => return Ok(None),
                Ok(resolved) => resolved.len(),
                // Broken symlink — skip it
                Err(_) => return Ok(None),
            }
        } else {
            raw_metadata.len()
        };

        Ok(Some(Self {
            path,
            relative_path,
            size,
        }))
    }
}

/// Walk a directory tree and collect all matching files, in a stable order.
pub fn walk_directory(root: &Path, options: WalkOptions) -> std::io::Result<Vec<FileInfo>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(options.follow_links)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry?;

        if entry.file_type().is_dir() {
            continue;
        }

        if !matches_extension(entry.path(), &options.extensions) {
            continue;
        }

        if let Some(file_info) = FileInfo::from_entry(&entry, root)? {
            files.push(file_info);
        }
    }

    Ok(files)
}

/// List files with the given extension directly under a directory (no recursion).
pub fn list_by_extension(dir: &Path, ext: &str) -> std::io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && has_extension(p, ext))
        .collect();

    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    extensions.is_empty() || extensions.iter().any(|ext| has_extension(path, ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_walk_empty_directory() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let files = walk_directory(temp_dir.path(), WalkOptions::default())?;
        assert_eq!(files.len(), 0);
        Ok(())
    }

    #[test]
    fn test_walk_missing_directory() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let files = walk_directory(&temp_dir.path().join("absent"), WalkOptions::default())?;
        assert_eq!(files.len(), 0);
        Ok(())
    }

    #[test]
    fn test_walk_with_subdirectories() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;

        fs::create_dir(temp_dir.path().join("subdir"))?;
        fs::write(temp_dir.path().join("file1.txt"), b"content1")?;
        fs::write(temp_dir.path().join("subdir/file2.txt"), b"content2")?;

        let files = walk_directory(temp_dir.path(), WalkOptions::default())?;
        assert_eq!(files.len(), 2);

        Ok(())
    }

    #[test]
    fn test_walk_extension_filter() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;

        fs::write(temp_dir.path().join("photo.JPG"), b"jpeg")?;
        fs::write(temp_dir.path().join("photo.png"), b"png")?;
        fs::write(temp_dir.path().join("notes.txt"), b"text")?;

        let options = WalkOptions {
            follow_links: false,
            extensions: vec!["jpg".to_string(), "png".to_string()],
        };
        let files = walk_directory(temp_dir.path(), options)?;
        assert_eq!(files.len(), 2);

        Ok(())
    }

    #[test]
    fn test_walk_relative_paths() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;

        fs::create_dir_all(temp_dir.path().join("images/products"))?;
        fs::write(temp_dir.path().join("images/products/jar.png"), b"png")?;

        let files = walk_directory(temp_dir.path(), WalkOptions::default())?;
        assert_eq!(files.len(), 1);
        assert_eq!(
            files[0].relative_path,
            PathBuf::from("images/products/jar.png")
        );

        Ok(())
    }

    #[test]
    fn test_list_by_extension() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;

        fs::write(temp_dir.path().join("shop.db"), b"db")?;
        fs::write(temp_dir.path().join("shop.db-journal"), b"journal")?;
        fs::write(temp_dir.path().join("readme.md"), b"docs")?;
        fs::create_dir(temp_dir.path().join("nested"))?;
        fs::write(temp_dir.path().join("nested/other.db"), b"db")?;

        let files = list_by_extension(temp_dir.path(), "db")?;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name().unwrap(), "shop.db");

        Ok(())
    }
}
