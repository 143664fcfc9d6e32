//! Archive naming, listing, and inspection.
//!
//! An archive's identifier is its file name,
//! `<prefix>_backup_<YYYYMMDD_HHMMSS>.zip`: second resolution, and
//! lexicographic order equals creation order, so "the N most recent" is a
//! pure sort with no clock involved.

use crate::manifest::{Includes, Manifest};
use crate::utils::errors::Result;
use crate::utils::format::format_size;
use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;

const NAME_INFIX: &str = "_backup_";
const NAME_SUFFIX: &str = ".zip";

/// Identifier timestamp format, second resolution.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Archive file name for a creation instant.
pub fn file_name(prefix: &str, when: DateTime<Local>) -> String {
    format!(
        "{prefix}{NAME_INFIX}{}{NAME_SUFFIX}",
        when.format(TIMESTAMP_FORMAT)
    )
}

/// Inverse of [`file_name`]: the creation time encoded in an archive name.
pub fn parse_created(file_name: &str) -> Option<NaiveDateTime> {
    let stem = file_name.strip_suffix(NAME_SUFFIX)?;
    let (_, ts) = stem.rsplit_once(NAME_INFIX)?;
    NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).ok()
}

/// An archive file on disk, before its manifest is consulted.
#[derive(Debug, Clone)]
pub struct ScanEntry {
    pub file_name: String,
    pub path: PathBuf,
}

/// Raw newest-first listing of archive files under `dir`.
///
/// No archive is opened; a missing directory is an empty listing.
pub fn scan(dir: &Path, prefix: &str) -> Result<Vec<ScanEntry>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let marker = format!("{prefix}{NAME_INFIX}");
    let mut entries: Vec<ScanEntry> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name().into_string().ok()?;
            let keep =
                name.starts_with(&marker) && name.ends_with(NAME_SUFFIX) && e.path().is_file();
            keep.then(|| ScanEntry {
                path: e.path(),
                file_name: name,
            })
        })
        .collect();

    entries.sort_by(|a, b| b.file_name.cmp(&a.file_name));
    Ok(entries)
}

/// Summary of one archive, as shown by the `list` operation.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveInfo {
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
    pub size_formatted: String,
    pub date: String,
    pub description: String,
    pub total_files: usize,
    pub includes: Includes,
}

/// List archives newest-first, reading each embedded manifest.
///
/// An archive whose manifest is missing or malformed is skipped with a
/// warning, so one bad archive cannot break the listing of the rest.
pub fn list(dir: &Path, prefix: &str, limit: Option<usize>) -> Result<Vec<ArchiveInfo>> {
    let mut archives = Vec::new();

    for entry in scan(dir, prefix)? {
        let manifest = match Manifest::read_from(&entry.path) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(archive = %entry.file_name, error = %e, "skipping unreadable archive");
                continue;
            }
        };
        let size = match std::fs::metadata(&entry.path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!(archive = %entry.file_name, error = %e, "skipping unreadable archive");
                continue;
            }
        };

        archives.push(ArchiveInfo {
            file_name: entry.file_name,
            path: entry.path,
            size,
            size_formatted: format_size(size),
            date: manifest.date,
            description: manifest.description,
            total_files: manifest.total_files,
            includes: manifest.includes,
        });

        if limit.is_some_and(|limit| archives.len() >= limit) {
            break;
        }
    }

    Ok(archives)
}

/// Full detail for one archive, as shown by the `info` operation.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveDetails {
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
    pub size_formatted: String,
    pub manifest: Manifest,
}

/// Read one archive's manifest and on-disk size.
///
/// Unlike [`list`], errors propagate so the caller can distinguish a
/// missing archive from a corrupt one.
pub fn inspect(path: &Path) -> Result<ArchiveDetails> {
    let manifest = Manifest::read_from(path)?;
    let size = std::fs::metadata(path)?.len();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(ArchiveDetails {
        file_name,
        path: path.to_path_buf(),
        size,
        size_formatted: format_size(size),
        manifest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_file_name_round_trip() {
        let when = Local
            .with_ymd_and_hms(2026, 8, 7, 10, 30, 0)
            .single()
            .unwrap();
        let name = file_name("store", when);
        assert_eq!(name, "store_backup_20260807_103000.zip");

        let created = parse_created(&name).unwrap();
        assert_eq!(
            created,
            NaiveDate::from_ymd_opt(2026, 8, 7)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_parse_created_rejects_foreign_names() {
        assert!(parse_created("store_backup_20260807_103000.zip").is_some());
        assert!(parse_created("store_backup_garbage.zip").is_none());
        assert!(parse_created("notes.txt").is_none());
    }

    #[test]
    fn test_scan_orders_newest_first() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        for name in [
            "store_backup_20260805_090000.zip",
            "store_backup_20260807_090000.zip",
            "store_backup_20260806_090000.zip",
            "other_backup_20260807_100000.zip",
            "notes.txt",
        ] {
            fs::write(temp_dir.path().join(name), b"")?;
        }

        let entries = scan(temp_dir.path(), "store").unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "store_backup_20260807_090000.zip",
                "store_backup_20260806_090000.zip",
                "store_backup_20260805_090000.zip",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_scan_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let entries = scan(&temp_dir.path().join("absent"), "store").unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_list_skips_archives_without_manifest() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(
            temp_dir.path().join("store_backup_20260807_090000.zip"),
            b"not a zip",
        )?;

        let archives = list(temp_dir.path(), "store", None).unwrap();
        assert!(archives.is_empty());
        Ok(())
    }
}
