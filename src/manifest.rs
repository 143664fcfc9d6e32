//! The embedded manifest: the inventory describing one archive's contents.
//!
//! Serialized as `MANIFEST.json`, written as the last entry of every
//! archive, immutable once finalized. Its entry list mirrors exactly what
//! was physically stored, and its aggregates are recomputed from that list
//! at finalization so the two can never drift apart.

use crate::utils::errors::{BackupError, Result};
use crate::utils::format::format_size;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

/// Fixed name of the manifest entry inside every archive.
pub const MANIFEST_NAME: &str = "MANIFEST.json";

/// Semantic category of a stored file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Database,
    Image,
    Log,
}

impl FileKind {
    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Database => "database",
            FileKind::Image => "image",
            FileKind::Log => "log",
        }
    }
}

/// One file stored in an archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Path within the archive
    pub path: String,

    /// Byte size as stored
    pub size: u64,

    /// Semantic category
    #[serde(rename = "type")]
    pub kind: FileKind,
}

/// Which content categories an archive was built with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Includes {
    pub database: bool,
    pub images: bool,
    pub logs: bool,
}

impl Includes {
    /// Whether the category covering `kind` was enabled.
    pub fn covers(&self, kind: FileKind) -> bool {
        match kind {
            FileKind::Database => self.database,
            FileKind::Image => self.images,
            FileKind::Log => self.logs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Archive identifier timestamp (`YYYYMMDD_HHMMSS`)
    pub timestamp: String,

    /// Creation date/time, ISO-8601
    pub date: String,

    /// Free-text description
    pub description: String,

    /// Category inclusion flags
    pub includes: Includes,

    /// Every file stored in the archive, in write order
    pub files: Vec<ManifestEntry>,

    pub total_files: usize,
    pub total_size: u64,
    pub total_size_formatted: String,
}

impl Manifest {
    /// Extract and parse only the embedded manifest, without unpacking the
    /// rest of the archive.
    ///
    /// A path that is not a file yields [`BackupError::ArchiveNotFound`];
    /// an unreadable container, a missing or malformed `MANIFEST.json`, or
    /// a manifest that disagrees with its own entry list yields
    /// [`BackupError::ManifestCorrupt`].
    pub fn read_from(archive: &Path) -> Result<Manifest> {
        if !archive.is_file() {
            return Err(BackupError::ArchiveNotFound(archive.to_path_buf()));
        }
        let corrupt = |reason: String| BackupError::ManifestCorrupt {
            archive: archive.display().to_string(),
            reason,
        };

        let file = File::open(archive)?;
        let mut container = ZipArchive::new(file).map_err(|e| corrupt(e.to_string()))?;
        let mut raw = String::new();
        container
            .by_name(MANIFEST_NAME)
            .map_err(|e| corrupt(format!("{MANIFEST_NAME}: {e}")))?
            .read_to_string(&mut raw)
            .map_err(|e| corrupt(e.to_string()))?;

        let manifest: Manifest = serde_json::from_str(&raw).map_err(|e| corrupt(e.to_string()))?;
        if manifest.total_files != manifest.files.len() {
            return Err(corrupt(format!(
                "total_files is {} but {} entries are listed",
                manifest.total_files,
                manifest.files.len()
            )));
        }
        Ok(manifest)
    }

    /// Entries of one category, in write order.
    pub fn entries_of(&self, kind: FileKind) -> impl Iterator<Item = &ManifestEntry> {
        self.files.iter().filter(move |e| e.kind == kind)
    }
}

/// Accumulates entries while an archive is under construction.
pub struct ManifestBuilder {
    timestamp: String,
    date: String,
    description: String,
    includes: Includes,
    files: Vec<ManifestEntry>,
}

impl ManifestBuilder {
    pub fn new(
        timestamp: &str,
        created: DateTime<Local>,
        description: &str,
        includes: Includes,
    ) -> Self {
        Self {
            timestamp: timestamp.to_string(),
            date: created.to_rfc3339(),
            description: description.to_string(),
            includes,
            files: Vec::new(),
        }
    }

    /// Record one stored file.
    pub fn push(&mut self, path: String, size: u64, kind: FileKind) {
        self.files.push(ManifestEntry { path, size, kind });
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Compute the aggregates and seal the manifest.
    pub fn finalize(self) -> Manifest {
        let total_files = self.files.len();
        let total_size: u64 = self.files.iter().map(|e| e.size).sum();
        Manifest {
            timestamp: self.timestamp,
            date: self.date,
            description: self.description,
            includes: self.includes,
            files: self.files,
            total_files,
            total_size,
            total_size_formatted: format_size(total_size),
        }
    }
}
