//! Restoring an archive onto the live data store.
//!
//! The protocol is fail-closed: the target manifest is fully parsed and
//! validated up front, a safety snapshot of the current live state is taken
//! before anything is overwritten, and the first extraction failure aborts
//! the whole operation. An aborted restore is recovered by restoring the
//! safety snapshot.
//!
//! The caller is responsible for quiescing writes against the live store
//! for the duration of a restore; the engine does not lock it.

use crate::config::Config;
use crate::manifest::{FileKind, Manifest};
use crate::utils::errors::{BackupError, Result};
use crate::writer::{ArchiveWriter, CreateOptions};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};
use zip::ZipArchive;

/// Description stamped onto automatic pre-restore snapshots.
pub const SAFETY_BACKUP_DESCRIPTION: &str = "Automatic safety backup before restore";

#[derive(Debug, Clone)]
pub struct RestoreOptions {
    pub restore_db: bool,
    pub restore_images: bool,
    pub restore_logs: bool,
    /// Snapshot the current live state before overwriting anything
    pub safety_backup: bool,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            restore_db: true,
            restore_images: true,
            restore_logs: false,
            safety_backup: true,
        }
    }
}

#[derive(Debug)]
pub struct RestoreReport {
    pub files_restored: usize,

    /// The pre-restore snapshot, when one was taken
    pub safety_archive: Option<PathBuf>,
}

pub struct Restorer {
    config: Config,
}

impl Restorer {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Apply the contents of `archive_path` onto the live store.
    ///
    /// Succeeds only if every requested category the manifest confirms was
    /// fully applied. A requested category the archive was built without is
    /// a no-op, not an error.
    pub fn restore(&self, archive_path: &Path, opts: &RestoreOptions) -> Result<RestoreReport> {
        // Validate the target fully before taking the safety snapshot, so a
        // missing or corrupt archive never costs one.
        let manifest = Manifest::read_from(archive_path)?;
        info!(
            archive = %archive_path.display(),
            created = %manifest.date,
            files = manifest.total_files,
            "starting restore"
        );

        let safety_archive = if opts.safety_backup {
            let created = ArchiveWriter::new(&self.config)
                .create(&CreateOptions {
                    include_db: true,
                    include_images: true,
                    include_logs: false,
                    description: SAFETY_BACKUP_DESCRIPTION.to_string(),
                })
                .map_err(|e| BackupError::SafetyBackup(e.to_string()))?;
            info!(archive = %created.file_name, "safety backup created");
            Some(created.path)
        } else {
            warn!("restoring without a safety backup");
            None
        };

        let file = File::open(archive_path)
            .map_err(|e| BackupError::RestoreAborted(e.to_string()))?;
        let mut container =
            ZipArchive::new(file).map_err(|e| BackupError::RestoreAborted(e.to_string()))?;

        let mut files_restored = 0;
        if opts.restore_db && manifest.includes.database {
            for entry in manifest.entries_of(FileKind::Database) {
                let dest = self
                    .config
                    .storage
                    .database_dir
                    .join(entry_file_name(&entry.path)?);
                extract_entry(&mut container, &entry.path, &dest)?;
                files_restored += 1;
            }
        }
        if opts.restore_images && manifest.includes.images {
            for entry in manifest.entries_of(FileKind::Image) {
                let dest = self
                    .config
                    .storage
                    .static_dir
                    .join(media_relative_path(&entry.path)?);
                extract_entry(&mut container, &entry.path, &dest)?;
                files_restored += 1;
            }
        }
        if opts.restore_logs && manifest.includes.logs {
            for entry in manifest.entries_of(FileKind::Log) {
                let dest = self
                    .config
                    .storage
                    .logs_dir
                    .join(entry_file_name(&entry.path)?);
                extract_entry(&mut container, &entry.path, &dest)?;
                files_restored += 1;
            }
        }

        info!(files = files_restored, "restore complete");
        Ok(RestoreReport {
            files_restored,
            safety_archive,
        })
    }
}

/// Destination file name for a flat category entry (`database/shop.db`,
/// `logs/app.log`).
fn entry_file_name(entry_path: &str) -> Result<String> {
    let name = entry_path.rsplit('/').next().unwrap_or_default();
    if name.is_empty() || name == "." || name == ".." {
        return Err(BackupError::RestoreAborted(format!(
            "unsafe archive entry path: {entry_path}"
        )));
    }
    Ok(name.to_string())
}

/// Media entries are stored as `static/<relative path>`; recover the
/// relative path, refusing anything that could escape the media root.
fn media_relative_path(entry_path: &str) -> Result<PathBuf> {
    let rel = entry_path.strip_prefix("static/").ok_or_else(|| {
        BackupError::RestoreAborted(format!("unexpected media entry path: {entry_path}"))
    })?;

    let rel = Path::new(rel);
    if rel.as_os_str().is_empty() || rel.components().any(|c| !matches!(c, Component::Normal(_))) {
        return Err(BackupError::RestoreAborted(format!(
            "unsafe archive entry path: {entry_path}"
        )));
    }
    Ok(rel.to_path_buf())
}

fn extract_entry(container: &mut ZipArchive<File>, name: &str, dest: &Path) -> Result<()> {
    let mut data = Vec::new();
    container
        .by_name(name)
        .map_err(|e| BackupError::RestoreAborted(format!("missing archive entry {name}: {e}")))?
        .read_to_end(&mut data)
        .map_err(|e| {
            BackupError::RestoreAborted(format!("failed to read archive entry {name}: {e}"))
        })?;

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            BackupError::RestoreAborted(format!("failed to create {}: {e}", parent.display()))
        })?;
    }
    fs::write(dest, &data).map_err(|e| {
        BackupError::RestoreAborted(format!("failed to write {}: {e}", dest.display()))
    })?;
    Ok(())
}
