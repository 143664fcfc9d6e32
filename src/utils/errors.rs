//! Custom error types for the backup engine.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive container error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Archive not found: {}", .0.display())]
    ArchiveNotFound(PathBuf),

    #[error("Manifest unreadable in {archive}: {reason}")]
    ManifestCorrupt { archive: String, reason: String },

    #[error("Safety backup failed: {0}")]
    SafetyBackup(String),

    #[error("Restore aborted: {0}")]
    RestoreAborted(String),
}

pub type Result<T> = std::result::Result<T, BackupError>;
