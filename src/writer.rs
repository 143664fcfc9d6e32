//! Building immutable backup archives.
//!
//! One `create` call snapshots the enabled content categories into a single
//! compressed ZIP archive, with the manifest embedded last. A failure at
//! any point removes the partially written file, so the archive directory
//! only ever holds complete archives.

use crate::archive;
use crate::config::Config;
use crate::fs::walker::{self, WalkOptions};
use crate::integrity;
use crate::manifest::{FileKind, Includes, Manifest, ManifestBuilder, MANIFEST_NAME};
use crate::utils::errors::Result;
use crate::utils::format::{compression_ratio, format_size};
use chrono::{DateTime, Duration, Local};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Media file extensions eligible for the images category.
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Which categories to include, and the free-text description.
#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub include_db: bool,
    pub include_images: bool,
    pub include_logs: bool,
    pub description: String,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            include_db: true,
            include_images: true,
            include_logs: false,
            description: String::new(),
        }
    }
}

/// A successfully written archive.
#[derive(Debug)]
pub struct CreatedArchive {
    pub path: PathBuf,
    pub file_name: String,
    pub manifest: Manifest,
    /// Compressed size on disk
    pub archive_size: u64,
}

pub struct ArchiveWriter {
    config: Config,
}

impl ArchiveWriter {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Create one archive from the enabled categories.
    ///
    /// Reads the source roots, writes exactly one new file into the backup
    /// directory. Unreadable or invalid source files are skipped with a
    /// warning; failures writing the container itself are fatal and leave
    /// no partial archive behind.
    pub fn create(&self, opts: &CreateOptions) -> Result<CreatedArchive> {
        let storage = &self.config.storage;
        fs::create_dir_all(&storage.backup_dir)?;

        // Identifiers have second resolution; if the name is taken, bump
        // forward one second so identifiers stay strictly increasing.
        let mut created = Local::now();
        let (file_name, path) = loop {
            let name = archive::file_name(&storage.archive_prefix, created);
            let candidate = storage.backup_dir.join(&name);
            if !candidate.exists() {
                break (name, candidate);
            }
            created = created + Duration::seconds(1);
        };

        info!(archive = %file_name, "creating backup archive");

        let manifest = match self.write_archive(&path, created, opts) {
            Ok(manifest) => manifest,
            Err(e) => {
                // Never leave a partial archive on disk.
                if path.exists() {
                    if let Err(rm) = fs::remove_file(&path) {
                        warn!(archive = %file_name, error = %rm, "failed to remove partial archive");
                    }
                }
                return Err(e);
            }
        };

        let archive_size = fs::metadata(&path)?.len();
        info!(
            archive = %file_name,
            files = manifest.total_files,
            raw = %format_size(manifest.total_size),
            compressed = %format_size(archive_size),
            ratio = %format!("{:.1}%", compression_ratio(manifest.total_size, archive_size)),
            "backup archive created"
        );

        Ok(CreatedArchive {
            path,
            file_name,
            manifest,
            archive_size,
        })
    }

    fn write_archive(
        &self,
        path: &Path,
        created: DateTime<Local>,
        opts: &CreateOptions,
    ) -> Result<Manifest> {
        let includes = Includes {
            database: opts.include_db,
            images: opts.include_images,
            logs: opts.include_logs,
        };
        let timestamp = created.format(archive::TIMESTAMP_FORMAT).to_string();
        let mut builder = ManifestBuilder::new(&timestamp, created, &opts.description, includes);

        let file = File::create(path)?;
        let mut container = ZipWriter::new(file);
        let zip_opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        if opts.include_db {
            self.add_database_files(&mut container, zip_opts, &mut builder)?;
        }
        if opts.include_images {
            self.add_media_files(&mut container, zip_opts, &mut builder)?;
        }
        if opts.include_logs {
            self.add_log_files(&mut container, zip_opts, &mut builder)?;
        }

        let manifest = builder.finalize();
        container.start_file(MANIFEST_NAME, zip_opts)?;
        container.write_all(serde_json::to_string_pretty(&manifest)?.as_bytes())?;
        container.finish()?;

        Ok(manifest)
    }

    fn add_database_files(
        &self,
        container: &mut ZipWriter<File>,
        zip_opts: SimpleFileOptions,
        builder: &mut ManifestBuilder,
    ) -> Result<()> {
        for db_file in walker::list_by_extension(&self.config.storage.database_dir, "db")? {
            // Only structurally sound databases make it into an archive.
            if !integrity::validate(&db_file) {
                warn!(file = %db_file.display(), "database file failed validation, skipping");
                continue;
            }
            let arc_path = format!("database/{}", file_name_of(&db_file));
            self.add_file(container, zip_opts, builder, &db_file, arc_path, FileKind::Database)?;
        }
        Ok(())
    }

    fn add_media_files(
        &self,
        container: &mut ZipWriter<File>,
        zip_opts: SimpleFileOptions,
        builder: &mut ManifestBuilder,
    ) -> Result<()> {
        let options = WalkOptions {
            follow_links: false,
            extensions: IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        };
        let before = builder.file_count();
        for media in walker::walk_directory(&self.config.storage.static_dir, options)? {
            let arc_path = format!("static/{}", archive_path(&media.relative_path));
            self.add_file(container, zip_opts, builder, &media.path, arc_path, FileKind::Image)?;
        }
        debug!(count = builder.file_count() - before, "media files added");
        Ok(())
    }

    fn add_log_files(
        &self,
        container: &mut ZipWriter<File>,
        zip_opts: SimpleFileOptions,
        builder: &mut ManifestBuilder,
    ) -> Result<()> {
        for log_file in walker::list_by_extension(&self.config.storage.logs_dir, "log")? {
            let arc_path = format!("logs/{}", file_name_of(&log_file));
            self.add_file(container, zip_opts, builder, &log_file, arc_path, FileKind::Log)?;
        }
        Ok(())
    }

    /// Store one source file and record it in the manifest. An unreadable
    /// source is skipped with a warning; container failures propagate.
    fn add_file(
        &self,
        container: &mut ZipWriter<File>,
        zip_opts: SimpleFileOptions,
        builder: &mut ManifestBuilder,
        source: &Path,
        arc_path: String,
        kind: FileKind,
    ) -> Result<()> {
        let data = match fs::read(source) {
            Ok(data) => data,
            Err(e) => {
                warn!(file = %source.display(), error = %e, "source file unreadable, skipping");
                return Ok(());
            }
        };

        container.start_file(arc_path.as_str(), zip_opts)?;
        container.write_all(&data)?;
        builder.push(arc_path, data.len() as u64, kind);
        Ok(())
    }
}

/// Archive-internal path for a media file, always `/`-separated.
fn archive_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
