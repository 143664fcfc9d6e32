//! Storefront backup tool - Main entry point
//!
//! Thin command-line adapter over the backup engine: create, list, restore,
//! cleanup, info, and the foreground scheduler loop.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use store_backup::archive;
use store_backup::config::Config;
use store_backup::manifest::{FileKind, Includes};
use store_backup::restore::{RestoreOptions, Restorer};
use store_backup::retention::{self, RetentionPolicy};
use store_backup::scheduler::{Cadence, Scheduler};
use store_backup::utils::format::format_size;
use store_backup::utils::logger;
use store_backup::writer::{ArchiveWriter, CreateOptions};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Derive all paths from this base directory (default: current directory)
    #[arg(long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new backup archive
    Create {
        /// Skip the database category
        #[arg(long)]
        no_db: bool,

        /// Skip the images category
        #[arg(long)]
        no_images: bool,

        /// Include application log files
        #[arg(long)]
        logs: bool,

        /// Free-text description stored in the manifest
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// List available archives, newest first
    List {
        /// Show at most this many archives
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Restore an archive onto the live data store
    Restore {
        /// Archive file name (resolved against the backup directory) or path
        archive: String,

        /// Skip the database category
        #[arg(long)]
        no_db: bool,

        /// Skip the images category
        #[arg(long)]
        no_images: bool,

        /// Restore application log files
        #[arg(long)]
        logs: bool,

        /// Skip the automatic pre-restore safety backup
        #[arg(long)]
        no_safety_backup: bool,
    },

    /// Remove archives outside the retention window
    Cleanup {
        /// Keep at least this many recent archives
        #[arg(short, long)]
        keep: Option<usize>,

        /// Keep archives newer than this many days
        #[arg(short, long)]
        days: Option<i64>,
    },

    /// Show detailed information about one archive
    Info {
        /// Archive file name (resolved against the backup directory) or path
        archive: String,
    },

    /// Run the periodic backup scheduler in the foreground
    Schedule,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args)?;
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    logger::init(log_level)?;

    run(args.command, &config)
}

fn load_config(args: &Args) -> Result<Config> {
    if let Some(path) = &args.config {
        return Config::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()));
    }

    let base = match &args.base_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    Ok(Config::rooted(&base))
}

fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Create {
            no_db,
            no_images,
            logs,
            description,
        } => {
            let created = ArchiveWriter::new(config).create(&CreateOptions {
                include_db: !no_db,
                include_images: !no_images,
                include_logs: logs,
                description,
            })?;
            println!(
                "Created {} ({} files, {})",
                created.file_name,
                created.manifest.total_files,
                format_size(created.archive_size)
            );
        }

        Command::List { limit } => {
            let archives = archive::list(
                &config.storage.backup_dir,
                &config.storage.archive_prefix,
                limit,
            )?;
            if archives.is_empty() {
                println!("No backups found");
                return Ok(());
            }

            println!("Available backups ({}):", archives.len());
            for info in &archives {
                println!("  {}", info.file_name);
                println!("    date: {}", info.date);
                println!("    size: {}, files: {}", info.size_formatted, info.total_files);
                println!("    includes: {}", includes_summary(&info.includes));
                if !info.description.is_empty() {
                    println!("    description: {}", info.description);
                }
            }
        }

        Command::Restore {
            archive,
            no_db,
            no_images,
            logs,
            no_safety_backup,
        } => {
            let path = resolve_archive(config, &archive);
            let report = Restorer::new(config).restore(
                &path,
                &RestoreOptions {
                    restore_db: !no_db,
                    restore_images: !no_images,
                    restore_logs: logs,
                    safety_backup: !no_safety_backup,
                },
            )?;
            println!("Restored {} files from {}", report.files_restored, path.display());
            if let Some(safety) = report.safety_archive {
                println!("Safety backup: {}", safety.display());
            }
        }

        Command::Cleanup { keep, days } => {
            let policy = RetentionPolicy {
                keep_count: keep.unwrap_or(config.retention.keep_count),
                keep_days: days.unwrap_or(config.retention.keep_days),
            };
            let removed = retention::cleanup(config, policy)?;
            println!("Removed {removed} archive(s)");
        }

        Command::Info { archive } => {
            let path = resolve_archive(config, &archive);
            let details = archive::inspect(&path)?;
            let manifest = &details.manifest;

            println!("{}", details.file_name);
            println!("  date: {}", manifest.date);
            println!(
                "  size: {} ({} raw)",
                details.size_formatted, manifest.total_size_formatted
            );
            println!("  files: {}", manifest.total_files);
            println!("  includes: {}", includes_summary(&manifest.includes));
            if !manifest.description.is_empty() {
                println!("  description: {}", manifest.description);
            }

            for kind in [FileKind::Database, FileKind::Image, FileKind::Log] {
                let count = manifest.entries_of(kind).count();
                if count == 0 {
                    continue;
                }
                let bytes: u64 = manifest.entries_of(kind).map(|e| e.size).sum();
                println!("  {}: {} file(s), {}", kind.label(), count, format_size(bytes));
            }
        }

        Command::Schedule => {
            let cadence = Cadence::from_config(&config.schedule)?;
            Scheduler::new(config, cadence).run();
        }
    }

    Ok(())
}

/// A bare archive name refers to the configured backup directory; an
/// absolute or existing path is used as given.
fn resolve_archive(config: &Config, name: &str) -> PathBuf {
    let given = PathBuf::from(name);
    if given.is_absolute() || given.exists() {
        given
    } else {
        config.storage.backup_dir.join(given)
    }
}

fn includes_summary(includes: &Includes) -> String {
    let mut parts = Vec::new();
    if includes.database {
        parts.push("database");
    }
    if includes.images {
        parts.push("images");
    }
    if includes.logs {
        parts.push("logs");
    }
    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(", ")
    }
}
