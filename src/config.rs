//! Configuration for the backup subsystem.
//!
//! Loads configuration from a TOML file with per-field defaults, or derives
//! the standard storefront layout from a single base directory. The
//! configuration is always passed explicitly into the engine's constructors.

use crate::retention::RetentionPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,

    #[serde(default)]
    pub retention: RetentionPolicy,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory archives are written to
    pub backup_dir: PathBuf,

    /// Directory holding the application's SQLite database file(s)
    pub database_dir: PathBuf,

    /// Media root; product images live beneath it
    pub static_dir: PathBuf,

    /// Directory holding application log files
    pub logs_dir: PathBuf,

    /// Leading component of archive file names
    #[serde(default = "default_archive_prefix")]
    pub archive_prefix: String,

    /// Master switch consumed from the host application
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// hourly | daily | weekly
    #[serde(default = "default_cadence")]
    pub cadence: String,

    /// Time of day for daily/weekly runs (HH:MM)
    #[serde(default = "default_time")]
    pub time: String,

    /// Day of week for weekly runs
    #[serde(default = "default_weekday")]
    pub weekday: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_archive_prefix() -> String {
    "store".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_cadence() -> String {
    "daily".to_string()
}

fn default_time() -> String {
    "03:00".to_string()
}

fn default_weekday() -> String {
    "sunday".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cadence: default_cadence(),
            time: default_time(),
            weekday: default_weekday(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Derive the standard storefront layout from a single base directory.
    pub fn rooted(base: &Path) -> Self {
        Config {
            storage: StorageConfig {
                backup_dir: base.join("backups"),
                database_dir: base.join("instance"),
                static_dir: base.join("static"),
                logs_dir: base.join("logs"),
                archive_prefix: default_archive_prefix(),
                enabled: default_enabled(),
            },
            retention: RetentionPolicy::default(),
            schedule: ScheduleConfig::default(),
            log: LogConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_toml() {
        let raw = r#"
            [storage]
            backup_dir = "/data/backups"
            database_dir = "/data/instance"
            static_dir = "/data/static"
            logs_dir = "/data/logs"
        "#;

        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.storage.archive_prefix, "store");
        assert!(config.storage.enabled);
        assert_eq!(config.retention.keep_count, 10);
        assert_eq!(config.retention.keep_days, 30);
        assert_eq!(config.schedule.cadence, "daily");
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_parse_overrides() {
        let raw = r#"
            [storage]
            backup_dir = "/b"
            database_dir = "/d"
            static_dir = "/s"
            logs_dir = "/l"
            archive_prefix = "shop"
            enabled = false

            [retention]
            keep_count = 3
            keep_days = 0

            [schedule]
            cadence = "weekly"
            time = "04:30"
            weekday = "monday"
        "#;

        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.storage.archive_prefix, "shop");
        assert!(!config.storage.enabled);
        assert_eq!(config.retention.keep_count, 3);
        assert_eq!(config.retention.keep_days, 0);
        assert_eq!(config.schedule.weekday, "monday");
    }

    #[test]
    fn test_rooted_layout() {
        let config = Config::rooted(Path::new("/srv/shop"));
        assert_eq!(config.storage.backup_dir, PathBuf::from("/srv/shop/backups"));
        assert_eq!(config.storage.database_dir, PathBuf::from("/srv/shop/instance"));
        assert_eq!(config.storage.static_dir, PathBuf::from("/srv/shop/static"));
        assert_eq!(config.storage.logs_dir, PathBuf::from("/srv/shop/logs"));
    }
}
