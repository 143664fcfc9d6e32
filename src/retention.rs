//! Retention policy enforcement over the archive directory.
//!
//! Archives age out by identifier: the file name encodes the creation time,
//! so a cleanup pass never opens a container, and a corrupt archive is
//! still subject to retention.

use crate::archive;
use crate::config::Config;
use crate::utils::errors::Result;
use chrono::{Duration, Local};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Which archives survive a cleanup pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Most-recent archives kept unconditionally
    #[serde(default = "default_keep_count")]
    pub keep_count: usize,

    /// Archives younger than this many days are kept even beyond
    /// `keep_count`; zero disables the time-based exemption
    #[serde(default = "default_keep_days")]
    pub keep_days: i64,
}

fn default_keep_count() -> usize {
    10
}

fn default_keep_days() -> i64 {
    30
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            keep_count: default_keep_count(),
            keep_days: default_keep_days(),
        }
    }
}

/// Delete archives outside the retention window; returns how many were
/// actually removed.
///
/// The newest `keep_count` archives always survive. Among the rest,
/// anything created within the last `keep_days` days survives too, and
/// everything else is deleted. Deletion is per-archive best-effort: a
/// failure is logged, not counted, and never stops the pass.
pub fn cleanup(config: &Config, policy: RetentionPolicy) -> Result<usize> {
    let storage = &config.storage;
    let archives = archive::scan(&storage.backup_dir, &storage.archive_prefix)?;
    let cutoff = Local::now().naive_local() - Duration::days(policy.keep_days);

    let mut removed = 0;
    for entry in archives.iter().skip(policy.keep_count) {
        if policy.keep_days > 0 {
            if let Some(created) = archive::parse_created(&entry.file_name) {
                if created > cutoff {
                    continue;
                }
            }
        }

        match std::fs::remove_file(&entry.path) {
            Ok(()) => {
                removed += 1;
                info!(archive = %entry.file_name, "removed archive outside retention window");
            }
            Err(e) => {
                warn!(archive = %entry.file_name, error = %e, "failed to remove archive");
            }
        }
    }

    if removed > 0 {
        info!(removed, kept = archives.len() - removed, "retention pass complete");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use std::fs;
    use tempfile::TempDir;

    fn fixture_config(temp_dir: &TempDir) -> Config {
        let config = Config::rooted(temp_dir.path());
        fs::create_dir_all(&config.storage.backup_dir).unwrap();
        config
    }

    fn seed_archive(config: &Config, stamp: &str) {
        let name = format!("store_backup_{stamp}.zip");
        fs::write(config.storage.backup_dir.join(name), b"archive bytes").unwrap();
    }

    fn remaining(config: &Config) -> Vec<String> {
        archive::scan(&config.storage.backup_dir, "store")
            .unwrap()
            .into_iter()
            .map(|e| e.file_name)
            .collect()
    }

    #[test]
    fn test_keep_count_with_no_time_window() {
        let temp_dir = TempDir::new().unwrap();
        let config = fixture_config(&temp_dir);

        for stamp in [
            "20260801_090000",
            "20260802_090000",
            "20260803_090000",
            "20260804_090000",
            "20260805_090000",
        ] {
            seed_archive(&config, stamp);
        }

        let removed = cleanup(
            &config,
            RetentionPolicy {
                keep_count: 3,
                keep_days: 0,
            },
        )
        .unwrap();

        assert_eq!(removed, 2);
        assert_eq!(
            remaining(&config),
            vec![
                "store_backup_20260805_090000.zip",
                "store_backup_20260804_090000.zip",
                "store_backup_20260803_090000.zip",
            ]
        );
    }

    #[test]
    fn test_recent_archives_survive_beyond_keep_count() {
        let temp_dir = TempDir::new().unwrap();
        let config = fixture_config(&temp_dir);

        // All created "today", so the 30-day window protects every one of
        // them no matter how small keep_count is.
        let today = Local::now();
        for hour in ["080000", "090000", "100000", "110000"] {
            seed_archive(
                &config,
                &format!("{:04}{:02}{:02}_{hour}", today.year(), today.month(), today.day()),
            );
        }

        let removed = cleanup(
            &config,
            RetentionPolicy {
                keep_count: 1,
                keep_days: 30,
            },
        )
        .unwrap();

        assert_eq!(removed, 0);
        assert_eq!(remaining(&config).len(), 4);
    }

    #[test]
    fn test_old_archives_removed_beyond_keep_count() {
        let temp_dir = TempDir::new().unwrap();
        let config = fixture_config(&temp_dir);

        // Far in the past, well outside any plausible window.
        for stamp in ["20200101_090000", "20200102_090000", "20200103_090000"] {
            seed_archive(&config, stamp);
        }

        let removed = cleanup(
            &config,
            RetentionPolicy {
                keep_count: 1,
                keep_days: 30,
            },
        )
        .unwrap();

        assert_eq!(removed, 2);
        assert_eq!(
            remaining(&config),
            vec!["store_backup_20200103_090000.zip"]
        );
    }

    #[test]
    fn test_keep_count_larger_than_population() {
        let temp_dir = TempDir::new().unwrap();
        let config = fixture_config(&temp_dir);

        seed_archive(&config, "20200101_090000");

        let removed = cleanup(
            &config,
            RetentionPolicy {
                keep_count: 10,
                keep_days: 0,
            },
        )
        .unwrap();

        assert_eq!(removed, 0);
        assert_eq!(remaining(&config).len(), 1);
    }

    #[test]
    fn test_cleanup_on_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::rooted(temp_dir.path());

        let removed = cleanup(&config, RetentionPolicy::default()).unwrap();
        assert_eq!(removed, 0);
    }
}
