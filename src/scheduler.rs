//! Periodic backup scheduling.
//!
//! A single-threaded cooperative timer loop: sleep until the next tick, run
//! one backup-then-cleanup pass inline, advance. Because the pass runs on
//! the loop's own thread, at most one is ever in flight; ticks that come due
//! while a pass is still running are skipped with a warning, never queued.

use crate::config::{Config, ScheduleConfig};
use crate::retention;
use crate::utils::errors::{BackupError, Result};
use crate::writer::{ArchiveWriter, CreateOptions};
use chrono::{Datelike, Duration, Local, NaiveDateTime, NaiveTime, Timelike, Weekday};
use std::str::FromStr;
use std::thread;
use tracing::{error, info, warn};

/// How often the scheduler fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Top of every hour
    Hourly,
    /// Every day at the given time
    Daily(NaiveTime),
    /// Once a week on the given day at the given time
    Weekly(Weekday, NaiveTime),
}

impl Cadence {
    /// Parse the `[schedule]` configuration section.
    pub fn from_config(cfg: &ScheduleConfig) -> Result<Self> {
        let parse_time = |raw: &str| {
            NaiveTime::parse_from_str(raw, "%H:%M")
                .map_err(|e| BackupError::Config(format!("invalid schedule time {raw:?}: {e}")))
        };

        match cfg.cadence.as_str() {
            "hourly" => Ok(Cadence::Hourly),
            "daily" => Ok(Cadence::Daily(parse_time(&cfg.time)?)),
            "weekly" => {
                let weekday = Weekday::from_str(&cfg.weekday).map_err(|_| {
                    BackupError::Config(format!("invalid schedule weekday {:?}", cfg.weekday))
                })?;
                Ok(Cadence::Weekly(weekday, parse_time(&cfg.time)?))
            }
            other => Err(BackupError::Config(format!(
                "invalid schedule cadence {other:?}"
            ))),
        }
    }

    /// The first tick strictly after `after`.
    pub fn next_after(&self, after: NaiveDateTime) -> NaiveDateTime {
        match *self {
            Cadence::Hourly => {
                let hour = after
                    .date()
                    .and_hms_opt(after.hour(), 0, 0)
                    .expect("hour taken from a valid datetime");
                hour + Duration::hours(1)
            }
            Cadence::Daily(time) => {
                let candidate = after.date().and_time(time);
                if candidate > after {
                    candidate
                } else {
                    candidate + Duration::days(1)
                }
            }
            Cadence::Weekly(weekday, time) => {
                let days_ahead = (weekday.num_days_from_monday() as i64
                    - after.weekday().num_days_from_monday() as i64)
                    .rem_euclid(7);
                let candidate = (after.date() + Duration::days(days_ahead)).and_time(time);
                if candidate > after {
                    candidate
                } else {
                    candidate + Duration::days(7)
                }
            }
        }
    }
}

pub struct Scheduler {
    config: Config,
    cadence: Cadence,
}

impl Scheduler {
    pub fn new(config: &Config, cadence: Cadence) -> Self {
        Self {
            config: config.clone(),
            cadence,
        }
    }

    /// Run the timer loop until the process is stopped.
    ///
    /// Returns immediately when backups are disabled in configuration.
    pub fn run(&self) {
        if !self.config.storage.enabled {
            info!("backups disabled in configuration, scheduler not starting");
            return;
        }

        let mut next = self.cadence.next_after(Local::now().naive_local());
        info!(next = %next, "backup scheduler started");

        loop {
            let now = Local::now().naive_local();
            if let Ok(wait) = (next - now).to_std() {
                thread::sleep(wait);
            }

            self.run_once();

            // Advance strictly past "now": ticks that came due while the
            // pass ran are skipped, never queued.
            let now = Local::now().naive_local();
            let mut upcoming = self.cadence.next_after(next);
            let mut skipped = 0;
            while upcoming <= now {
                upcoming = self.cadence.next_after(upcoming);
                skipped += 1;
            }
            if skipped > 0 {
                warn!(skipped, "backup pass overran its schedule, skipping missed ticks");
            }
            next = upcoming;
        }
    }

    /// One scheduled pass: create an archive, then apply retention.
    /// Failures are logged and never stop the timer loop.
    pub fn run_once(&self) {
        let opts = CreateOptions {
            description: "Scheduled backup".to_string(),
            ..CreateOptions::default()
        };
        match ArchiveWriter::new(&self.config).create(&opts) {
            Ok(created) => info!(archive = %created.file_name, "scheduled backup complete"),
            Err(e) => error!(error = %e, "scheduled backup failed"),
        }

        match retention::cleanup(&self.config, self.config.retention) {
            Ok(removed) if removed > 0 => info!(removed, "scheduled cleanup removed archives"),
            Ok(_) => {}
            Err(e) => error!(error = %e, "scheduled cleanup failed"),
        }
    }
}
