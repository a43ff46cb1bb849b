//! Trial gate.
//!
//! The date of the first run is written to `trial.json` in the data
//! directory. Once the configured number of days has passed the tool
//! refuses to generate rosters. Deleting the file resets the trial, this
//! is a reminder and not a license check.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

pub const TRIAL_FILE: &str = "trial.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrialRecord {
    pub started_on: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialStatus {
    /// No trial configured
    Disabled,
    Active { days_left: u32 },
    Expired { trial_days: u32 },
}

impl TrialStatus {
    pub fn is_expired(&self) -> bool {
        matches!(self, TrialStatus::Expired { .. })
    }
}

/// Check the trial, starting it today if this is the first run.
///
/// A start date in the future (clock moved back) counts as zero elapsed days.
pub fn check_trial(data_dir: &Path, trial_days: Option<u32>, today: NaiveDate) -> Result<TrialStatus> {
    let Some(trial_days) = trial_days else {
        return Ok(TrialStatus::Disabled);
    };

    let path = data_dir.join(TRIAL_FILE);
    let record = match load_record(&path)? {
        Some(record) => record,
        None => {
            let record = TrialRecord { started_on: today };
            if !data_dir.exists() {
                std::fs::create_dir_all(data_dir).with_context(|| {
                    format!("Failed to create data directory {}", data_dir.display())
                })?;
            }
            save_record(&record, &path)?;
            info!(started_on = %today, trial_days, "Trial started");
            record
        }
    };

    let elapsed = (today - record.started_on).num_days().max(0);
    if elapsed >= i64::from(trial_days) {
        warn!(started_on = %record.started_on, trial_days, "Trial expired");
        return Ok(TrialStatus::Expired { trial_days });
    }

    let days_left = (i64::from(trial_days) - elapsed) as u32;
    debug!(days_left, "Trial active");
    Ok(TrialStatus::Active { days_left })
}

fn load_record(path: &Path) -> Result<Option<TrialRecord>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).context("Failed to read trial file")?;
    let record = serde_json::from_str(&content).context("Failed to parse trial file")?;
    Ok(Some(record))
}

fn save_record(record: &TrialRecord, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(path, json).context("Failed to write trial file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_disabled_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let status = check_trial(temp_dir.path(), None, date("2025-01-15")).unwrap();

        assert_eq!(status, TrialStatus::Disabled);
        assert!(!temp_dir.path().join(TRIAL_FILE).exists());
    }

    #[test]
    fn test_first_run_starts_trial() {
        let temp_dir = TempDir::new().unwrap();
        let status = check_trial(temp_dir.path(), Some(14), date("2025-01-15")).unwrap();

        assert_eq!(status, TrialStatus::Active { days_left: 14 });
        let saved = load_record(&temp_dir.path().join(TRIAL_FILE)).unwrap().unwrap();
        assert_eq!(saved.started_on, date("2025-01-15"));
    }

    #[test]
    fn test_creates_missing_data_dir() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("nested").join("data");

        check_trial(&data_dir, Some(14), date("2025-01-15")).unwrap();
        assert!(data_dir.join(TRIAL_FILE).exists());
    }

    #[test]
    fn test_days_left_counts_down() {
        let temp_dir = TempDir::new().unwrap();
        check_trial(temp_dir.path(), Some(14), date("2025-01-15")).unwrap();

        let status = check_trial(temp_dir.path(), Some(14), date("2025-01-25")).unwrap();
        assert_eq!(status, TrialStatus::Active { days_left: 4 });
        assert!(!status.is_expired());
    }

    #[test]
    fn test_expires_on_last_day() {
        let temp_dir = TempDir::new().unwrap();
        check_trial(temp_dir.path(), Some(14), date("2025-01-15")).unwrap();

        let status = check_trial(temp_dir.path(), Some(14), date("2025-01-29")).unwrap();
        assert_eq!(status, TrialStatus::Expired { trial_days: 14 });
        assert!(status.is_expired());
    }

    #[test]
    fn test_future_start_counts_as_today() {
        let temp_dir = TempDir::new().unwrap();
        check_trial(temp_dir.path(), Some(7), date("2025-02-01")).unwrap();

        let status = check_trial(temp_dir.path(), Some(7), date("2025-01-20")).unwrap();
        assert_eq!(status, TrialStatus::Active { days_left: 7 });
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(TRIAL_FILE), "not json").unwrap();

        let err = check_trial(temp_dir.path(), Some(7), date("2025-01-20")).unwrap_err();
        assert!(err.to_string().contains("Failed to parse trial file"));
    }
}
