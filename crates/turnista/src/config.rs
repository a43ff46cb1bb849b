//! Business defaults loaded from environment variables.

use anyhow::{Context, Result};

pub const DEFAULT_COMPANY: &str = "Bar Esempio";
pub const DEFAULT_STAFF: &str = "Mario, Luigi, Anna, Giovanni";
pub const DEFAULT_SHIFTS: &str = "Mattina, Pomeriggio, Notte";

/// Settings a business owner sets once, before handing the tool over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Shown in page titles and chat exports
    pub company: String,

    /// Initial content of the staff text area
    pub staff: String,

    /// Initial content of the shifts text area
    pub shifts: String,

    /// People per shift when a shift lists no roles
    pub staff_per_shift: u32,

    pub weekend_fairness: bool,
    pub avoid_consecutive: bool,

    /// Length of the trial in days, `None` disables the trial gate
    pub trial_days: Option<u32>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            company: DEFAULT_COMPANY.to_string(),
            staff: DEFAULT_STAFF.to_string(),
            shifts: DEFAULT_SHIFTS.to_string(),
            staff_per_shift: 1,
            weekend_fairness: false,
            avoid_consecutive: false,
            trial_days: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    /// Every `TURNISTA_*` variable is optional.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let staff_per_shift = match get("TURNISTA_STAFF_PER_SHIFT") {
            Some(v) => v
                .trim()
                .parse::<u32>()
                .with_context(|| format!("TURNISTA_STAFF_PER_SHIFT is not a number: {}", v))?,
            None => defaults.staff_per_shift,
        };

        let trial_days = match get("TURNISTA_TRIAL_DAYS") {
            Some(v) => Some(
                v.trim()
                    .parse::<u32>()
                    .with_context(|| format!("TURNISTA_TRIAL_DAYS is not a number: {}", v))?,
            ),
            None => None,
        };

        let weekend_fairness = match get("TURNISTA_WEEKEND_FAIRNESS") {
            Some(v) => parse_flag(&v).context("Invalid TURNISTA_WEEKEND_FAIRNESS")?,
            None => defaults.weekend_fairness,
        };

        let avoid_consecutive = match get("TURNISTA_AVOID_CONSECUTIVE") {
            Some(v) => parse_flag(&v).context("Invalid TURNISTA_AVOID_CONSECUTIVE")?,
            None => defaults.avoid_consecutive,
        };

        Ok(Self {
            company: get("TURNISTA_COMPANY")
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.company),
            staff: get("TURNISTA_STAFF").unwrap_or(defaults.staff),
            shifts: get("TURNISTA_SHIFTS").unwrap_or(defaults.shifts),
            staff_per_shift,
            weekend_fairness,
            avoid_consecutive,
            trial_days,
        })
    }
}

/// Parse a yes/no flag as written in `.env` files or sent by HTML checkboxes
pub fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "si" | "sì" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected yes or no, got {:?}", other),
    }
}
