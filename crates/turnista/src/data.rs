use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

use crate::types::{Roster, RosterRequest};

/// Load a roster request from a JSON file
pub fn load_request(path: &Path) -> Result<RosterRequest> {
    load_json(path).with_context(|| format!("Failed to load request from {}", path.display()))
}

/// Load a previously saved roster
pub fn load_roster(path: &Path) -> Result<Roster> {
    load_json(path).with_context(|| format!("Failed to load roster from {}", path.display()))
}

/// Save a roster as pretty-printed JSON
pub fn save_roster(roster: &Roster, path: &Path) -> Result<()> {
    save_json(roster, path)?;
    debug!(path = %path.display(), slots = roster.assignments.len(), "Roster saved");
    Ok(())
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).context("Failed to read JSON file")?;
    let value = serde_json::from_str(&content).context("Failed to parse JSON")?;
    Ok(value)
}

fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
