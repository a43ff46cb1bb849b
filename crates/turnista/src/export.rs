use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::types::{Roster, ShiftDef};

/// Text written in place of a name for slots nobody covers
pub const UNCOVERED: &str = "UNCOVERED";

/// Shape of the CSV export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CsvLayout {
    /// One row per day, one column per shift
    #[default]
    Grid,
    /// One row per slot
    Long,
    /// One row per staff member with totals
    Summary,
}

/// Render a roster as CSV
pub fn to_csv(roster: &Roster, layout: CsvLayout) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    match layout {
        CsvLayout::Grid => write_grid(roster, &mut writer)?,
        CsvLayout::Long => write_long(roster, &mut writer)?,
        CsvLayout::Summary => write_summary(roster, &mut writer)?,
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to finish CSV: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV is not valid UTF-8")
}

fn write_grid(roster: &Roster, writer: &mut csv::Writer<Vec<u8>>) -> csv::Result<()> {
    let mut header = vec!["Date".to_string(), "Day".to_string()];
    header.extend(roster.request.shifts.iter().map(|s| s.name.clone()));
    writer.write_record(&header)?;

    for date in roster.days() {
        let mut row = vec![date.format("%Y-%m-%d").to_string(), date.format("%a").to_string()];
        row.extend(
            roster
                .request
                .shifts
                .iter()
                .map(|shift| cell_text(roster, date, shift)),
        );
        writer.write_record(&row)?;
    }

    Ok(())
}

fn write_long(roster: &Roster, writer: &mut csv::Writer<Vec<u8>>) -> csv::Result<()> {
    writer.write_record(["Date", "Day", "Shift", "Role", "Slot", "Staff"])?;

    for a in &roster.assignments {
        writer.write_record([
            a.date.format("%Y-%m-%d").to_string(),
            a.date.format("%a").to_string(),
            a.shift.clone(),
            a.role.clone(),
            (a.slot + 1).to_string(),
            a.staff.clone().unwrap_or_else(|| UNCOVERED.to_string()),
        ])?;
    }

    Ok(())
}

fn write_summary(roster: &Roster, writer: &mut csv::Writer<Vec<u8>>) -> csv::Result<()> {
    writer.write_record(["Staff", "Shifts", "Weekend", "Days", "Target"])?;

    for stats in roster.stats() {
        writer.write_record([
            stats.name,
            stats.shifts.to_string(),
            stats.weekend_shifts.to_string(),
            stats.days_worked.to_string(),
            stats.target.to_string(),
        ])?;
    }

    Ok(())
}

/// Who works a shift on a day, e.g. `Mario (Barista); UNCOVERED (Cuoco)`.
///
/// Roles are left out when the shift has only one.
pub fn cell_text(roster: &Roster, date: NaiveDate, shift: &ShiftDef) -> String {
    let show_role = shift.roles.len() > 1;
    roster
        .slots_for(date, &shift.name)
        .map(|a| {
            let who = a.staff.as_deref().unwrap_or(UNCOVERED);
            if show_role {
                format!("{} ({})", who, a.role)
            } else {
                who.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Plain text roster to paste into a group chat
pub fn to_chat_text(roster: &Roster, company: &str) -> String {
    let mut out = format!(
        "📅 {} - Shifts {} - {}\n",
        company,
        roster.request.start.format("%d/%m"),
        roster.request.end.format("%d/%m/%Y")
    );

    for date in roster.days() {
        out.push_str(&format!("\n*{}*\n", date.format("%a %d/%m")));
        for shift in &roster.request.shifts {
            let show_role = shift.roles.len() > 1;
            let entries: Vec<String> = roster
                .slots_for(date, &shift.name)
                .map(|a| {
                    let who = match a.staff.as_deref() {
                        Some(name) => name.to_string(),
                        None => format!("⚠️ {}", UNCOVERED),
                    };
                    if show_role {
                        format!("{} ({})", who, a.role)
                    } else {
                        who
                    }
                })
                .collect();
            out.push_str(&format!("{}: {}\n", shift.name, entries.join(", ")));
        }
    }

    let uncovered = roster.uncovered().len();
    if uncovered > 0 {
        out.push_str(&format!("\n⚠️ {} uncovered slots\n", uncovered));
    }

    out
}
