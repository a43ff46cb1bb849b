use chrono::{Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::AppConfig;
use crate::error::RosterError;
use crate::scheduler;
use crate::types::{
    fold_case, LeavePeriod, RoleRequirement, RosterOptions, RosterRequest, ShiftDef, StaffMember,
    DEFAULT_ROLE,
};

/// Weekday spellings accepted in staff options, English and Italian
const WEEKDAY_NAMES: &[(&str, Weekday)] = &[
    ("mon", Weekday::Mon),
    ("monday", Weekday::Mon),
    ("lun", Weekday::Mon),
    ("lunedi", Weekday::Mon),
    ("lunedì", Weekday::Mon),
    ("tue", Weekday::Tue),
    ("tuesday", Weekday::Tue),
    ("mar", Weekday::Tue),
    ("martedi", Weekday::Tue),
    ("martedì", Weekday::Tue),
    ("wed", Weekday::Wed),
    ("wednesday", Weekday::Wed),
    ("mer", Weekday::Wed),
    ("mercoledi", Weekday::Wed),
    ("mercoledì", Weekday::Wed),
    ("thu", Weekday::Thu),
    ("thursday", Weekday::Thu),
    ("gio", Weekday::Thu),
    ("giovedi", Weekday::Thu),
    ("giovedì", Weekday::Thu),
    ("fri", Weekday::Fri),
    ("friday", Weekday::Fri),
    ("ven", Weekday::Fri),
    ("venerdi", Weekday::Fri),
    ("venerdì", Weekday::Fri),
    ("sat", Weekday::Sat),
    ("saturday", Weekday::Sat),
    ("sab", Weekday::Sat),
    ("sabato", Weekday::Sat),
    ("sun", Weekday::Sun),
    ("sunday", Weekday::Sun),
    ("dom", Weekday::Sun),
    ("domenica", Weekday::Sun),
];

/// Parse a weekday name (case-insensitive)
pub fn parse_weekday(s: &str) -> Result<Weekday, RosterError> {
    let lower = s.trim().to_lowercase();
    WEEKDAY_NAMES
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, day)| *day)
        .ok_or_else(|| RosterError::InvalidWeekday(s.trim().to_string()))
}

/// Parse a date as YYYY-MM-DD or DD/MM/YYYY
pub fn parse_date(s: &str) -> Result<NaiveDate, RosterError> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .map_err(|_| RosterError::InvalidDate(s.to_string()))
}

/// Comma-separated items, trimmed, blanks dropped
fn split_list(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').map(str::trim).filter(|item| !item.is_empty())
}

/// Non-blank lines that are not `#` comments
fn content_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Parse a leave list: single dates or `from..to` ranges
fn parse_leave(value: &str) -> Result<Vec<LeavePeriod>, RosterError> {
    split_list(value)
        .map(|item| match item.split_once("..") {
            Some((from, to)) => {
                let from = parse_date(from)?;
                let to = parse_date(to)?;
                if to < from {
                    return Err(RosterError::InvalidValue {
                        key: "leave".to_string(),
                        value: item.to_string(),
                    });
                }
                Ok(LeavePeriod::new(from, to))
            }
            None => parse_date(item).map(LeavePeriod::day),
        })
        .collect()
}

/// Parse one staff line: `Name: role, role | rest=1 | off=mon,tue | leave=2025-01-10..2025-01-12`
fn parse_staff_line(line: &str) -> Result<StaffMember, RosterError> {
    let mut parts = line.split('|');
    let head = parts.next().unwrap_or_default().trim();

    let (name, roles): (&str, Vec<&str>) = match head.split_once(':') {
        Some((name, roles)) => (name.trim(), split_list(roles).collect()),
        None => (head, Vec::new()),
    };
    if name.is_empty() {
        return Err(RosterError::InvalidValue {
            key: "name".to_string(),
            value: line.to_string(),
        });
    }

    let mut rest = 0;
    let mut unavailable: Vec<Weekday> = Vec::new();
    let mut leave = Vec::new();

    for option in parts.map(str::trim).filter(|o| !o.is_empty()) {
        let (key, value) = option
            .split_once('=')
            .ok_or_else(|| RosterError::UnknownOption(option.to_string()))?;
        let value = value.trim();

        match key.trim().to_lowercase().as_str() {
            "rest" | "riposo" | "riposi" => {
                rest = value.parse().map_err(|_| RosterError::InvalidValue {
                    key: key.trim().to_string(),
                    value: value.to_string(),
                })?;
                if rest > 7 {
                    return Err(RosterError::TooManyRestDays {
                        name: name.to_string(),
                        rest,
                    });
                }
            }
            "off" | "no" | "unavailable" => {
                for day in split_list(value) {
                    let weekday = parse_weekday(day)?;
                    if !unavailable.contains(&weekday) {
                        unavailable.push(weekday);
                    }
                }
            }
            "leave" | "ferie" => {
                leave.extend(parse_leave(value)?);
            }
            _ => return Err(RosterError::UnknownOption(key.trim().to_string())),
        }
    }

    let member = StaffMember::new(name)
        .with_roles(&roles)
        .with_rest_days(rest)
        .with_unavailable(&unavailable);
    Ok(leave
        .into_iter()
        .fold(member, |member, period: LeavePeriod| member.with_leave(period.from, period.to)))
}

/// Parse the staff text area.
///
/// A line with no `:` and no `|` is a plain comma-separated list of names,
/// so `Mario, Luigi, Anna` works on its own. Any other line describes one
/// person with roles and options.
pub fn parse_staff(text: &str) -> Result<Vec<StaffMember>, RosterError> {
    let mut staff = Vec::new();

    for line in content_lines(text) {
        if line.contains(':') || line.contains('|') {
            staff.push(parse_staff_line(line)?);
        } else {
            staff.extend(split_list(line).map(StaffMember::new));
        }
    }

    if staff.is_empty() {
        return Err(RosterError::EmptyStaff);
    }

    let mut seen = HashSet::new();
    for member in &staff {
        if !seen.insert(fold_case(&member.name)) {
            return Err(RosterError::DuplicateStaff(member.name.clone()));
        }
    }

    Ok(staff)
}

/// Split `Barista x2`, `Barista*2` or `2 Barista` into role and count
fn split_count(item: &str) -> (&str, Option<u32>) {
    if let Some((role, count)) = item.rsplit_once(|c: char| matches!(c, 'x' | 'X' | '*')) {
        if let Ok(count) = count.trim().parse() {
            if !role.trim().is_empty() {
                return (role.trim(), Some(count));
            }
        }
    }
    if let Some((count, role)) = item.split_once(char::is_whitespace) {
        if let Ok(count) = count.parse() {
            return (role.trim(), Some(count));
        }
    }
    (item.trim(), None)
}

fn parse_role(shift: &str, item: &str) -> Result<RoleRequirement, RosterError> {
    let (role, count) = split_count(item);
    let count = count.unwrap_or(1);
    if count == 0 {
        return Err(RosterError::ZeroRoleCount {
            shift: shift.to_string(),
            role: role.to_string(),
        });
    }
    Ok(RoleRequirement::new(role, count))
}

/// Parse the shifts text area.
///
/// One shift per line as `Name: Role x2, Role`, or a comma-separated list
/// of plain shift names. Shifts without roles are staffed by
/// `staff_per_shift` people of the generic role.
pub fn parse_shifts(text: &str, staff_per_shift: u32) -> Result<Vec<ShiftDef>, RosterError> {
    let mut shifts = Vec::new();

    for line in content_lines(text) {
        let (names, roles): (Vec<&str>, Option<&str>) = match line.split_once(':') {
            Some((name, roles)) => (vec![name.trim()], Some(roles)),
            None => (split_list(line).collect(), None),
        };

        for name in names {
            if name.is_empty() {
                return Err(RosterError::InvalidValue {
                    key: "shift".to_string(),
                    value: line.to_string(),
                });
            }

            let roles = split_list(roles.unwrap_or_default())
                .map(|item| parse_role(name, item))
                .collect::<Result<Vec<_>, _>>()?;

            let shift = if roles.is_empty() {
                if staff_per_shift == 0 {
                    return Err(RosterError::ZeroRoleCount {
                        shift: name.to_string(),
                        role: DEFAULT_ROLE.to_string(),
                    });
                }
                ShiftDef::generic(name, staff_per_shift)
            } else {
                ShiftDef {
                    name: name.to_string(),
                    roles,
                }
            };
            shifts.push(shift);
        }
    }

    if shifts.is_empty() {
        return Err(RosterError::NoShifts);
    }

    let mut seen = HashSet::new();
    for shift in &shifts {
        if !seen.insert(fold_case(&shift.name)) {
            return Err(RosterError::DuplicateShift(shift.name.clone()));
        }
    }

    Ok(shifts)
}

/// Write staff back in the text area format, one person per line
pub fn format_staff(staff: &[StaffMember]) -> String {
    staff
        .iter()
        .map(|member| {
            let mut line = member.name.clone();
            if !member.roles.is_empty() {
                line.push_str(": ");
                line.push_str(&member.roles.join(", "));
            }
            if member.rest_days_per_week > 0 {
                line.push_str(&format!(" | rest={}", member.rest_days_per_week));
            }
            if !member.unavailable.is_empty() {
                let days: Vec<String> = member.unavailable.iter().map(|d| d.to_string()).collect();
                line.push_str(&format!(" | off={}", days.join(",")));
            }
            if !member.leave.is_empty() {
                let periods: Vec<String> = member
                    .leave
                    .iter()
                    .map(|l| {
                        if l.from == l.to {
                            l.from.to_string()
                        } else {
                            format!("{}..{}", l.from, l.to)
                        }
                    })
                    .collect();
                line.push_str(&format!(" | leave={}", periods.join(",")));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write shifts back in the text area format, one shift per line
pub fn format_shifts(shifts: &[ShiftDef]) -> String {
    shifts
        .iter()
        .map(|shift| {
            let roles: Vec<String> = shift
                .roles
                .iter()
                .map(|r| {
                    if r.count == 1 {
                        r.role.clone()
                    } else {
                        format!("{} x{}", r.role, r.count)
                    }
                })
                .collect();
            format!("{}: {}", shift.name, roles.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse an optional number field, blank meaning `None`
fn parse_optional<T: std::str::FromStr>(key: &str, value: &str) -> Result<Option<T>, RosterError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value.parse().map(Some).map_err(|_| RosterError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Fields of the roster web form, all as submitted text.
///
/// Checkboxes are only sent when ticked, so any value means "on".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterForm {
    #[serde(default)]
    pub staff: String,
    #[serde(default)]
    pub shifts: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub staff_per_shift: String,
    #[serde(default)]
    pub weekend_fairness: Option<String>,
    #[serde(default)]
    pub avoid_consecutive: Option<String>,
    #[serde(default)]
    pub max_consecutive_days: String,
    #[serde(default)]
    pub seed: String,
}

impl RosterForm {
    /// Form pre-filled from configuration, covering one week from `today`
    pub fn from_config(config: &AppConfig, today: NaiveDate) -> Self {
        Self {
            staff: config.staff.clone(),
            shifts: config.shifts.clone(),
            start: today.to_string(),
            end: (today + Duration::days(6)).to_string(),
            staff_per_shift: config.staff_per_shift.to_string(),
            weekend_fairness: config.weekend_fairness.then(|| "on".to_string()),
            avoid_consecutive: config.avoid_consecutive.then(|| "on".to_string()),
            max_consecutive_days: String::new(),
            seed: String::new(),
        }
    }

    /// Form showing an existing request, so it can be tweaked and generated again
    pub fn from_request(request: &RosterRequest) -> Self {
        Self {
            staff: format_staff(&request.staff),
            shifts: format_shifts(&request.shifts),
            start: request.start.to_string(),
            end: request.end.to_string(),
            staff_per_shift: "1".to_string(),
            weekend_fairness: request.options.weekend_fairness.then(|| "on".to_string()),
            avoid_consecutive: request.options.avoid_consecutive.then(|| "on".to_string()),
            max_consecutive_days: request
                .options
                .max_consecutive_days
                .map(|n| n.to_string())
                .unwrap_or_default(),
            seed: request.seed.map(|n| n.to_string()).unwrap_or_default(),
        }
    }

    /// Parse and validate every field into a request
    pub fn to_request(&self) -> Result<RosterRequest, RosterError> {
        let staff_per_shift = parse_optional("staff_per_shift", &self.staff_per_shift)?.unwrap_or(1);
        let staff = parse_staff(&self.staff)?;
        let shifts = parse_shifts(&self.shifts, staff_per_shift)?;
        let start = parse_date(&self.start)?;
        let end = parse_date(&self.end)?;

        let options = RosterOptions {
            weekend_fairness: self.weekend_fairness.is_some(),
            avoid_consecutive: self.avoid_consecutive.is_some(),
            max_consecutive_days: parse_optional("max_consecutive_days", &self.max_consecutive_days)?,
        };
        let mut request = RosterRequest::new(start, end, staff, shifts).with_options(options);
        if let Some(seed) = parse_optional("seed", &self.seed)? {
            request = request.with_seed(seed);
        }

        scheduler::validate_request(&request)?;
        Ok(request)
    }
}
