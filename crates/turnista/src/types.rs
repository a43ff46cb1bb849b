use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::RosterError;
use crate::scheduler::{self, Conflict};

/// Role used for shifts that do not list any role
pub const DEFAULT_ROLE: &str = "Staff";

/// Longest period a single roster may cover, in days
pub const MAX_PERIOD_DAYS: i64 = 366;

/// Most people a single shift may need, summed over its roles
pub const MAX_SHIFT_HEADCOUNT: u32 = 500;

/// Key used to compare staff, role and shift names regardless of case
pub fn fold_case(name: &str) -> String {
    name.to_lowercase()
}

pub fn same_name(a: &str, b: &str) -> bool {
    fold_case(a) == fold_case(b)
}

/// Saturday and Sunday count as weekend days
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// An inclusive range of days a staff member is on leave
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeavePeriod {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl LeavePeriod {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn day(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// A person who can be put on the roster
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StaffMember {
    pub name: String,

    /// Roles this person can cover. Empty means any role.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Rest days requested per week (0-7)
    #[serde(default)]
    pub rest_days_per_week: u8,

    /// Weekdays this person never works
    #[serde(default)]
    pub unavailable: Vec<Weekday>,

    #[serde(default)]
    pub leave: Vec<LeavePeriod>,
}

impl StaffMember {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: Vec::new(),
            rest_days_per_week: 0,
            unavailable: Vec::new(),
            leave: Vec::new(),
        }
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_rest_days(mut self, rest_days_per_week: u8) -> Self {
        self.rest_days_per_week = rest_days_per_week;
        self
    }

    pub fn with_unavailable(mut self, weekdays: &[Weekday]) -> Self {
        self.unavailable = weekdays.to_vec();
        self
    }

    pub fn with_leave(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.leave.push(LeavePeriod::new(from, to));
        self
    }

    /// Role names are compared case-insensitively
    pub fn can_cover(&self, role: &str) -> bool {
        self.roles.is_empty() || self.roles.iter().any(|r| same_name(r, role))
    }

    pub fn is_on_leave(&self, date: NaiveDate) -> bool {
        self.leave.iter().any(|l| l.contains(date))
    }

    pub fn is_unavailable_on(&self, date: NaiveDate) -> bool {
        self.unavailable.contains(&date.weekday())
    }

    pub fn is_available_on(&self, date: NaiveDate) -> bool {
        !self.is_on_leave(date) && !self.is_unavailable_on(date)
    }

    /// Number of days this person should work over a period of `total_days`.
    ///
    /// The weekly rest quota is spread proportionally over the period:
    /// `total_days - floor(total_days * rest / 7)`.
    pub fn work_target(&self, total_days: u32) -> u32 {
        let rest = u32::from(self.rest_days_per_week.min(7));
        total_days - total_days * rest / 7
    }
}

/// How many people of a given role a shift needs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleRequirement {
    pub role: String,
    pub count: u32,
}

impl RoleRequirement {
    pub fn new(role: impl Into<String>, count: u32) -> Self {
        Self {
            role: role.into(),
            count,
        }
    }
}

/// A shift of the working day, e.g. "Mattina"
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShiftDef {
    pub name: String,
    pub roles: Vec<RoleRequirement>,
}

impl ShiftDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: Vec::new(),
        }
    }

    /// A shift staffed by `count` people of the generic role
    pub fn generic(name: impl Into<String>, count: u32) -> Self {
        Self::new(name).with_role(DEFAULT_ROLE, count)
    }

    pub fn with_role(mut self, role: impl Into<String>, count: u32) -> Self {
        self.roles.push(RoleRequirement::new(role, count));
        self
    }

    /// Total number of people this shift needs
    pub fn headcount(&self) -> u32 {
        self.roles.iter().fold(0, |total, r| total.saturating_add(r.count))
    }
}

/// Optional constraints toggled from the form
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterOptions {
    /// On Saturdays and Sundays prefer whoever has worked the fewest weekend shifts
    #[serde(default)]
    pub weekend_fairness: bool,

    /// Never put someone on the first shift of a day after the last shift of the day before
    #[serde(default)]
    pub avoid_consecutive: bool,

    /// Longest run of consecutive working days allowed
    #[serde(default)]
    pub max_consecutive_days: Option<u32>,
}

/// Everything needed to generate a roster
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub staff: Vec<StaffMember>,

    /// Shifts in the order they happen during the day
    pub shifts: Vec<ShiftDef>,

    #[serde(default)]
    pub options: RosterOptions,

    /// Fixed seed for reproducible tie-breaking
    #[serde(default)]
    pub seed: Option<u64>,
}

impl RosterRequest {
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        staff: Vec<StaffMember>,
        shifts: Vec<ShiftDef>,
    ) -> Self {
        Self {
            start,
            end,
            staff,
            shifts,
            options: RosterOptions::default(),
            seed: None,
        }
    }

    pub fn with_options(mut self, options: RosterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of days in the period, both ends included
    pub fn total_days(&self) -> u32 {
        ((self.end - self.start).num_days() + 1).max(0) as u32
    }

    /// Every date of the period in order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// Case-insensitive lookup by name
    pub fn find_staff(&self, name: &str) -> Option<&StaffMember> {
        let name = name.trim();
        self.staff.iter().find(|m| same_name(&m.name, name))
    }
}

/// Identifies one slot of the roster
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotKey {
    pub date: NaiveDate,
    pub shift: String,
    pub role: String,
    pub slot: u32,
}

/// One slot of one shift on one day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignment {
    pub date: NaiveDate,
    pub shift: String,
    pub role: String,

    /// Position among the slots of the same role in the same shift
    pub slot: u32,

    /// `None` when nobody could cover the slot
    pub staff: Option<String>,
}

impl Assignment {
    pub fn is_uncovered(&self) -> bool {
        self.staff.is_none()
    }

    #[cfg(test)]
    pub fn key(&self) -> SlotKey {
        SlotKey {
            date: self.date,
            shift: self.shift.clone(),
            role: self.role.clone(),
            slot: self.slot,
        }
    }

    fn matches(&self, key: &SlotKey) -> bool {
        self.date == key.date
            && self.slot == key.slot
            && same_name(&self.shift, &key.shift)
            && same_name(&self.role, &key.role)
    }
}

/// Per-person summary of a roster
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StaffStats {
    pub name: String,
    pub shifts: u32,
    pub weekend_shifts: u32,
    pub days_worked: u32,
    pub target: u32,
    pub per_shift: BTreeMap<String, u32>,
}

/// A generated roster, possibly edited by hand afterwards
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Roster {
    pub request: RosterRequest,

    /// Seed the tie-breaking rng was started with
    pub seed: u64,

    /// Slots ordered by date, then shift, then role, then slot
    pub assignments: Vec<Assignment>,
}

impl Roster {
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.request.days()
    }

    pub fn uncovered(&self) -> Vec<&Assignment> {
        self.assignments.iter().filter(|a| a.is_uncovered()).collect()
    }

    /// Slots of one shift on one day
    pub fn slots_for<'a>(
        &'a self,
        date: NaiveDate,
        shift: &'a str,
    ) -> impl Iterator<Item = &'a Assignment> + 'a {
        self.assignments
            .iter()
            .filter(move |a| a.date == date && a.shift == shift)
    }

    /// Totals per staff member, in staff list order
    pub fn stats(&self) -> Vec<StaffStats> {
        let total_days = self.request.total_days();
        let mut stats: Vec<StaffStats> = self
            .request
            .staff
            .iter()
            .map(|m| StaffStats {
                name: m.name.clone(),
                shifts: 0,
                weekend_shifts: 0,
                days_worked: 0,
                target: m.work_target(total_days),
                per_shift: BTreeMap::new(),
            })
            .collect();
        let mut days: Vec<HashSet<NaiveDate>> = vec![HashSet::new(); stats.len()];

        for assignment in &self.assignments {
            let Some(name) = assignment.staff.as_deref() else {
                continue;
            };
            let Some(idx) = stats.iter().position(|s| same_name(&s.name, name)) else {
                continue;
            };
            let entry = &mut stats[idx];
            entry.shifts += 1;
            if is_weekend(assignment.date) {
                entry.weekend_shifts += 1;
            }
            *entry.per_shift.entry(assignment.shift.clone()).or_insert(0) += 1;
            days[idx].insert(assignment.date);
        }

        for (entry, worked) in stats.iter_mut().zip(days) {
            entry.days_worked = worked.len() as u32;
        }

        stats
    }

    /// Put `staff` on a slot, or clear it with `None`.
    ///
    /// The name is matched against the staff list case-insensitively and stored
    /// as written there. Rule violations are not rejected here, see [`Roster::conflicts`].
    pub fn set_assignment(&mut self, key: &SlotKey, staff: Option<&str>) -> Result<(), RosterError> {
        let name = match staff.map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => Some(
                self.request
                    .find_staff(name)
                    .ok_or_else(|| RosterError::UnknownStaff(name.to_string()))?
                    .name
                    .clone(),
            ),
            None => None,
        };

        let assignment = self
            .assignments
            .iter_mut()
            .find(|a| a.matches(key))
            .ok_or_else(|| RosterError::UnknownSlot {
                date: key.date,
                shift: key.shift.clone(),
                role: key.role.clone(),
                slot: key.slot,
            })?;

        assignment.staff = name;
        Ok(())
    }

    /// Rule violations in the current state of the roster
    pub fn conflicts(&self) -> Vec<Conflict> {
        scheduler::check_roster(self)
    }
}
