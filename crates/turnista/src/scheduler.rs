//! Greedy shift assignment.
//!
//! Days are filled in order. Within a day, shifts are filled in the order
//! they were given, roles in the order listed for the shift, and each slot
//! goes to the eligible candidate with the lowest load. Equally loaded
//! candidates are picked at random. There is no backtracking: a slot that
//! nobody can cover stays uncovered and the next slot is processed.
//!
//! Runs in O(days * shifts * roles * staff log staff).

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use tracing::{debug, info};

use crate::error::RosterError;
use crate::types::{
    fold_case, is_weekend, Assignment, Roster, RosterOptions, RosterRequest, StaffMember,
    MAX_PERIOD_DAYS, MAX_SHIFT_HEADCOUNT,
};

/// Check that a request can be scheduled at all
pub fn validate_request(request: &RosterRequest) -> Result<(), RosterError> {
    if request.staff.is_empty() {
        return Err(RosterError::EmptyStaff);
    }

    let mut names = HashSet::new();
    for member in &request.staff {
        if !names.insert(fold_case(&member.name)) {
            return Err(RosterError::DuplicateStaff(member.name.clone()));
        }
        if member.rest_days_per_week > 7 {
            return Err(RosterError::TooManyRestDays {
                name: member.name.clone(),
                rest: member.rest_days_per_week,
            });
        }
    }

    if request.end < request.start {
        return Err(RosterError::InvertedPeriod {
            start: request.start,
            end: request.end,
        });
    }
    let days = (request.end - request.start).num_days() + 1;
    if days > MAX_PERIOD_DAYS {
        return Err(RosterError::PeriodTooLong {
            days,
            max: MAX_PERIOD_DAYS,
        });
    }

    if request.options.max_consecutive_days == Some(0) {
        return Err(RosterError::InvalidValue {
            key: "max_consecutive_days".to_string(),
            value: "0".to_string(),
        });
    }

    if request.shifts.is_empty() {
        return Err(RosterError::NoShifts);
    }
    let mut shift_names = HashSet::new();
    for shift in &request.shifts {
        if !shift_names.insert(fold_case(&shift.name)) {
            return Err(RosterError::DuplicateShift(shift.name.clone()));
        }
        if shift.roles.is_empty() {
            return Err(RosterError::ShiftWithoutRoles(shift.name.clone()));
        }
        if let Some(role) = shift.roles.iter().find(|r| r.count == 0) {
            return Err(RosterError::ZeroRoleCount {
                shift: shift.name.clone(),
                role: role.role.clone(),
            });
        }
        let headcount = shift.headcount();
        if headcount > MAX_SHIFT_HEADCOUNT {
            return Err(RosterError::ShiftTooLarge {
                shift: shift.name.clone(),
                count: headcount,
                max: MAX_SHIFT_HEADCOUNT,
            });
        }
    }

    Ok(())
}

/// Generate a roster, seeding the tie-breaking rng from the request or at random.
///
/// The seed actually used is stored on the roster so it can be reproduced.
pub fn generate(request: &RosterRequest) -> Result<Roster, RosterError> {
    let seed = request.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    let assignments = assign_shifts(request, &mut rng)?;

    let roster = Roster {
        request: request.clone(),
        seed,
        assignments,
    };

    info!(
        days = request.total_days(),
        slots = roster.assignments.len(),
        uncovered = roster.uncovered().len(),
        seed,
        "Roster generated"
    );

    Ok(roster)
}

/// Running totals for one staff member while the roster is being filled
#[derive(Debug, Clone, Default)]
struct Load {
    total: u32,
    weekend: u32,
    days_worked: u32,
    last_day: Option<NaiveDate>,
    last_shift: Option<usize>,
    streak: u32,
}

impl Load {
    fn worked_day_before(&self, date: NaiveDate) -> bool {
        self.last_day.and_then(|d| d.succ_opt()) == Some(date)
    }

    /// Consecutive working days ending the day before `date`
    fn streak_before(&self, date: NaiveDate) -> u32 {
        if self.worked_day_before(date) {
            self.streak
        } else {
            0
        }
    }

    fn record(&mut self, date: NaiveDate, shift_idx: usize) {
        self.total += 1;
        if is_weekend(date) {
            self.weekend += 1;
        }
        if self.last_day != Some(date) {
            self.days_worked += 1;
            self.streak = self.streak_before(date) + 1;
            self.last_day = Some(date);
        }
        self.last_shift = Some(shift_idx);
    }
}

/// The slot being filled
struct SlotContext<'a> {
    date: NaiveDate,
    shift_idx: usize,
    last_shift_idx: usize,
    role: &'a str,
    options: &'a RosterOptions,
}

fn is_candidate(member: &StaffMember, load: &Load, target: u32, slot: &SlotContext) -> bool {
    if !member.can_cover(slot.role) || !member.is_available_on(slot.date) {
        return false;
    }
    if load.days_worked >= target {
        return false;
    }
    if slot.options.avoid_consecutive
        && slot.last_shift_idx > 0
        && slot.shift_idx == 0
        && load.worked_day_before(slot.date)
        && load.last_shift == Some(slot.last_shift_idx)
    {
        return false;
    }
    if let Some(max) = slot.options.max_consecutive_days {
        if load.streak_before(slot.date) >= max {
            return false;
        }
    }
    true
}

/// Fill every slot of the request.
///
/// Each person works at most one shift per day.
pub fn assign_shifts<R: Rng + ?Sized>(
    request: &RosterRequest,
    rng: &mut R,
) -> Result<Vec<Assignment>, RosterError> {
    validate_request(request)?;

    let staff = &request.staff;
    let options = &request.options;
    let total_days = request.total_days();
    let targets: Vec<u32> = staff.iter().map(|m| m.work_target(total_days)).collect();
    let last_shift_idx = request.shifts.len() - 1;

    let mut loads = vec![Load::default(); staff.len()];
    let slots_per_day: usize = request.shifts.iter().map(|s| s.headcount() as usize).sum();
    let mut assignments = Vec::with_capacity(slots_per_day.saturating_mul(total_days as usize));

    for date in request.days() {
        let weekend = is_weekend(date);
        let mut busy: HashSet<usize> = HashSet::new();

        for (shift_idx, shift) in request.shifts.iter().enumerate() {
            for requirement in &shift.roles {
                let slot_ctx = SlotContext {
                    date,
                    shift_idx,
                    last_shift_idx,
                    role: &requirement.role,
                    options,
                };

                for slot in 0..requirement.count {
                    let mut candidates: Vec<usize> = (0..staff.len())
                        .filter(|i| !busy.contains(i))
                        .filter(|&i| is_candidate(&staff[i], &loads[i], targets[i], &slot_ctx))
                        .collect();

                    // Shuffle first so the stable sort leaves ties in random order
                    candidates.shuffle(rng);
                    candidates.sort_by_key(|&i| {
                        let load = &loads[i];
                        let weekend_load = if options.weekend_fairness && weekend {
                            load.weekend
                        } else {
                            0
                        };
                        (weekend_load, load.total)
                    });

                    let chosen = candidates.first().copied();
                    match chosen {
                        Some(i) => {
                            busy.insert(i);
                            loads[i].record(date, shift_idx);
                        }
                        None => {
                            debug!(
                                date = %date,
                                shift = %shift.name,
                                role = %requirement.role,
                                slot,
                                "No candidate for slot"
                            );
                        }
                    }

                    assignments.push(Assignment {
                        date,
                        shift: shift.name.clone(),
                        role: requirement.role.clone(),
                        slot,
                        staff: chosen.map(|i| staff[i].name.clone()),
                    });
                }
            }
        }
    }

    Ok(assignments)
}

/// Kind of rule a roster breaks
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConflictKind {
    UnknownStaff,
    DoubleBooked,
    OnLeave,
    Unavailable,
    RoleMismatch { role: String },
    ConsecutiveShift,
    TooManyConsecutiveDays { max: u32 },
    OverTarget { worked: u32, target: u32 },
}

/// A rule broken by one staff member, usually after a manual edit
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Conflict {
    pub staff: String,
    pub date: Option<NaiveDate>,
    pub shift: Option<String>,
    #[serde(flatten)]
    pub kind: ConflictKind,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.staff)?;
        if let Some(date) = self.date {
            write!(f, " on {}", date.format("%a %d/%m"))?;
        }
        if let Some(shift) = &self.shift {
            write!(f, " ({})", shift)?;
        }
        match &self.kind {
            ConflictKind::UnknownStaff => write!(f, ": not in the staff list"),
            ConflictKind::DoubleBooked => write!(f, ": already working that day"),
            ConflictKind::OnLeave => write!(f, ": on leave"),
            ConflictKind::Unavailable => write!(f, ": does not work on this weekday"),
            ConflictKind::RoleMismatch { role } => write!(f, ": cannot work as {}", role),
            ConflictKind::ConsecutiveShift => {
                write!(f, ": worked the last shift of the day before")
            }
            ConflictKind::TooManyConsecutiveDays { max } => {
                write!(f, ": more than {} days in a row", max)
            }
            ConflictKind::OverTarget { worked, target } => {
                write!(f, ": {} days worked, target is {}", worked, target)
            }
        }
    }
}

/// Re-check every hard rule on a roster, including manual edits
pub fn check_roster(roster: &Roster) -> Vec<Conflict> {
    let request = &roster.request;
    let options = &request.options;
    let first_shift = request.shifts.first().map(|s| s.name.as_str());
    let last_shift = request.shifts.last().map(|s| s.name.as_str());
    let check_consecutive = options.avoid_consecutive && request.shifts.len() > 1;

    let worked: HashSet<(&str, NaiveDate, &str)> = roster
        .assignments
        .iter()
        .filter_map(|a| {
            let member = request.find_staff(a.staff.as_deref()?)?;
            Some((member.name.as_str(), a.date, a.shift.as_str()))
        })
        .collect();

    let mut conflicts = Vec::new();
    let mut seen_on_day: HashSet<(&str, NaiveDate)> = HashSet::new();
    let mut days_by_staff: BTreeMap<&str, BTreeSet<NaiveDate>> = BTreeMap::new();

    for assignment in &roster.assignments {
        let Some(name) = assignment.staff.as_deref() else {
            continue;
        };
        let conflict = |kind| Conflict {
            staff: name.to_string(),
            date: Some(assignment.date),
            shift: Some(assignment.shift.clone()),
            kind,
        };

        let Some(member) = request.find_staff(name) else {
            conflicts.push(conflict(ConflictKind::UnknownStaff));
            continue;
        };
        let canonical = member.name.as_str();

        if !seen_on_day.insert((canonical, assignment.date)) {
            conflicts.push(conflict(ConflictKind::DoubleBooked));
        }
        if member.is_on_leave(assignment.date) {
            conflicts.push(conflict(ConflictKind::OnLeave));
        }
        if member.is_unavailable_on(assignment.date) {
            conflicts.push(conflict(ConflictKind::Unavailable));
        }
        if !member.can_cover(&assignment.role) {
            conflicts.push(conflict(ConflictKind::RoleMismatch {
                role: assignment.role.clone(),
            }));
        }
        if check_consecutive && first_shift == Some(assignment.shift.as_str()) {
            let after_last_shift = assignment
                .date
                .pred_opt()
                .zip(last_shift)
                .is_some_and(|(prev, last)| worked.contains(&(canonical, prev, last)));
            if after_last_shift {
                conflicts.push(conflict(ConflictKind::ConsecutiveShift));
            }
        }

        days_by_staff.entry(canonical).or_default().insert(assignment.date);
    }

    let total_days = request.total_days();
    for member in &request.staff {
        let Some(days) = days_by_staff.get(member.name.as_str()) else {
            continue;
        };

        if let Some(max) = options.max_consecutive_days {
            let mut streak = 0;
            let mut previous: Option<NaiveDate> = None;
            for &day in days {
                streak = match previous.and_then(|p| p.succ_opt()) {
                    Some(next) if next == day => streak + 1,
                    _ => 1,
                };
                if streak == max + 1 {
                    conflicts.push(Conflict {
                        staff: member.name.clone(),
                        date: Some(day),
                        shift: None,
                        kind: ConflictKind::TooManyConsecutiveDays { max },
                    });
                }
                previous = Some(day);
            }
        }

        let target = member.work_target(total_days);
        let worked_days = days.len() as u32;
        if worked_days > target {
            conflicts.push(Conflict {
                staff: member.name.clone(),
                date: None,
                shift: None,
                kind: ConflictKind::OverTarget {
                    worked: worked_days,
                    target,
                },
            });
        }
    }

    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ShiftDef, SlotKey, DEFAULT_ROLE};
    use chrono::Weekday;
    use rand::rngs::SmallRng;
    use std::collections::HashMap;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    fn names(list: &[&str]) -> Vec<StaffMember> {
        list.iter().map(|n| StaffMember::new(*n)).collect()
    }

    /// Monday 2025-01-13 to Sunday 2025-01-19
    fn week(staff: Vec<StaffMember>, shifts: Vec<ShiftDef>) -> RosterRequest {
        RosterRequest::new(date("2025-01-13"), date("2025-01-19"), staff, shifts)
    }

    fn count_by_staff(assignments: &[Assignment]) -> HashMap<String, u32> {
        let mut counts = HashMap::new();
        for a in assignments {
            if let Some(name) = &a.staff {
                *counts.entry(name.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    // ========== validate_request tests ==========

    #[test]
    fn test_validate_empty_staff() {
        let request = week(vec![], vec![ShiftDef::generic("Mattina", 1)]);
        assert_eq!(validate_request(&request), Err(RosterError::EmptyStaff));
    }

    #[test]
    fn test_validate_duplicate_staff() {
        let request = week(names(&["Mario", "mario"]), vec![ShiftDef::generic("Mattina", 1)]);
        assert_eq!(
            validate_request(&request),
            Err(RosterError::DuplicateStaff("mario".to_string()))
        );
    }

    #[test]
    fn test_validate_inverted_period() {
        let request = RosterRequest::new(
            date("2025-01-19"),
            date("2025-01-13"),
            names(&["Mario"]),
            vec![ShiftDef::generic("Mattina", 1)],
        );
        assert!(matches!(
            validate_request(&request),
            Err(RosterError::InvertedPeriod { .. })
        ));
    }

    #[test]
    fn test_validate_period_too_long() {
        let request = RosterRequest::new(
            date("2025-01-01"),
            date("2026-01-02"),
            names(&["Mario"]),
            vec![ShiftDef::generic("Mattina", 1)],
        );
        assert_eq!(
            validate_request(&request),
            Err(RosterError::PeriodTooLong { days: 367, max: 366 })
        );
    }

    #[test]
    fn test_validate_no_shifts() {
        let request = week(names(&["Mario"]), vec![]);
        assert_eq!(validate_request(&request), Err(RosterError::NoShifts));
    }

    #[test]
    fn test_validate_shift_problems() {
        let request = week(names(&["Mario"]), vec![ShiftDef::new("Mattina")]);
        assert_eq!(
            validate_request(&request),
            Err(RosterError::ShiftWithoutRoles("Mattina".to_string()))
        );

        let request = week(
            names(&["Mario"]),
            vec![ShiftDef::new("Mattina").with_role("Barista", 0)],
        );
        assert!(matches!(
            validate_request(&request),
            Err(RosterError::ZeroRoleCount { .. })
        ));

        let request = week(
            names(&["Mario"]),
            vec![ShiftDef::generic("Mattina", 1), ShiftDef::generic("MATTINA", 1)],
        );
        assert_eq!(
            validate_request(&request),
            Err(RosterError::DuplicateShift("MATTINA".to_string()))
        );
    }

    #[test]
    fn test_validate_too_many_rest_days() {
        let request = week(
            vec![StaffMember::new("Mario").with_rest_days(8)],
            vec![ShiftDef::generic("Mattina", 1)],
        );
        assert!(matches!(
            validate_request(&request),
            Err(RosterError::TooManyRestDays { rest: 8, .. })
        ));
    }

    #[test]
    fn test_validate_zero_consecutive_days() {
        let request = week(names(&["Mario"]), vec![ShiftDef::generic("Mattina", 1)]).with_options(
            RosterOptions {
                max_consecutive_days: Some(0),
                ..Default::default()
            },
        );
        assert!(matches!(
            validate_request(&request),
            Err(RosterError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validate_shift_too_large() {
        let request = week(
            names(&["Mario"]),
            vec![ShiftDef::new("Pranzo")
                .with_role("Cuoco", 3_000_000_000)
                .with_role("Barista", 3_000_000_000)],
        );
        assert_eq!(
            validate_request(&request),
            Err(RosterError::ShiftTooLarge {
                shift: "Pranzo".to_string(),
                count: u32::MAX,
                max: MAX_SHIFT_HEADCOUNT,
            })
        );
        assert!(generate(&request).is_err());

        let request = week(
            names(&["Mario"]),
            vec![ShiftDef::generic("Pranzo", MAX_SHIFT_HEADCOUNT)],
        );
        assert!(validate_request(&request).is_ok());
    }

    // ========== assign_shifts tests ==========

    #[test]
    fn test_all_slots_present_in_order() {
        let request = week(
            names(&["Mario", "Luigi", "Anna", "Giovanni"]),
            vec![
                ShiftDef::new("Mattina")
                    .with_role("Barista", 1)
                    .with_role("Cameriere", 1),
                ShiftDef::generic("Sera", 1),
            ],
        );
        let assignments = assign_shifts(&request, &mut rng()).unwrap();

        assert_eq!(assignments.len(), 7 * 3);
        assert_eq!(assignments[0].date, date("2025-01-13"));
        assert_eq!(assignments[0].shift, "Mattina");
        assert_eq!(assignments[0].role, "Barista");
        assert_eq!(assignments[1].role, "Cameriere");
        assert_eq!(assignments[2].shift, "Sera");
        assert_eq!(assignments[2].role, DEFAULT_ROLE);
        assert_eq!(assignments[3].date, date("2025-01-14"));
        assert!(assignments.iter().all(|a| !a.is_uncovered()));
    }

    #[test]
    fn test_one_shift_per_day() {
        let request = week(
            names(&["Mario", "Luigi", "Anna"]),
            vec![ShiftDef::generic("Mattina", 2), ShiftDef::generic("Sera", 2)],
        );
        let assignments = assign_shifts(&request, &mut rng()).unwrap();

        for day in request.days() {
            let on_day: Vec<_> = assignments
                .iter()
                .filter(|a| a.date == day)
                .filter_map(|a| a.staff.as_deref())
                .collect();
            let unique: HashSet<_> = on_day.iter().collect();
            assert_eq!(on_day.len(), unique.len());
            // 4 slots, 3 people
            assert_eq!(on_day.len(), 3);
        }
        assert_eq!(assignments.iter().filter(|a| a.is_uncovered()).count(), 7);
    }

    #[test]
    fn test_fairness_balances_counts() {
        let request = week(
            names(&["Mario", "Luigi", "Anna", "Giovanni"]),
            vec![ShiftDef::generic("Mattina", 1), ShiftDef::generic("Sera", 1)],
        );
        let assignments = assign_shifts(&request, &mut rng()).unwrap();
        let counts = count_by_staff(&assignments);

        // 14 slots over 4 people: everyone gets 3 or 4
        assert_eq!(counts.values().sum::<u32>(), 14);
        let min = *counts.values().min().unwrap();
        let max = *counts.values().max().unwrap();
        assert!(max - min <= 1, "unbalanced: {:?}", counts);
    }

    #[test]
    fn test_respects_leave() {
        let staff = vec![
            StaffMember::new("Mario").with_leave(date("2025-01-14"), date("2025-01-16")),
            StaffMember::new("Luigi"),
        ];
        let request = week(staff, vec![ShiftDef::generic("Mattina", 2)]);
        let assignments = assign_shifts(&request, &mut rng()).unwrap();

        for a in &assignments {
            if a.staff.as_deref() == Some("Mario") {
                assert!(a.date < date("2025-01-14") || a.date > date("2025-01-16"));
            }
        }
        // The second slot on leave days stays uncovered
        let uncovered: Vec<_> = assignments.iter().filter(|a| a.is_uncovered()).collect();
        assert_eq!(uncovered.len(), 3);
    }

    #[test]
    fn test_respects_unavailable_weekday() {
        let staff = vec![
            StaffMember::new("Mario").with_unavailable(&[Weekday::Mon, Weekday::Sun]),
            StaffMember::new("Luigi"),
        ];
        let request = week(staff, vec![ShiftDef::generic("Mattina", 1)]);
        let assignments = assign_shifts(&request, &mut rng()).unwrap();

        assert_eq!(assignments[0].staff.as_deref(), Some("Luigi"));
        assert_eq!(assignments[6].staff.as_deref(), Some("Luigi"));
    }

    #[test]
    fn test_respects_roles() {
        let staff = vec![
            StaffMember::new("Mario").with_roles(&["Cuoco"]),
            StaffMember::new("Anna").with_roles(&["Barista"]),
            StaffMember::new("Luigi").with_roles(&["barista", "cuoco"]),
        ];
        let request = week(
            staff,
            vec![ShiftDef::new("Pranzo")
                .with_role("Cuoco", 1)
                .with_role("Barista", 1)],
        );
        let assignments = assign_shifts(&request, &mut rng()).unwrap();

        for a in &assignments {
            match a.staff.as_deref() {
                Some("Mario") => assert_eq!(a.role, "Cuoco"),
                Some("Anna") => assert_eq!(a.role, "Barista"),
                _ => {}
            }
        }
        assert!(assignments.iter().all(|a| !a.is_uncovered()));
    }

    #[test]
    fn test_flags_uncovered_role() {
        let staff = vec![StaffMember::new("Anna").with_roles(&["Barista"])];
        let request = week(staff, vec![ShiftDef::new("Pranzo").with_role("Cuoco", 1)]);
        let assignments = assign_shifts(&request, &mut rng()).unwrap();

        assert_eq!(assignments.len(), 7);
        assert!(assignments.iter().all(|a| a.is_uncovered()));
    }

    #[test]
    fn test_respects_rest_quota() {
        let staff = vec![
            StaffMember::new("Mario").with_rest_days(2),
            StaffMember::new("Luigi").with_rest_days(2),
        ];
        let request = week(staff, vec![ShiftDef::generic("Mattina", 2)]);
        let assignments = assign_shifts(&request, &mut rng()).unwrap();
        let counts = count_by_staff(&assignments);

        assert_eq!(counts.get("Mario"), Some(&5));
        assert_eq!(counts.get("Luigi"), Some(&5));
        assert_eq!(assignments.iter().filter(|a| a.is_uncovered()).count(), 4);
    }

    #[test]
    fn test_avoid_consecutive_night_then_morning() {
        let request = week(
            names(&["Mario", "Luigi", "Anna"]),
            vec![ShiftDef::generic("Mattina", 1), ShiftDef::generic("Notte", 1)],
        )
        .with_options(RosterOptions {
            avoid_consecutive: true,
            ..Default::default()
        });
        let assignments = assign_shifts(&request, &mut rng()).unwrap();

        let days: Vec<_> = request.days().collect();
        for pair in days.windows(2) {
            let night = assignments
                .iter()
                .find(|a| a.date == pair[0] && a.shift == "Notte")
                .and_then(|a| a.staff.clone());
            let morning = assignments
                .iter()
                .find(|a| a.date == pair[1] && a.shift == "Mattina")
                .and_then(|a| a.staff.clone());
            assert!(night.is_none() || night != morning);
        }
    }

    #[test]
    fn test_avoid_consecutive_leaves_slot_uncovered_when_nobody_else() {
        let request = RosterRequest::new(
            date("2025-01-13"),
            date("2025-01-14"),
            names(&["Mario", "Luigi"]),
            vec![ShiftDef::generic("Mattina", 1), ShiftDef::generic("Notte", 1)],
        )
        .with_options(RosterOptions {
            avoid_consecutive: true,
            ..Default::default()
        });
        let assignments = assign_shifts(&request, &mut rng()).unwrap();

        // Day 2: whoever did the night cannot take the morning, the other one can
        let night = assignments[1].staff.clone().unwrap();
        let morning = assignments[2].staff.clone().unwrap();
        assert_ne!(night, morning);
    }

    #[test]
    fn test_single_shift_ignores_avoid_consecutive() {
        let request = week(
            names(&["Mario"]),
            vec![ShiftDef::generic("Giornata", 1)],
        )
        .with_options(RosterOptions {
            avoid_consecutive: true,
            ..Default::default()
        });
        let assignments = assign_shifts(&request, &mut rng()).unwrap();

        assert!(assignments.iter().all(|a| a.staff.as_deref() == Some("Mario")));
    }

    #[test]
    fn test_max_consecutive_days() {
        let request = week(names(&["Mario"]), vec![ShiftDef::generic("Giornata", 1)]).with_options(
            RosterOptions {
                max_consecutive_days: Some(3),
                ..Default::default()
            },
        );
        let assignments = assign_shifts(&request, &mut rng()).unwrap();
        let pattern: Vec<bool> = assignments.iter().map(|a| a.is_uncovered()).collect();

        assert_eq!(pattern, vec![false, false, false, true, false, false, false]);
    }

    #[test]
    fn test_weekend_fairness_spreads_weekend_shifts() {
        // Two weeks, Monday to Sunday, one slot a day, four people
        let request = RosterRequest::new(
            date("2025-01-13"),
            date("2025-01-26"),
            names(&["Mario", "Luigi", "Anna", "Giovanni"]),
            vec![ShiftDef::generic("Sera", 1)],
        )
        .with_options(RosterOptions {
            weekend_fairness: true,
            ..Default::default()
        });

        for seed in 0..20 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let assignments = assign_shifts(&request, &mut rng).unwrap();
            let weekend_workers: HashSet<_> = assignments
                .iter()
                .filter(|a| is_weekend(a.date))
                .filter_map(|a| a.staff.clone())
                .collect();
            // Four weekend slots go to four different people
            assert_eq!(weekend_workers.len(), 4, "seed {}", seed);
        }
    }

    #[test]
    fn test_same_seed_same_roster() {
        let request = week(
            names(&["Mario", "Luigi", "Anna", "Giovanni"]),
            vec![ShiftDef::generic("Mattina", 1), ShiftDef::generic("Sera", 1)],
        )
        .with_seed(1234);

        let first = generate(&request).unwrap();
        let second = generate(&request).unwrap();

        assert_eq!(first.seed, 1234);
        assert_eq!(first.assignments, second.assignments);
    }

    #[test]
    fn test_generate_rejects_invalid_request() {
        let request = week(vec![], vec![ShiftDef::generic("Mattina", 1)]);
        assert_eq!(generate(&request).unwrap_err(), RosterError::EmptyStaff);
    }

    // ========== check_roster tests ==========

    #[test]
    fn test_generated_roster_has_no_conflicts() {
        let staff = vec![
            StaffMember::new("Mario").with_rest_days(1),
            StaffMember::new("Luigi").with_unavailable(&[Weekday::Tue]),
            StaffMember::new("Anna").with_roles(&["Barista"]),
            StaffMember::new("Giovanni").with_leave(date("2025-01-15"), date("2025-01-15")),
        ];
        let request = week(
            staff,
            vec![
                ShiftDef::new("Mattina").with_role("Barista", 1),
                ShiftDef::generic("Notte", 1),
            ],
        )
        .with_options(RosterOptions {
            weekend_fairness: true,
            avoid_consecutive: true,
            max_consecutive_days: Some(4),
        })
        .with_seed(99);

        let roster = generate(&request).unwrap();
        assert!(check_roster(&roster).is_empty());
    }

    fn two_day_roster() -> Roster {
        let staff = vec![
            StaffMember::new("Mario")
                .with_roles(&["Barista"])
                .with_unavailable(&[Weekday::Tue]),
            StaffMember::new("Luigi").with_leave(date("2025-01-13"), date("2025-01-13")),
            StaffMember::new("Anna"),
        ];
        let request = RosterRequest::new(
            date("2025-01-13"),
            date("2025-01-14"),
            staff,
            vec![
                ShiftDef::new("Mattina").with_role("Barista", 1),
                ShiftDef::new("Notte").with_role("Cuoco", 1),
            ],
        )
        .with_options(RosterOptions {
            avoid_consecutive: true,
            ..Default::default()
        });
        let slot = |d: &str, shift: &str, role: &str| Assignment {
            date: date(d),
            shift: shift.to_string(),
            role: role.to_string(),
            slot: 0,
            staff: None,
        };
        Roster {
            request,
            seed: 0,
            assignments: vec![
                slot("2025-01-13", "Mattina", "Barista"),
                slot("2025-01-13", "Notte", "Cuoco"),
                slot("2025-01-14", "Mattina", "Barista"),
                slot("2025-01-14", "Notte", "Cuoco"),
            ],
        }
    }

    fn key(roster: &Roster, idx: usize) -> SlotKey {
        roster.assignments[idx].key()
    }

    #[test]
    fn test_check_double_booked() {
        let mut roster = two_day_roster();
        roster.set_assignment(&key(&roster, 2), Some("Anna")).unwrap();
        roster.set_assignment(&key(&roster, 3), Some("Anna")).unwrap();

        let conflicts = check_roster(&roster);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::DoubleBooked);
        assert_eq!(conflicts[0].shift.as_deref(), Some("Notte"));
    }

    #[test]
    fn test_check_leave_unavailable_and_role() {
        let mut roster = two_day_roster();
        roster.set_assignment(&key(&roster, 0), Some("Luigi")).unwrap();
        roster.set_assignment(&key(&roster, 2), Some("Mario")).unwrap();
        roster.set_assignment(&key(&roster, 3), Some("Luigi")).unwrap();
        roster.set_assignment(&key(&roster, 1), Some("Mario")).unwrap();

        let kinds: Vec<_> = check_roster(&roster).into_iter().map(|c| c.kind).collect();
        assert!(kinds.contains(&ConflictKind::OnLeave));
        assert!(kinds.contains(&ConflictKind::Unavailable));
        assert!(kinds.contains(&ConflictKind::RoleMismatch {
            role: "Cuoco".to_string()
        }));
    }

    #[test]
    fn test_check_consecutive_shift() {
        let mut roster = two_day_roster();
        roster.set_assignment(&key(&roster, 1), Some("Anna")).unwrap();
        roster.set_assignment(&key(&roster, 2), Some("Anna")).unwrap();

        let conflicts = check_roster(&roster);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::ConsecutiveShift);
        assert_eq!(conflicts[0].date, Some(date("2025-01-14")));
    }

    #[test]
    fn test_check_over_target_and_streak() {
        let mut roster = two_day_roster();
        roster.request.staff[2].rest_days_per_week = 7;
        roster.request.options.max_consecutive_days = Some(1);
        roster.set_assignment(&key(&roster, 0), Some("Anna")).unwrap();
        roster.set_assignment(&key(&roster, 3), Some("Anna")).unwrap();

        let kinds: Vec<_> = check_roster(&roster).into_iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ConflictKind::TooManyConsecutiveDays { max: 1 },
                ConflictKind::OverTarget {
                    worked: 2,
                    target: 0
                },
            ]
        );
    }

    #[test]
    fn test_check_unknown_staff() {
        let mut roster = two_day_roster();
        roster.assignments[0].staff = Some("Zorro".to_string());

        let conflicts = check_roster(&roster);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::UnknownStaff);
    }

    #[test]
    fn test_check_names_differing_in_case() {
        let mut roster = two_day_roster();
        roster.request.staff[2].rest_days_per_week = 7;
        roster.assignments[0].staff = Some("anna".to_string());
        roster.assignments[1].staff = Some("ANNA".to_string());
        roster.assignments[2].staff = Some("anna".to_string());
        roster.assignments[3].staff = Some("Anna".to_string());

        let kinds: Vec<_> = check_roster(&roster).into_iter().map(|c| c.kind).collect();
        assert!(kinds.contains(&ConflictKind::DoubleBooked));
        assert!(kinds.contains(&ConflictKind::ConsecutiveShift));
        assert!(kinds.contains(&ConflictKind::OverTarget {
            worked: 2,
            target: 0
        }));
        assert!(!kinds.contains(&ConflictKind::UnknownStaff));
    }

    #[test]
    fn test_conflict_display() {
        let conflict = Conflict {
            staff: "Anna".to_string(),
            date: Some(date("2025-01-14")),
            shift: Some("Mattina".to_string()),
            kind: ConflictKind::OnLeave,
        };
        assert_eq!(conflict.to_string(), "Anna on Tue 14/01 (Mattina): on leave");
    }
}
