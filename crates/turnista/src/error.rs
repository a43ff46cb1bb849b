use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while reading roster input or building and editing a roster
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("staff list is empty")]
    EmptyStaff,

    #[error("duplicate staff member: {0}")]
    DuplicateStaff(String),

    #[error("no shifts selected")]
    NoShifts,

    #[error("duplicate shift: {0}")]
    DuplicateShift(String),

    #[error("shift {0} has no roles")]
    ShiftWithoutRoles(String),

    #[error("role {role} in shift {shift} must need at least one person")]
    ZeroRoleCount { shift: String, role: String },

    #[error("shift {shift} needs {count} people, at most {max} are allowed")]
    ShiftTooLarge { shift: String, count: u32, max: u32 },

    #[error("end date {end} is before start date {start}")]
    InvertedPeriod { start: NaiveDate, end: NaiveDate },

    #[error("period of {days} days is longer than the {max} days allowed")]
    PeriodTooLong { days: i64, max: i64 },

    #[error("{name} asks for {rest} rest days per week, at most 7 are possible")]
    TooManyRestDays { name: String, rest: u8 },

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("unknown weekday: {0}")]
    InvalidWeekday(String),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("unknown staff member: {0}")]
    UnknownStaff(String),

    #[error("no slot {slot} for {role} in shift {shift} on {date}")]
    UnknownSlot {
        date: NaiveDate,
        shift: String,
        role: String,
        slot: u32,
    },
}
