use crate::types::{PeriodIndex, Tier};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Trainee '{name}' referenced by {context} is not on the roster")]
    UnknownTrainee { name: String, context: &'static str },

    #[error("Trainee '{name}' appears more than once on the roster")]
    DuplicateTrainee { name: String },

    #[error("Rotation row for '{name}' has {actual} entries, expected {expected}")]
    GridLength { name: String, expected: usize, actual: usize },

    #[error("Unknown rotation label '{label}' for '{name}' in period {period}")]
    UnknownRotationLabel { name: String, period: PeriodIndex, label: String },

    #[error("No duty targets configured for tier {tier}")]
    MissingTierTargets { tier: Tier },

    #[error("Invalid clinic weekday {day} for '{name}' (expected 0-5)")]
    InvalidClinicDay { name: String, day: u8 },

    #[error("Period calendar is empty")]
    EmptyCalendar,

    #[error("Period {period} is malformed: {reason}")]
    InvalidPeriod { period: PeriodIndex, reason: String },

    #[error("Time-off for '{name}' spans periods {start}..={end}, outside 0..{periods}")]
    InvalidTimeOff { name: String, start: PeriodIndex, end: PeriodIndex, periods: usize },

    #[error("Override for '{name}' references period {period}, outside 0..{periods}")]
    InvalidOverride { name: String, period: PeriodIndex, periods: usize },

    #[error("Duty slot '{key}' does not exist in the schedule")]
    UnknownSlot { key: String },

    #[error("Clinic coverage search requires an explicit seed")]
    MissingSeed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
