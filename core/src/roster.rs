//! Roster, rotation grid and the other read-only schedule inputs.

use crate::{
    error::{EngineError, EngineResult},
    rotation::Rotation,
    types::{ClinicDay, PeriodIndex, Tier, TraineeName},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trainee {
    pub name:       TraineeName,
    pub tier:       Tier,
    #[serde(default)]
    pub clinic_day: ClinicDay,
}

impl Trainee {
    pub fn new(name: impl Into<String>, tier: Tier, clinic_day: ClinicDay) -> Self {
        Self { name: name.into(), tier, clinic_day }
    }
}

/// Trainees in roster order. Roster order is the tie-breaker for every
/// greedy choice, so it must be stable across runs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Roster {
    trainees: Vec<Trainee>,
    #[serde(skip)]
    index:    HashMap<TraineeName, usize>,
}

impl Roster {
    pub fn new(trainees: Vec<Trainee>) -> EngineResult<Self> {
        let mut index = HashMap::with_capacity(trainees.len());
        for (i, t) in trainees.iter().enumerate() {
            if t.clinic_day > 5 {
                return Err(EngineError::InvalidClinicDay { name: t.name.clone(), day: t.clinic_day });
            }
            if index.insert(t.name.clone(), i).is_some() {
                return Err(EngineError::DuplicateTrainee { name: t.name.clone() });
            }
        }
        Ok(Self { trainees, index })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trainee> {
        self.trainees.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Trainee> {
        self.index.get(name).map(|&i| &self.trainees[i])
    }

    pub fn len(&self) -> usize { self.trainees.len() }

    pub fn is_empty(&self) -> bool { self.trainees.is_empty() }

    /// Fail with `UnknownTrainee` unless `name` is on the roster.
    pub fn require(&self, name: &str, context: &'static str) -> EngineResult<&Trainee> {
        self.get(name).ok_or_else(|| EngineError::UnknownTrainee {
            name: name.to_string(),
            context,
        })
    }
}

/// Trainee × Period → Rotation. Every row has exactly one entry per period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationGrid {
    rows:    HashMap<TraineeName, Vec<Rotation>>,
    periods: usize,
}

impl RotationGrid {
    pub fn new(periods: usize) -> Self {
        Self { rows: HashMap::new(), periods }
    }

    pub fn insert_row(&mut self, name: impl Into<String>, row: Vec<Rotation>) -> EngineResult<()> {
        let name = name.into();
        if row.len() != self.periods {
            return Err(EngineError::GridLength {
                name,
                expected: self.periods,
                actual: row.len(),
            });
        }
        self.rows.insert(name, row);
        Ok(())
    }

    pub fn periods(&self) -> usize { self.periods }

    /// Rotation for a trainee in a period. Unknown trainees and periods
    /// outside the grid read as `Unassigned`.
    pub fn rotation(&self, name: &str, period: PeriodIndex) -> Rotation {
        self.rows
            .get(name)
            .and_then(|row| row.get(period))
            .copied()
            .unwrap_or(Rotation::Unassigned)
    }

    pub fn row(&self, name: &str) -> Option<&[Rotation]> {
        self.rows.get(name).map(Vec::as_slice)
    }

    pub fn trainees(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// True when the trainee held `rotation` in any period strictly before `period`.
    pub fn completed_before(&self, name: &str, period: PeriodIndex, rotation: Rotation) -> bool {
        self.rows
            .get(name)
            .map(|row| row.iter().take(period).any(|r| *r == rotation))
            .unwrap_or(false)
    }

    /// Count of trainees holding `rotation` in `period`.
    pub fn staffing(&self, period: PeriodIndex, rotation: Rotation) -> usize {
        self.rows
            .values()
            .filter(|row| row.get(period) == Some(&rotation))
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    Pending,
    Approved,
    Denied,
}

/// A time-off request spanning whole periods, inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOff {
    pub trainee:      TraineeName,
    pub start_period: PeriodIndex,
    pub end_period:   PeriodIndex,
    pub state:        ApprovalState,
}

impl TimeOff {
    pub fn approved(trainee: impl Into<String>, start_period: PeriodIndex, end_period: PeriodIndex) -> Self {
        Self {
            trainee: trainee.into(),
            start_period,
            end_period,
            state: ApprovalState::Approved,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.state == ApprovalState::Approved
    }
}

/// Approved time-off only, indexed for lookup by trainee.
#[derive(Debug, Clone, Default)]
pub struct TimeOffIndex {
    by_trainee: HashMap<TraineeName, Vec<(PeriodIndex, PeriodIndex)>>,
}

impl TimeOffIndex {
    pub fn new(ranges: &[TimeOff]) -> Self {
        let mut by_trainee: HashMap<TraineeName, Vec<(PeriodIndex, PeriodIndex)>> = HashMap::new();
        for r in ranges.iter().filter(|r| r.is_approved()) {
            by_trainee
                .entry(r.trainee.clone())
                .or_default()
                .push((r.start_period, r.end_period));
        }
        Self { by_trainee }
    }

    pub fn is_off(&self, name: &str, period: PeriodIndex) -> bool {
        self.by_trainee
            .get(name)
            .map(|ranges| ranges.iter().any(|&(s, e)| s <= period && period <= e))
            .unwrap_or(false)
    }
}

/// A manual day-level rotation override recorded by the grid editor.
/// The label is kept verbatim: the double-booking check compares what was
/// recorded, not what it classifies as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayOverride {
    pub trainee: TraineeName,
    pub period:  PeriodIndex,
    pub date:    NaiveDate,
    pub label:   String,
}
