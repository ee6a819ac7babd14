//! Program snapshot: the application's schedule data as handed to the engine.
//!
//! A snapshot carries raw rotation labels exactly as the grid editor stores
//! them. `validate()` is the engine's input boundary: every structural error
//! is caught here and the algorithmic components downstream assume clean input.

use crate::{
    calendar::{Period, PeriodCalendar},
    config::{EngineConfig, Targets},
    error::{EngineError, EngineResult},
    roster::{DayOverride, Roster, RotationGrid, TimeOff, TimeOffIndex, Trainee},
    types::TraineeName,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramSnapshot {
    pub trainees:  Vec<Trainee>,
    pub periods:   Vec<Period>,
    /// Trainee → one label per period; "" means unassigned.
    pub rotations: BTreeMap<TraineeName, Vec<String>>,
    #[serde(default)]
    pub time_off:  Vec<TimeOff>,
    #[serde(default)]
    pub overrides: Vec<DayOverride>,
}

impl ProgramSnapshot {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Ok(Self::from_json(&content)?)
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Classify labels and check every cross-reference.
    pub fn validate(&self, config: &EngineConfig) -> EngineResult<ProgramInput> {
        let calendar = PeriodCalendar::new(self.periods.clone())?;
        let roster = Roster::new(self.trainees.clone())?;

        let mut grid = RotationGrid::new(calendar.len());
        for (name, labels) in &self.rotations {
            roster.require(name, "rotation grid")?;
            let row = labels
                .iter()
                .enumerate()
                .map(|(period, label)| {
                    config.rotation_labels.classify(label).ok_or_else(|| {
                        EngineError::UnknownRotationLabel {
                            name: name.clone(),
                            period,
                            label: label.clone(),
                        }
                    })
                })
                .collect::<EngineResult<Vec<_>>>()?;
            grid.insert_row(name.clone(), row)?;
        }

        ProgramInput::new(
            roster,
            grid,
            calendar,
            self.time_off.clone(),
            self.overrides.clone(),
            config,
        )
    }
}

/// Validated, typed engine input. Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct ProgramInput {
    pub roster:    Roster,
    pub grid:      RotationGrid,
    pub calendar:  PeriodCalendar,
    pub time_off:  Vec<TimeOff>,
    pub overrides: Vec<DayOverride>,
    pub targets:   Targets,
    approved:      TimeOffIndex,
}

impl ProgramInput {
    pub fn new(
        roster:    Roster,
        grid:      RotationGrid,
        calendar:  PeriodCalendar,
        time_off:  Vec<TimeOff>,
        overrides: Vec<DayOverride>,
        config:    &EngineConfig,
    ) -> EngineResult<Self> {
        let periods = calendar.len();

        if grid.periods() != periods {
            return Err(EngineError::InvalidPeriod {
                period: grid.periods(),
                reason: format!("grid covers {} periods, calendar has {periods}", grid.periods()),
            });
        }
        for name in grid.trainees() {
            roster.require(name, "rotation grid")?;
        }
        for t in roster.iter() {
            if grid.row(&t.name).is_none() {
                return Err(EngineError::GridLength {
                    name: t.name.clone(),
                    expected: periods,
                    actual: 0,
                });
            }
        }
        for r in &time_off {
            roster.require(&r.trainee, "time-off")?;
            if r.start_period > r.end_period || r.end_period >= periods {
                return Err(EngineError::InvalidTimeOff {
                    name: r.trainee.clone(),
                    start: r.start_period,
                    end: r.end_period,
                    periods,
                });
            }
        }
        for o in &overrides {
            roster.require(&o.trainee, "day override")?;
            if o.period >= periods {
                return Err(EngineError::InvalidOverride {
                    name: o.trainee.clone(),
                    period: o.period,
                    periods,
                });
            }
        }

        let targets = config.resolve_targets(&roster)?;

        let approved = TimeOffIndex::new(&time_off);

        Ok(Self { roster, grid, calendar, time_off, overrides, targets, approved })
    }

    /// Approved time-off, indexed. Pending requests are not in here.
    pub fn time_off_index(&self) -> &TimeOffIndex {
        &self.approved
    }
}
