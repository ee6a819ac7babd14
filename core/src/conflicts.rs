//! Conflict aggregator. A read-only audit over the finished schedule.
//!
//! Composes three checks into one report:
//!   - double bookings in the manual day-level overrides
//!   - coverage gaps in must-staff rotations
//!   - duty-hour violations from the compliance checker

use crate::{
    assigner::DutySchedule,
    compliance::{self, Violation},
    config::ComplianceConfig,
    roster::DayOverride,
    rotation::Rotation,
    snapshot::ProgramInput,
    types::{PeriodIndex, TraineeName},
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoubleBooking {
    pub trainee: TraineeName,
    pub date:    NaiveDate,
    /// Every distinct label recorded for that date, sorted.
    pub labels:  Vec<String>,
    /// Periods whose overrides contributed.
    pub periods: Vec<PeriodIndex>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageGap {
    pub period:   PeriodIndex,
    pub rotation: Rotation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    pub double_bookings:  Vec<DoubleBooking>,
    pub coverage_gaps:    Vec<CoverageGap>,
    pub acgme_violations: Vec<Violation>,
    pub total:            usize,
}

/// Same trainee, same date, more than one distinct override label.
pub fn double_bookings(overrides: &[DayOverride]) -> Vec<DoubleBooking> {
    let mut by_day: BTreeMap<(&str, NaiveDate), Vec<&DayOverride>> = BTreeMap::new();
    for o in overrides {
        by_day.entry((o.trainee.as_str(), o.date)).or_default().push(o);
    }

    by_day
        .into_iter()
        .filter_map(|((trainee, date), recs)| {
            let mut labels: Vec<String> = recs.iter().map(|o| o.label.trim().to_string()).collect();
            labels.sort();
            labels.dedup();
            if labels.len() < 2 {
                return None;
            }
            let mut periods: Vec<PeriodIndex> = recs.iter().map(|o| o.period).collect();
            periods.sort_unstable();
            periods.dedup();
            Some(DoubleBooking { trainee: trainee.to_string(), date, labels, periods })
        })
        .collect()
}

/// Every (period, rotation) where a must-staff rotation has nobody on it.
pub fn coverage_gaps(input: &ProgramInput, must_staff: &[Rotation]) -> Vec<CoverageGap> {
    input
        .calendar
        .iter()
        .flat_map(|(period, _)| {
            must_staff
                .iter()
                .filter(move |&&rotation| input.grid.staffing(period, rotation) == 0)
                .map(move |&rotation| CoverageGap { period, rotation })
        })
        .collect()
}

pub fn detect(
    input:      &ProgramInput,
    call:       &DutySchedule,
    float:      &DutySchedule,
    must_staff: &[Rotation],
    compliance: &ComplianceConfig,
) -> ConflictReport {
    let double_bookings = double_bookings(&input.overrides);
    let coverage_gaps = coverage_gaps(input, must_staff);
    let acgme_violations = compliance::check(input, call, float, compliance);
    let total = double_bookings.len() + coverage_gaps.len() + acgme_violations.len();

    if total > 0 {
        log::info!(
            "conflicts: {} double booking(s), {} coverage gap(s), {} duty-hour violation(s)",
            double_bookings.len(),
            coverage_gaps.len(),
            acgme_violations.len()
        );
    }

    ConflictReport { double_bookings, coverage_gaps, acgme_violations, total }
}
