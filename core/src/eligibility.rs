//! Duty eligibility predicates.
//!
//! Pure functions of the rotation grid, approved time off, the calendar and
//! the tier policy. Each predicate is split in two layers:
//!   - availability: what the trainee's rotation and leave physically allow
//!     (never bypassed, not even by relaxation)
//!   - tier gates: seniority prerequisites (bypassed by relaxed assignment)
//!
//! The period-level predicates answer "may this trainee take this duty in
//! this period at all". The `*_on` variants narrow that to one weekend and
//! add the rest rules around a night-coverage block: no weekend-1 duty right
//! after nights, no weekend-2 duty right before them.

use crate::{
    calendar::PeriodCalendar,
    config::TierPolicy,
    roster::{RotationGrid, TimeOffIndex, Trainee},
    rotation::Rotation,
    types::{Half, PeriodIndex},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloatEligibility {
    Ineligible,
    Eligible,
    /// On night coverage: the weekend-2 float lines up with their nights.
    Preferred,
}

impl FloatEligibility {
    pub fn is_eligible(self) -> bool {
        self != FloatEligibility::Ineligible
    }
}

/// Read-only view every predicate evaluates against.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityContext<'a> {
    pub grid:     &'a RotationGrid,
    pub calendar: &'a PeriodCalendar,
    pub policy:   &'a TierPolicy,
    pub time_off: &'a TimeOffIndex,
}

impl<'a> EligibilityContext<'a> {
    pub fn new(
        grid:     &'a RotationGrid,
        calendar: &'a PeriodCalendar,
        policy:   &'a TierPolicy,
        time_off: &'a TimeOffIndex,
    ) -> Self {
        Self { grid, calendar, policy, time_off }
    }

    /// Call availability: not on approved leave, not on nights or floors
    /// now, and not starting nights next period.
    pub fn call_available(&self, trainee: &Trainee, period: PeriodIndex) -> bool {
        if self.time_off.is_off(&trainee.name, period) {
            return false;
        }
        let current = self.grid.rotation(&trainee.name, period);
        if matches!(current, Rotation::NightCoverage | Rotation::Floor) {
            return false;
        }
        !self.grid.rotation(&trainee.name, period + 1).is_night_coverage()
    }

    /// Call tier gates: senior tier waits for the milestone, junior tier
    /// needs a completed ICU period.
    pub fn call_tier_gate(&self, trainee: &Trainee, period: PeriodIndex) -> bool {
        if trainee.tier == self.policy.senior_tier {
            let before_milestone = self
                .calendar
                .get(period)
                .map(|p| p.start < self.policy.senior_call_milestone)
                .unwrap_or(true);
            if before_milestone {
                return false;
            }
        }
        if trainee.tier == self.policy.junior_tier
            && !self.grid.completed_before(&trainee.name, period, Rotation::Icu)
        {
            return false;
        }
        true
    }

    pub fn is_eligible_for_call(&self, trainee: &Trainee, period: PeriodIndex) -> bool {
        self.call_available(trainee, period) && self.call_tier_gate(trainee, period)
    }

    /// Rest around a night-coverage block. A trainee who is on nights this
    /// period is already on the night schedule, so nothing applies.
    pub fn rested_for(&self, trainee: &Trainee, period: PeriodIndex, weekend: Half) -> bool {
        if self.grid.rotation(&trainee.name, period).is_night_coverage() {
            return true;
        }
        match weekend {
            Half::First => period == 0 || !self.grid.rotation(&trainee.name, period - 1).is_night_coverage(),
            Half::Second => !self.grid.rotation(&trainee.name, period + 1).is_night_coverage(),
        }
    }

    pub fn call_available_on(&self, trainee: &Trainee, period: PeriodIndex, weekend: Half) -> bool {
        self.call_available(trainee, period) && self.rested_for(trainee, period, weekend)
    }

    /// Float availability. Approved leave rules the trainee out first; night
    /// coverage then short-circuits to `Preferred` before any other rule.
    pub fn float_available(&self, trainee: &Trainee, period: PeriodIndex) -> FloatEligibility {
        if self.time_off.is_off(&trainee.name, period) {
            return FloatEligibility::Ineligible;
        }
        match self.grid.rotation(&trainee.name, period) {
            Rotation::NightCoverage => FloatEligibility::Preferred,
            Rotation::Floor | Rotation::Icu => FloatEligibility::Ineligible,
            _ => FloatEligibility::Eligible,
        }
    }

    /// Junior tier needs a completed floor period.
    pub fn float_tier_gate(&self, trainee: &Trainee, period: PeriodIndex) -> bool {
        trainee.tier != self.policy.junior_tier
            || self.grid.completed_before(&trainee.name, period, Rotation::Floor)
    }

    pub fn is_eligible_for_float(&self, trainee: &Trainee, period: PeriodIndex) -> FloatEligibility {
        match self.float_available(trainee, period) {
            FloatEligibility::Preferred => FloatEligibility::Preferred,
            FloatEligibility::Ineligible => FloatEligibility::Ineligible,
            FloatEligibility::Eligible if self.float_tier_gate(trainee, period) => FloatEligibility::Eligible,
            FloatEligibility::Eligible => FloatEligibility::Ineligible,
        }
    }

    pub fn float_available_on(&self, trainee: &Trainee, period: PeriodIndex, weekend: Half) -> FloatEligibility {
        if self.rested_for(trainee, period, weekend) {
            self.float_available(trainee, period)
        } else {
            FloatEligibility::Ineligible
        }
    }

    pub fn is_eligible_for_float_on(&self, trainee: &Trainee, period: PeriodIndex, weekend: Half) -> FloatEligibility {
        if self.rested_for(trainee, period, weekend) {
            self.is_eligible_for_float(trainee, period)
        } else {
            FloatEligibility::Ineligible
        }
    }
}
