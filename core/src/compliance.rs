//! Duty-hour compliance checker.
//!
//! Scans the combined rotation + call + float schedule and reports every
//! breach as a discrete record keyed by (trainee, period). A pair may carry
//! several violations. The checker only reads its inputs, so it runs equally
//! on the stored schedule and on hypothetical ones (see `evaluate_swap`).

use crate::{
    assigner::{DutySchedule, SlotKey},
    config::ComplianceConfig,
    error::{EngineError, EngineResult},
    roster::TimeOffIndex,
    snapshot::ProgramInput,
    types::{DutyType, Half, PeriodIndex, TraineeName},
};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    /// Call taken while on a night-coverage rotation.
    CallDuringNights,
    /// Weekend-2 duty right before starting nights.
    RestBeforeNights,
    /// Weekend-1 duty right after coming off nights.
    RestAfterNights,
    /// Any duty inside an approved time-off range.
    TimeOffConflict,
    /// Call and float on the same weekend.
    DoubleDutyWeekend,
    /// Call and float on consecutive weekends.
    BackToBackMixedDuty,
    /// Too many duty weekends inside the rolling window.
    DutyFrequency,
}

impl RuleId {
    pub fn code(self) -> &'static str {
        match self {
            RuleId::CallDuringNights    => "call_during_nights",
            RuleId::RestBeforeNights    => "rest_before_nights",
            RuleId::RestAfterNights     => "rest_after_nights",
            RuleId::TimeOffConflict     => "time_off_conflict",
            RuleId::DoubleDutyWeekend   => "double_duty_weekend",
            RuleId::BackToBackMixedDuty => "back_to_back_mixed_duty",
            RuleId::DutyFrequency       => "duty_frequency",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub trainee: TraineeName,
    pub period:  PeriodIndex,
    pub rule:    RuleId,
    pub detail:  String,
}

/// Duties one trainee holds on one weekend.
#[derive(Debug, Clone, Copy)]
struct WeekendDuty {
    period:  PeriodIndex,
    weekend: Half,
    call:    bool,
    float:   bool,
}

impl WeekendDuty {
    fn any(&self) -> bool {
        self.call || self.float
    }

    fn describe(&self) -> &'static str {
        match (self.call, self.float) {
            (true, true)  => "call and float",
            (true, false) => "call",
            (false, true) => "float",
            _             => "no duty",
        }
    }
}

/// Evaluate every rule for every trainee and period.
pub fn check(
    input:  &ProgramInput,
    call:   &DutySchedule,
    float:  &DutySchedule,
    config: &ComplianceConfig,
) -> Vec<Violation> {
    let time_off = input.time_off_index();
    let mut violations = Vec::new();
    for trainee in input.roster.iter() {
        violations.extend(check_trainee(input, &trainee.name, call, float, time_off, config));
    }
    log::debug!("compliance: {} violation(s)", violations.len());
    violations
}

fn check_trainee(
    input:    &ProgramInput,
    name:     &str,
    call:     &DutySchedule,
    float:    &DutySchedule,
    time_off: &TimeOffIndex,
    config:   &ComplianceConfig,
) -> Vec<Violation> {
    let weekends: Vec<WeekendDuty> = (0..input.calendar.len())
        .flat_map(|period| {
            Half::BOTH.into_iter().map(move |weekend| WeekendDuty {
                period,
                weekend,
                call:  call.holder(period, weekend) == Some(name),
                float: float.holder(period, weekend) == Some(name),
            })
        })
        .collect();

    let mut out = Vec::new();
    let mut push = |period: PeriodIndex, rule: RuleId, detail: String| {
        out.push(Violation { trainee: name.to_string(), period, rule, detail });
    };

    for pair in weekends.chunks(2) {
        let period = pair[0].period;
        let rotation = input.grid.rotation(name, period);
        let on_nights = rotation.is_night_coverage();

        let call_weekends: Vec<String> = pair.iter().filter(|w| w.call).map(|w| w.weekend.to_string()).collect();
        if on_nights && !call_weekends.is_empty() {
            push(period, RuleId::CallDuringNights, format!(
                "call on weekend {} while on night coverage", call_weekends.join(" and ")
            ));
        }

        if time_off.is_off(name, period) && pair.iter().any(WeekendDuty::any) {
            let held: Vec<String> = pair
                .iter()
                .filter(|w| w.any())
                .map(|w| format!("{} on weekend {}", w.describe(), w.weekend))
                .collect();
            push(period, RuleId::TimeOffConflict, format!(
                "{} during approved time off", held.join(", ")
            ));
        }

        for w in pair.iter().filter(|w| w.call && w.float) {
            push(period, RuleId::DoubleDutyWeekend, format!(
                "call and float both on weekend {}", w.weekend
            ));
        }

        if on_nights {
            continue;
        }

        if let Some(last) = pair.iter().find(|w| w.weekend == Half::Second && w.any()) {
            if input.grid.rotation(name, period + 1).is_night_coverage() {
                push(period, RuleId::RestBeforeNights, format!(
                    "{} on weekend 2 immediately before night coverage in period {}",
                    last.describe(), period + 1
                ));
            }
        }

        if let Some(first) = pair.iter().find(|w| w.weekend == Half::First && w.any()) {
            if period > 0 && input.grid.rotation(name, period - 1).is_night_coverage() {
                push(period, RuleId::RestAfterNights, format!(
                    "{} on weekend 1 immediately after night coverage in period {}",
                    first.describe(), period - 1
                ));
            }
        }
    }

    for pair in weekends.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let mixed = (a.call && b.float && !a.float) || (a.float && b.call && !a.call);
        if mixed {
            push(b.period, RuleId::BackToBackMixedDuty, format!(
                "{} on {} followed by {} on {}",
                a.describe(), SlotKey::new(a.period, a.weekend),
                b.describe(), SlotKey::new(b.period, b.weekend)
            ));
        }
    }

    let window = config.frequency_window_weekends.max(1);
    let mut flagged = BTreeSet::new();
    for span in weekends.windows(window) {
        let busy = span.iter().filter(|w| w.any()).count();
        if busy > config.max_duties_per_window {
            let end = span[span.len() - 1];
            if flagged.insert(end.period) {
                push(end.period, RuleId::DutyFrequency, format!(
                    "{busy} duty weekends in {window} ending {}",
                    SlotKey::new(end.period, end.weekend)
                ));
            }
        }
    }

    out.sort_by_key(|v| (v.period, v.rule));
    out
}

/// Exchange the holders of two duty slots (of either type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SwapRequest {
    pub duty_a: DutyType,
    pub slot_a: SlotKey,
    pub duty_b: DutyType,
    pub slot_b: SlotKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapAssessment {
    /// Violations present after the swap but not before.
    pub introduced:     Vec<Violation>,
    /// Violations present before the swap but not after.
    pub resolved:       Vec<Violation>,
    pub call_schedule:  DutySchedule,
    pub float_schedule: DutySchedule,
}

impl SwapAssessment {
    pub fn is_clean(&self) -> bool {
        self.introduced.is_empty()
    }
}

/// Pre-validate a swap request against cloned schedules.
/// The caller's schedules are never touched.
pub fn evaluate_swap(
    input:   &ProgramInput,
    call:    &DutySchedule,
    float:   &DutySchedule,
    config:  &ComplianceConfig,
    request: SwapRequest,
) -> EngineResult<SwapAssessment> {
    let pick = |duty: DutyType| match duty {
        DutyType::Call  => call,
        DutyType::Float => float,
    };
    let slot_a = pick(request.duty_a)
        .get(request.slot_a)
        .cloned()
        .ok_or_else(|| EngineError::UnknownSlot { key: request.slot_a.to_string() })?;
    let slot_b = pick(request.duty_b)
        .get(request.slot_b)
        .cloned()
        .ok_or_else(|| EngineError::UnknownSlot { key: request.slot_b.to_string() })?;

    let mut next_call = call.clone();
    let mut next_float = float.clone();
    for (duty, key, slot) in [
        (request.duty_a, request.slot_a, slot_b),
        (request.duty_b, request.slot_b, slot_a),
    ] {
        match duty {
            DutyType::Call  => next_call.set(key, slot),
            DutyType::Float => next_float.set(key, slot),
        }
    }

    let before = check(input, call, float, config);
    let after = check(input, &next_call, &next_float, config);

    Ok(SwapAssessment {
        introduced: difference(&after, &before),
        resolved:   difference(&before, &after),
        call_schedule:  next_call,
        float_schedule: next_float,
    })
}

/// Multiset difference `a − b`.
fn difference(a: &[Violation], b: &[Violation]) -> Vec<Violation> {
    let mut remaining: Vec<&Violation> = b.iter().collect();
    a.iter()
        .filter(|v| match remaining.iter().position(|r| *r == *v) {
            Some(i) => {
                remaining.swap_remove(i);
                false
            }
            None => true,
        })
        .cloned()
        .collect()
}
