//! Duty-hour compliance checker tests.
//!
//! Schedules are built by hand so every expected violation is explicit.

use duty_core::{
    assigner::{DutySchedule, DutySlot, SlotKey},
    compliance::{self, RuleId, SwapRequest, Violation},
    config::EngineConfig,
    engine::DutyEngine,
    error::EngineError,
    roster::TimeOff,
    snapshot::{ProgramInput, ProgramSnapshot},
    types::{DutyType, Half},
};
use std::collections::BTreeMap;

const PERIODS: usize = 12;

fn build(rows: &[(&str, &[(usize, &str)])], time_off: Vec<TimeOff>) -> ProgramInput {
    let start = chrono::NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
    let periods: Vec<_> = (0..PERIODS)
        .map(|i| {
            let s = start + chrono::Duration::days(14 * i as i64);
            serde_json::json!({ "start": s, "end": s + chrono::Duration::days(13), "cycle": 1 })
        })
        .collect();
    let trainees: Vec<_> = rows
        .iter()
        .map(|(name, _)| serde_json::json!({ "name": name, "tier": 5, "clinic_day": 3 }))
        .collect();
    let rotations: BTreeMap<String, Vec<String>> = rows
        .iter()
        .map(|(name, overrides)| {
            let mut row = vec!["Cath".to_string(); PERIODS];
            for (p, label) in overrides.iter() {
                row[*p] = label.to_string();
            }
            (name.to_string(), row)
        })
        .collect();
    let snapshot: ProgramSnapshot = serde_json::from_value(serde_json::json!({
        "trainees": trainees,
        "periods": periods,
        "rotations": rotations,
        "time_off": time_off,
    }))
    .expect("snapshot json");
    snapshot.validate(&EngineConfig::default_test()).expect("valid snapshot")
}

fn schedule(slots: &[(usize, Half, &str)]) -> DutySchedule {
    let mut s = DutySchedule::new();
    for &(period, weekend, name) in slots {
        s.set(SlotKey::new(period, weekend), DutySlot::strict(name));
    }
    s
}

fn check(input: &ProgramInput, call: &DutySchedule, float: &DutySchedule) -> Vec<Violation> {
    DutyEngine::build_test().check(input, call, float)
}

fn rules_for(violations: &[Violation], name: &str, period: usize) -> Vec<RuleId> {
    violations
        .iter()
        .filter(|v| v.trainee == name && v.period == period)
        .map(|v| v.rule)
        .collect()
}

#[test]
fn approved_time_off_with_call_is_one_violation() {
    let input = build(&[("Ana", &[]), ("Ben", &[])], vec![TimeOff::approved("Ana", 3, 4)]);
    let call = schedule(&[(3, Half::First, "Ana"), (3, Half::Second, "Ben")]);
    let violations = check(&input, &call, &DutySchedule::new());

    let for_ana: Vec<_> = violations.iter().filter(|v| v.trainee == "Ana" && v.period == 3).collect();
    assert_eq!(for_ana.len(), 1, "{violations:?}");
    assert_eq!(for_ana[0].rule, RuleId::TimeOffConflict);
    assert!(rules_for(&violations, "Ben", 3).is_empty());
}

#[test]
fn time_off_counts_once_even_with_two_duties() {
    let input = build(&[("Ana", &[])], vec![TimeOff::approved("Ana", 2, 2)]);
    let call = schedule(&[(2, Half::First, "Ana")]);
    let float = schedule(&[(2, Half::Second, "Ana")]);
    let violations = check(&input, &call, &float);

    let time_off: Vec<_> = violations.iter().filter(|v| v.rule == RuleId::TimeOffConflict).collect();
    assert_eq!(time_off.len(), 1);
    assert!(time_off[0].detail.contains("weekend 1") && time_off[0].detail.contains("weekend 2"));
}

#[test]
fn pending_time_off_is_ignored() {
    let mut pending = TimeOff::approved("Ana", 3, 3);
    pending.state = duty_core::roster::ApprovalState::Pending;
    let input = build(&[("Ana", &[])], vec![pending]);
    let call = schedule(&[(3, Half::First, "Ana")]);
    assert!(check(&input, &call, &DutySchedule::new()).is_empty());
}

#[test]
fn call_during_nights() {
    let input = build(&[("Ana", &[(5, "Nights")])], vec![]);
    let call = schedule(&[(5, Half::First, "Ana")]);
    let violations = check(&input, &call, &DutySchedule::new());
    assert_eq!(rules_for(&violations, "Ana", 5), vec![RuleId::CallDuringNights]);
}

#[test]
fn float_on_nights_is_fine() {
    let input = build(&[("Ana", &[(5, "Nights")])], vec![]);
    let float = schedule(&[(5, Half::Second, "Ana")]);
    assert!(check(&input, &DutySchedule::new(), &float).is_empty());
}

#[test]
fn rest_around_nights() {
    let input = build(&[("Ana", &[(5, "Nights")])], vec![]);
    let call = schedule(&[(4, Half::Second, "Ana"), (6, Half::First, "Ana")]);
    let violations = check(&input, &call, &DutySchedule::new());

    assert_eq!(rules_for(&violations, "Ana", 4), vec![RuleId::RestBeforeNights]);
    assert_eq!(rules_for(&violations, "Ana", 6), vec![RuleId::RestAfterNights]);
}

#[test]
fn weekend_one_before_nights_is_fine() {
    let input = build(&[("Ana", &[(5, "Nights")])], vec![]);
    let float = schedule(&[(4, Half::First, "Ana")]);
    assert!(check(&input, &DutySchedule::new(), &float).is_empty());
}

#[test]
fn double_duty_and_back_to_back() {
    let input = build(&[("Ana", &[]), ("Ben", &[])], vec![]);
    let call = schedule(&[(2, Half::First, "Ana"), (7, Half::Second, "Ben")]);
    let float = schedule(&[(2, Half::First, "Ana"), (8, Half::First, "Ben")]);
    let violations = check(&input, &call, &float);

    assert_eq!(rules_for(&violations, "Ana", 2), vec![RuleId::DoubleDutyWeekend]);
    assert_eq!(rules_for(&violations, "Ben", 8), vec![RuleId::BackToBackMixedDuty]);
    assert!(rules_for(&violations, "Ben", 7).is_empty());
}

#[test]
fn same_type_back_to_back_is_not_mixed() {
    let input = build(&[("Ana", &[])], vec![]);
    let call = schedule(&[(2, Half::First, "Ana"), (2, Half::Second, "Ana")]);
    assert!(check(&input, &call, &DutySchedule::new()).is_empty());
}

#[test]
fn frequency_window() {
    // Default window: 4 weekends, at most 3 with duty.
    let input = build(&[("Ana", &[])], vec![]);
    let call = schedule(&[
        (1, Half::First, "Ana"),
        (1, Half::Second, "Ana"),
        (2, Half::First, "Ana"),
        (2, Half::Second, "Ana"),
    ]);
    let violations = check(&input, &call, &DutySchedule::new());
    assert_eq!(rules_for(&violations, "Ana", 2), vec![RuleId::DutyFrequency]);
    assert_eq!(violations.len(), 1);
}

#[test]
fn checker_is_pure() {
    let input = build(&[("Ana", &[(5, "Nights")]), ("Ben", &[])], vec![TimeOff::approved("Ben", 1, 1)]);
    let call = schedule(&[(4, Half::Second, "Ana"), (1, Half::First, "Ben"), (5, Half::First, "Ana")]);
    let float = schedule(&[(1, Half::Second, "Ben")]);
    let call_before = call.clone();
    let float_before = float.clone();

    let first = check(&input, &call, &float);
    for _ in 0..5 {
        assert_eq!(check(&input, &call, &float), first);
    }
    assert_eq!(call, call_before);
    assert_eq!(float, float_before);
    assert!(!first.is_empty());
}

#[test]
fn swap_reports_introduced_and_resolved() {
    let input = build(&[("Ana", &[(5, "Nights")]), ("Ben", &[])], vec![]);
    let call = schedule(&[(4, Half::Second, "Ana"), (9, Half::First, "Ben")]);
    let float = DutySchedule::new();
    let config = EngineConfig::default_test();

    let request = SwapRequest {
        duty_a: DutyType::Call,
        slot_a: SlotKey::new(4, Half::Second),
        duty_b: DutyType::Call,
        slot_b: SlotKey::new(9, Half::First),
    };
    let assessment = compliance::evaluate_swap(&input, &call, &float, &config.compliance, request).unwrap();

    assert!(assessment.is_clean());
    assert_eq!(assessment.resolved.len(), 1);
    assert_eq!(assessment.resolved[0].rule, RuleId::RestBeforeNights);
    assert_eq!(assessment.call_schedule.holder(4, Half::Second), Some("Ben"));
    assert_eq!(assessment.call_schedule.holder(9, Half::First), Some("Ana"));
    // The stored schedule is untouched.
    assert_eq!(call.holder(4, Half::Second), Some("Ana"));

    // And the reverse direction introduces it.
    let back = compliance::evaluate_swap(
        &input,
        &assessment.call_schedule,
        &float,
        &config.compliance,
        request,
    )
    .unwrap();
    assert_eq!(back.introduced.len(), 1);
    assert!(!back.is_clean());
}

#[test]
fn swap_with_unknown_slot_fails() {
    let input = build(&[("Ana", &[])], vec![]);
    let call = schedule(&[(1, Half::First, "Ana")]);
    let request = SwapRequest {
        duty_a: DutyType::Call,
        slot_a: SlotKey::new(1, Half::First),
        duty_b: DutyType::Float,
        slot_b: SlotKey::new(1, Half::Second),
    };
    let err = DutyEngine::build_test()
        .evaluate_swap(&input, &call, &DutySchedule::new(), request)
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownSlot { .. }));
}
