//! Clinic coverage optimizer tests.
//!
//! Tests cover: which sessions need cover, feasibility of chosen coverers,
//! flag consistency, seed determinism, and cost against the greedy baseline.

use duty_core::{
    config::EngineConfig,
    coverage::{self, CoverageProblem, CoverageResult},
    error::EngineError,
    rotation::Rotation,
    snapshot::{ProgramInput, ProgramSnapshot},
};
use std::collections::BTreeMap;

const PERIODS: usize = 26;
const CYCLE: [&str; 8] = ["Cath", "CCU", "Floors", "Nights", "Echo", "Research", "EP", "Consults"];

fn build(trainees: &[(&str, u8, u8)], rows: BTreeMap<String, Vec<String>>) -> ProgramInput {
    let start = chrono::NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
    let periods: Vec<_> = (0..PERIODS)
        .map(|i| {
            let s = start + chrono::Duration::days(14 * i as i64);
            serde_json::json!({ "start": s, "end": s + chrono::Duration::days(13), "cycle": i / 2 + 1 })
        })
        .collect();
    let trainees: Vec<_> = trainees
        .iter()
        .map(|(name, tier, day)| serde_json::json!({ "name": name, "tier": tier, "clinic_day": day }))
        .collect();
    let snapshot: ProgramSnapshot = serde_json::from_value(serde_json::json!({
        "trainees": trainees,
        "periods": periods,
        "rotations": rows,
    }))
    .expect("snapshot json");
    snapshot.validate(&EngineConfig::default_test()).expect("valid snapshot")
}

fn program() -> ProgramInput {
    let trainees = [
        ("A4", 4, 1), ("B4", 4, 2), ("C5", 5, 3), ("D5", 5, 1),
        ("E6", 6, 4), ("F6", 6, 5), ("G5", 5, 2), ("H4", 4, 0),
    ];
    let rows = trainees
        .iter()
        .enumerate()
        .map(|(i, (name, _, _))| {
            let row = (0..PERIODS).map(|p| CYCLE[(p + i) % CYCLE.len()].to_string()).collect();
            (name.to_string(), row)
        })
        .collect();
    build(&trainees, rows)
}

fn optimize_with(input: &ProgramInput, seed: Option<u64>) -> Result<CoverageResult, EngineError> {
    let mut config = EngineConfig::default_test();
    config.coverage.seed = seed;
    coverage::optimize(input, &config.tier_policy, &config.coverage)
}

#[test]
fn entries_only_for_night_weeks_with_clinic() {
    let input = program();
    let result = optimize_with(&input, Some(1)).unwrap();

    let expected: usize = input
        .roster
        .iter()
        .filter(|t| t.clinic_day != 0)
        .map(|t| (0..PERIODS).filter(|&p| input.grid.rotation(&t.name, p).is_night_coverage()).count() * 2)
        .sum();
    assert_eq!(result.entries.len(), expected);

    for e in &result.entries {
        assert_eq!(input.grid.rotation(&e.absent, e.period), Rotation::NightCoverage);
        assert_ne!(e.absent, "H4", "trainee without clinic never needs cover");
        assert!(e.clinic_date.is_some());
    }
}

#[test]
fn coverers_are_feasible() {
    let input = program();
    let config = EngineConfig::default_test();
    let result = optimize_with(&input, Some(2)).unwrap();

    for e in &result.entries {
        let Some(name) = e.coverer.as_deref() else { continue };
        assert_ne!(name, e.absent);
        let rotation = input.grid.rotation(name, e.period);
        assert_eq!(e.coverer_rotation, Some(rotation));
        assert!(!config.coverage.cannot_cover.contains(&rotation), "{name} on {rotation:?}");

        let coverer = input.roster.get(name).unwrap();
        if coverer.tier == config.tier_policy.junior_tier {
            assert!(e.period >= config.coverage.junior_excluded_until);
        }
        let absent = input.roster.get(&e.absent).unwrap();
        assert_eq!(e.same_clinic_day, coverer.clinic_day == absent.clinic_day);
    }
}

#[test]
fn counts_match_entries() {
    let input = program();
    let result = optimize_with(&input, Some(3)).unwrap();

    let mut tally: BTreeMap<String, u32> = BTreeMap::new();
    for e in &result.entries {
        if let Some(c) = &e.coverer {
            *tally.entry(c.clone()).or_default() += 1;
        }
    }
    for (name, count) in &result.counts {
        assert_eq!(tally.get(name).copied().unwrap_or(0), *count, "{name}");
    }
}

#[test]
fn same_seed_same_result() {
    let input = program();
    let a = optimize_with(&input, Some(0xC0FFEE)).unwrap();
    let b = optimize_with(&input, Some(0xC0FFEE)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn search_never_worse_than_baseline() {
    let input = program();
    let config = EngineConfig::default_test();
    let problem = CoverageProblem::build(&input, &config.tier_policy, &config.coverage);
    let baseline_cost = problem.cost(&problem.baseline());

    for seed in [1u64, 7, 42, 1234, 0xDEAD_BEEF] {
        let result = optimize_with(&input, Some(seed)).unwrap();
        assert_eq!(result.baseline_cost, baseline_cost);
        assert!(
            result.cost <= baseline_cost,
            "seed {seed}: cost {} above baseline {baseline_cost}",
            result.cost
        );
    }
}

#[test]
fn missing_seed_is_rejected() {
    let input = program();
    assert!(matches!(optimize_with(&input, None), Err(EngineError::MissingSeed)));
}

#[test]
fn uncovered_when_nobody_can_leave() {
    let mut rows = BTreeMap::new();
    let mut nights = vec!["CCU".to_string(); PERIODS];
    nights[5] = "Nights".to_string();
    rows.insert("Nia".to_string(), nights);
    rows.insert("Ola".to_string(), vec!["CCU".to_string(); PERIODS]);
    rows.insert("Pat".to_string(), vec!["Floors".to_string(); PERIODS]);
    let input = build(&[("Nia", 5, 2), ("Ola", 5, 3), ("Pat", 5, 4)], rows);

    let result = optimize_with(&input, Some(9)).unwrap();
    assert_eq!(result.entries.len(), 2);
    assert_eq!(result.uncovered().count(), 2);
    for e in &result.entries {
        assert!(e.coverer.is_none());
        assert!(e.coverer_rotation.is_none());
        assert!(!e.same_clinic_day && !e.back_to_back);
    }
}

#[test]
fn single_candidate_covers_both_weeks_back_to_back() {
    let mut rows = BTreeMap::new();
    let mut nights = vec!["Cath".to_string(); PERIODS];
    nights[4] = "Nights".to_string();
    rows.insert("Nia".to_string(), nights);
    rows.insert("Ola".to_string(), vec!["Echo".to_string(); PERIODS]);
    let input = build(&[("Nia", 5, 2), ("Ola", 5, 2)], rows);

    let result = optimize_with(&input, Some(11)).unwrap();
    assert_eq!(result.entries.len(), 2);
    for e in &result.entries {
        assert_eq!(e.coverer.as_deref(), Some("Ola"));
        assert!(e.same_clinic_day);
        assert!(e.back_to_back);
    }
    assert_eq!(result.counts.get("Ola"), Some(&2));
}
