//! Same input, same output.
//!
//! The application re-runs the engine on every edit and must show a
//! stable result across re-renders. Two runs over the same snapshot and
//! seed must serialize to byte-identical reports.

use duty_core::{
    config::EngineConfig,
    engine::DutyEngine,
    snapshot::{ProgramInput, ProgramSnapshot},
};

fn sample_input(config: &EngineConfig) -> ProgramInput {
    let path = format!("{}/../data/sample_program.json", env!("CARGO_MANIFEST_DIR"));
    ProgramSnapshot::load(&path)
        .expect("sample program")
        .validate(config)
        .expect("sample validates")
}

fn engine_with_seed(seed: u64) -> DutyEngine {
    let mut config = EngineConfig::default_test();
    config.coverage.seed = Some(seed);
    DutyEngine::new(config)
}

#[test]
fn same_seed_produces_identical_reports() {
    const SEED: u64 = 0xDEAD_BEEF_CAFE_1234;

    let engine_a = engine_with_seed(SEED);
    let engine_b = engine_with_seed(SEED);
    let input = sample_input(&engine_a.config);

    let report_a = engine_a.run_input(&input).expect("run a");
    let report_b = engine_b.run_input(&input).expect("run b");

    let json_a = serde_json::to_string(&report_a).expect("serialize a");
    let json_b = serde_json::to_string(&report_b).expect("serialize b");
    assert_eq!(json_a, json_b, "Reports diverged for identical seed");
}

#[test]
fn seed_only_moves_coverage() {
    let engine_a = engine_with_seed(42);
    let engine_b = engine_with_seed(99);
    let input = sample_input(&engine_a.config);

    let report_a = engine_a.run_input(&input).expect("run a");
    let report_b = engine_b.run_input(&input).expect("run b");

    // Duty assignment and compliance never consult the seed.
    assert_eq!(report_a.assignment, report_b.assignment);
    assert_eq!(report_a.conflicts, report_b.conflicts);

    // Coverage may differ, but neither run can lose to the greedy baseline.
    assert_eq!(report_a.coverage.baseline_cost, report_b.coverage.baseline_cost);
    assert!(report_a.coverage.cost <= report_a.coverage.baseline_cost);
    assert!(report_b.coverage.cost <= report_b.coverage.baseline_cost);
}
