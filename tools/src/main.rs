//! duty-runner: headless runner for the duty engine.
//!
//! Usage:
//!   duty-runner --data-dir ./data --snapshot ./data/sample_program.json
//!   duty-runner --seed 12345 --json > report.json

use anyhow::Result;
use chrono::NaiveDate;
use duty_core::{
    engine::{DutyEngine, EngineReport},
    snapshot::{ProgramInput, ProgramSnapshot},
    types::Half,
};
use std::env;

#[derive(serde::Serialize)]
struct RunHeader<'a> {
    snapshot: &'a str,
    seed:     Option<u64>,
    trainees: usize,
    periods:  usize,
    first:    Option<NaiveDate>,
    last:     Option<NaiveDate>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let json_mode = args.iter().any(|a| a == "--json");
    let data_dir = arg_str(&args, "--data-dir").unwrap_or("./data");
    let default_snapshot = format!("{data_dir}/sample_program.json");
    let snapshot_path = arg_str(&args, "--snapshot").unwrap_or(&default_snapshot);

    let mut engine = DutyEngine::load(data_dir)?;
    if let Some(seed) = arg_str(&args, "--seed").and_then(|s| s.parse().ok()) {
        engine.config.coverage.seed = Some(seed);
    }

    let snapshot = ProgramSnapshot::load(snapshot_path)?;
    let input = engine.validate(&snapshot)?;
    let report = engine.run_input(&input)?;

    let header = RunHeader {
        snapshot: snapshot_path,
        seed:     engine.config.coverage.seed,
        trainees: input.roster.len(),
        periods:  input.calendar.len(),
        first:    input.calendar.get(0).map(|p| p.start),
        last:     input.calendar.get(input.calendar.len().saturating_sub(1)).map(|p| p.end),
    };

    if json_mode {
        let out = serde_json::json!({ "run": header, "report": report });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_summary(&header, &input, &report);
    }
    Ok(())
}

fn print_summary(header: &RunHeader<'_>, input: &ProgramInput, report: &EngineReport) {
    println!("duty-runner");
    println!("  snapshot:  {}", header.snapshot);
    println!("  seed:      {:?}", header.seed);
    println!("  trainees:  {}", header.trainees);
    match (header.first, header.last) {
        (Some(first), Some(last)) => println!(
            "  periods:   {} ({} to {})",
            header.periods,
            first.format("%d %b %Y"),
            last.format("%d %b %Y")
        ),
        _ => println!("  periods:   {}", header.periods),
    }
    println!();

    let a = &report.assignment;
    println!("=== DUTY ASSIGNMENT ===");
    println!("  call slots:   {} ({} relaxed, {} missing)",
        a.call_schedule.len(), a.call_schedule.relaxed_slots().len(), a.call_schedule.missing_slots().len());
    println!("  float slots:  {} ({} relaxed, {} missing)",
        a.float_schedule.len(), a.float_schedule.relaxed_slots().len(), a.float_schedule.missing_slots().len());
    println!();

    println!("=== COUNTS (actual/target) ===");
    for (name, c) in &report.counts {
        println!(
            "  {name:<12} call {}/{}  float {}/{}  clinic cover {}/{}",
            c.call, c.call_target, c.float, c.float_target, c.coverage, c.coverage_target
        );
    }
    println!();

    let cov = &report.coverage;
    println!("=== CLINIC COVERAGE ===");
    println!("  sessions:  {}", cov.entries.len());
    println!("  uncovered: {}", cov.uncovered().count());
    println!("  cost:      {} (greedy baseline {})", cov.cost, cov.baseline_cost);
    for e in cov.uncovered() {
        let date = e.clinic_date.map(|d| d.format("%a %d %b").to_string()).unwrap_or_default();
        println!("    period {} week {} {} {date}: UNCOVERED", e.period, e.week, e.absent);
    }
    println!();

    let c = &report.conflicts;
    println!("=== CONFLICTS ({}) ===", c.total);
    for b in &c.double_bookings {
        println!("  double booking: {} on {} ({})", b.trainee, b.date, b.labels.join(" / "));
    }
    for g in &c.coverage_gaps {
        println!("  coverage gap:   period {} has no {}", g.period, g.rotation.name());
    }
    for v in &c.acgme_violations {
        let weekend = input
            .calendar
            .get(v.period)
            .map(|p| p.weekend_date(Half::First).format("%d %b").to_string())
            .unwrap_or_default();
        println!("  {:<24} {:<12} period {:>2} ({weekend}) {}", v.rule.code(), v.trainee, v.period, v.detail);
    }
}

fn arg_str<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
