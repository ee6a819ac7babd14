//! The duty engine: the entry point the application calls.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Validate the program snapshot (fail fast on structural errors)
//!   2. Balanced duty assigner       → call + float schedules
//!   3. Clinic coverage optimizer    → coverage entries
//!   4. Conflict aggregator          → double bookings, gaps, compliance
//!
//! RULES:
//!   - Every stage is a pure function of the validated input.
//!   - Infeasibility is data (relaxed/missing slots, uncovered sessions).
//!   - All randomness flows through the coverage seed.

use crate::{
    assigner::{self, AssignmentResult, DutySchedule},
    compliance::{self, SwapAssessment, SwapRequest, Violation},
    config::EngineConfig,
    conflicts::{self, ConflictReport},
    coverage::{self, CoverageResult},
    eligibility::EligibilityContext,
    error::EngineResult,
    snapshot::{ProgramInput, ProgramSnapshot},
    types::{DutyType, TraineeName},
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Actual-vs-target counts for one trainee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunningCounts {
    pub call:            u32,
    pub call_target:     u32,
    pub float:           u32,
    pub float_target:    u32,
    pub coverage:        u32,
    pub coverage_target: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineReport {
    pub assignment: AssignmentResult,
    pub coverage:   CoverageResult,
    pub conflicts:  ConflictReport,
    pub counts:     BTreeMap<TraineeName, RunningCounts>,
}

impl EngineReport {
    pub fn violations(&self) -> &[Violation] {
        &self.conflicts.acgme_violations
    }
}

pub struct DutyEngine {
    pub config: EngineConfig,
}

impl DutyEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Build an engine from the data/ directory.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        Ok(Self::new(EngineConfig::load(data_dir)?))
    }

    pub fn build_test() -> Self {
        Self::new(EngineConfig::default_test())
    }

    pub fn validate(&self, snapshot: &ProgramSnapshot) -> EngineResult<ProgramInput> {
        snapshot.validate(&self.config)
    }

    pub fn eligibility<'a>(&'a self, input: &'a ProgramInput) -> EligibilityContext<'a> {
        EligibilityContext::new(
            &input.grid,
            &input.calendar,
            &self.config.tier_policy,
            input.time_off_index(),
        )
    }

    /// Validate, then run every stage.
    pub fn run(&self, snapshot: &ProgramSnapshot) -> EngineResult<EngineReport> {
        let input = self.validate(snapshot)?;
        self.run_input(&input)
    }

    pub fn run_input(&self, input: &ProgramInput) -> EngineResult<EngineReport> {
        let assignment = self.assign(input);
        let coverage = self.optimize_coverage(input)?;
        let conflicts = self.detect_conflicts(
            input,
            &assignment.call_schedule,
            &assignment.float_schedule,
        );
        let counts = running_counts(input, &assignment, &coverage);

        log::info!(
            "run complete: {} trainees, {} periods, {} missing slot(s), {} uncovered session(s), {} conflict(s)",
            input.roster.len(),
            input.calendar.len(),
            assignment.call_schedule.missing_slots().len() + assignment.float_schedule.missing_slots().len(),
            coverage.uncovered().count(),
            conflicts.total
        );

        Ok(EngineReport { assignment, coverage, conflicts, counts })
    }

    pub fn assign(&self, input: &ProgramInput) -> AssignmentResult {
        assigner::assign(
            &input.roster,
            &self.eligibility(input),
            &input.targets,
            &self.config.compliance,
        )
    }

    pub fn optimize_coverage(&self, input: &ProgramInput) -> EngineResult<CoverageResult> {
        coverage::optimize(input, &self.config.tier_policy, &self.config.coverage)
    }

    pub fn check(&self, input: &ProgramInput, call: &DutySchedule, float: &DutySchedule) -> Vec<Violation> {
        compliance::check(input, call, float, &self.config.compliance)
    }

    pub fn detect_conflicts(&self, input: &ProgramInput, call: &DutySchedule, float: &DutySchedule) -> ConflictReport {
        conflicts::detect(input, call, float, &self.config.must_staff, &self.config.compliance)
    }

    pub fn evaluate_swap(
        &self,
        input:   &ProgramInput,
        call:    &DutySchedule,
        float:   &DutySchedule,
        request: SwapRequest,
    ) -> EngineResult<SwapAssessment> {
        compliance::evaluate_swap(input, call, float, &self.config.compliance, request)
    }
}

fn running_counts(
    input:      &ProgramInput,
    assignment: &AssignmentResult,
    coverage:   &CoverageResult,
) -> BTreeMap<TraineeName, RunningCounts> {
    input
        .roster
        .iter()
        .map(|t| {
            let targets = input.targets.get(&t.name);
            let counts = RunningCounts {
                call:            assignment.counts.get(DutyType::Call, &t.name),
                call_target:     targets.call,
                float:           assignment.counts.get(DutyType::Float, &t.name),
                float_target:    targets.float,
                coverage:        coverage.counts.get(&t.name).copied().unwrap_or(0),
                coverage_target: targets.coverage,
            };
            (t.name.clone(), counts)
        })
        .collect()
}
