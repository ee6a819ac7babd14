//! Clinic coverage optimizer.
//!
//! Every week a trainee spends on night coverage, their weekly clinic
//! session needs a substitute. Picking substitutes is a small weighted
//! assignment problem, solved by randomized local search with restarts:
//!
//!   - restart 0 starts from the greedy baseline, later restarts from a
//!     random feasible assignment
//!   - each iteration proposes one random single-entry reassignment and
//!     keeps it only if total cost strictly drops
//!   - the cheapest assignment over all restarts wins, earliest on ties
//!
//! Cost = Σ (coverage count − target)²
//!      + same_day_penalty     × entries covered by someone sharing the clinic weekday
//!      + back_to_back_penalty × pairs of adjacent weeks covered by the same trainee
//!
//! All randomness comes from the caller's seed via RngBank, one stream per
//! restart, so the result is stable across re-renders.

use crate::{
    config::{CoverageConfig, TierPolicy},
    error::{EngineError, EngineResult},
    rng::{RngBank, SearchRng},
    rotation::Rotation,
    snapshot::ProgramInput,
    types::{global_week, ClinicDay, Half, PeriodIndex, TraineeName},
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageEntry {
    pub period:           PeriodIndex,
    pub week:             Half,
    pub absent:           TraineeName,
    pub clinic_day:       ClinicDay,
    pub clinic_date:      Option<NaiveDate>,
    /// None when nobody can cover: the session is uncovered.
    pub coverer:          Option<TraineeName>,
    pub coverer_rotation: Option<Rotation>,
    pub same_clinic_day:  bool,
    pub back_to_back:     bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageResult {
    pub entries:       Vec<CoverageEntry>,
    pub counts:        BTreeMap<TraineeName, u32>,
    pub cost:          u64,
    pub baseline_cost: u64,
}

impl CoverageResult {
    pub fn uncovered(&self) -> impl Iterator<Item = &CoverageEntry> {
        self.entries.iter().filter(|e| e.coverer.is_none())
    }
}

/// One clinic session needing a substitute.
#[derive(Debug, Clone)]
struct Need {
    period:     PeriodIndex,
    week:       Half,
    absent:     usize,
    clinic_day: ClinicDay,
    /// Feasible coverers, roster indices in roster order.
    candidates: Vec<usize>,
}

/// Candidate per need; None only when the need has no candidates.
pub type Assignment = Vec<Option<usize>>;

/// The flattened search problem. Trainees are addressed by roster index.
pub struct CoverageProblem<'a> {
    input:       &'a ProgramInput,
    names:       Vec<&'a str>,
    clinic_days: Vec<ClinicDay>,
    targets:     Vec<i64>,
    needs:       Vec<Need>,
    same_day_penalty:     u64,
    back_to_back_penalty: u64,
}

impl<'a> CoverageProblem<'a> {
    pub fn build(input: &'a ProgramInput, policy: &TierPolicy, constraints: &CoverageConfig) -> Self {
        let trainees: Vec<_> = input.roster.iter().collect();
        let time_off = input.time_off_index();
        let mut needs = Vec::new();

        for (period, _) in input.calendar.iter() {
            for week in Half::BOTH {
                for (absent, t) in trainees.iter().enumerate() {
                    if t.clinic_day == 0 || !input.grid.rotation(&t.name, period).is_night_coverage() {
                        continue;
                    }
                    let candidates = trainees
                        .iter()
                        .enumerate()
                        .filter(|&(i, c)| {
                            if i == absent || time_off.is_off(&c.name, period) {
                                return false;
                            }
                            if constraints.cannot_cover.contains(&input.grid.rotation(&c.name, period)) {
                                return false;
                            }
                            let junior_excluded = c.tier == policy.junior_tier
                                && period < constraints.junior_excluded_until;
                            let senior_excluded = c.tier == policy.senior_tier
                                && constraints.senior_excluded_from.is_some_and(|from| period >= from);
                            !junior_excluded && !senior_excluded
                        })
                        .map(|(i, _)| i)
                        .collect();
                    needs.push(Need { period, week, absent, clinic_day: t.clinic_day, candidates });
                }
            }
        }

        Self {
            input,
            names:       input.roster.iter().map(|t| t.name.as_str()).collect(),
            clinic_days: input.roster.iter().map(|t| t.clinic_day).collect(),
            targets:     input.roster.iter().map(|t| input.targets.get(&t.name).coverage as i64).collect(),
            needs,
            same_day_penalty:     constraints.same_day_penalty,
            back_to_back_penalty: constraints.back_to_back_penalty,
        }
    }

    /// Single greedy pass: lowest running count, ties to roster order.
    pub fn baseline(&self) -> Assignment {
        let mut counts = vec![0u32; self.names.len()];
        self.needs
            .iter()
            .map(|need| {
                let pick = need.candidates.iter().copied().min_by_key(|&c| counts[c]);
                if let Some(c) = pick {
                    counts[c] += 1;
                }
                pick
            })
            .collect()
    }

    /// Uniformly random feasible assignment.
    pub fn random(&self, rng: &mut SearchRng) -> Assignment {
        self.needs.iter().map(|need| rng.pick(&need.candidates).copied()).collect()
    }

    pub fn cost(&self, assignment: &Assignment) -> u64 {
        let mut counts = vec![0i64; self.names.len()];
        let mut same_day = 0u64;
        let mut weeks: Vec<Vec<usize>> = vec![Vec::new(); self.names.len()];

        for (need, pick) in self.needs.iter().zip(assignment) {
            if let Some(c) = *pick {
                counts[c] += 1;
                if self.clinic_days[c] == need.clinic_day {
                    same_day += 1;
                }
                weeks[c].push(global_week(need.period, need.week));
            }
        }

        let balance: u64 = counts
            .iter()
            .zip(&self.targets)
            .map(|(count, target)| ((count - target) * (count - target)) as u64)
            .sum();
        let adjacent: u64 = weeks.iter_mut().map(|w| adjacent_pairs(w)).sum();

        balance + same_day * self.same_day_penalty + adjacent * self.back_to_back_penalty
    }

    /// Hill-climb from `current` for `iterations` proposals.
    pub fn improve(&self, mut current: Assignment, iterations: u32, rng: &mut SearchRng) -> (Assignment, u64) {
        let movable: Vec<usize> = self
            .needs
            .iter()
            .enumerate()
            .filter(|(_, n)| n.candidates.len() >= 2)
            .map(|(i, _)| i)
            .collect();
        let mut cost = self.cost(&current);
        if movable.is_empty() {
            return (current, cost);
        }

        for _ in 0..iterations {
            let Some(&slot) = rng.pick(&movable) else { break };
            let Some(&proposal) = rng.pick(&self.needs[slot].candidates) else { continue };
            let previous = current[slot];
            if previous == Some(proposal) {
                continue;
            }
            current[slot] = Some(proposal);
            let proposed_cost = self.cost(&current);
            if proposed_cost < cost {
                cost = proposed_cost;
            } else {
                current[slot] = previous;
            }
        }
        (current, cost)
    }

    /// Materialize entries, flags and counts for an assignment.
    pub fn result(&self, assignment: &Assignment, baseline_cost: u64) -> CoverageResult {
        let mut weeks: Vec<Vec<usize>> = vec![Vec::new(); self.names.len()];
        for (need, pick) in self.needs.iter().zip(assignment) {
            if let Some(c) = *pick {
                weeks[c].push(global_week(need.period, need.week));
            }
        }

        let mut counts: BTreeMap<TraineeName, u32> =
            self.names.iter().map(|n| (n.to_string(), 0)).collect();

        let entries = self
            .needs
            .iter()
            .zip(assignment)
            .map(|(need, pick)| {
                let week_no = global_week(need.period, need.week);
                let clinic_date = self
                    .input
                    .calendar
                    .get(need.period)
                    .and_then(|p| p.clinic_date(need.week, need.clinic_day));
                let (coverer, coverer_rotation, same_clinic_day, back_to_back) = match *pick {
                    Some(c) => {
                        let name = self.names[c];
                        if let Some(n) = counts.get_mut(name) {
                            *n += 1;
                        }
                        let b2b = weeks[c].iter().any(|&w| w + 1 == week_no || week_no + 1 == w);
                        (
                            Some(name.to_string()),
                            Some(self.input.grid.rotation(name, need.period)),
                            self.clinic_days[c] == need.clinic_day,
                            b2b,
                        )
                    }
                    None => (None, None, false, false),
                };
                CoverageEntry {
                    period: need.period,
                    week: need.week,
                    absent: self.names[need.absent].to_string(),
                    clinic_day: need.clinic_day,
                    clinic_date,
                    coverer,
                    coverer_rotation,
                    same_clinic_day,
                    back_to_back,
                }
            })
            .collect();

        CoverageResult {
            entries,
            counts,
            cost: self.cost(assignment),
            baseline_cost,
        }
    }
}

/// Pairs of consecutive week numbers in `weeks`.
fn adjacent_pairs(weeks: &mut [usize]) -> u64 {
    weeks.sort_unstable();
    weeks.windows(2).filter(|w| w[1] == w[0] + 1).count() as u64
}

/// Assign a coverer to every clinic session missed for night coverage.
pub fn optimize(
    input:       &ProgramInput,
    policy:      &TierPolicy,
    constraints: &CoverageConfig,
) -> EngineResult<CoverageResult> {
    let seed = constraints.seed.ok_or(EngineError::MissingSeed)?;
    let problem = CoverageProblem::build(input, policy, constraints);
    let bank = RngBank::new(seed);

    let baseline = problem.baseline();
    let baseline_cost = problem.cost(&baseline);

    let mut best = (baseline.clone(), baseline_cost);
    for restart in 0..constraints.restarts.max(1) {
        let mut rng = bank.for_restart(restart);
        let start = if restart == 0 { baseline.clone() } else { problem.random(&mut rng) };
        let (assignment, cost) = problem.improve(start, constraints.iterations, &mut rng);
        log::trace!("coverage restart {restart}: cost {cost}");
        if cost < best.1 {
            best = (assignment, cost);
        }
    }

    let result = problem.result(&best.0, baseline_cost);
    let uncovered = result.uncovered().count();
    if uncovered > 0 {
        log::warn!("{uncovered} clinic session(s) have no feasible coverer");
    }
    log::debug!(
        "coverage: {} sessions, cost {} (baseline {})",
        result.entries.len(),
        result.cost,
        baseline_cost
    );
    Ok(result)
}
