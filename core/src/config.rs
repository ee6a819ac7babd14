use crate::{
    error::{EngineError, EngineResult},
    roster::{Roster, Trainee},
    rotation::{Rotation, RotationTable},
    types::{PeriodIndex, Tier},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Per-tier duty targets. Call and float targets are hard ceilings;
/// the coverage target is what the clinic search balances towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTargets {
    pub call:     u32,
    pub float:    u32,
    pub coverage: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierPolicy {
    /// Most-junior tier: needs prior ICU for call, prior floor for float.
    pub junior_tier: Tier,
    /// Top tier: no call before the milestone date.
    pub senior_tier: Tier,
    pub senior_call_milestone: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageConfig {
    /// Rotations whose holders cannot leave to cover a clinic.
    pub cannot_cover: Vec<Rotation>,
    /// Junior tier may not cover in periods before this index.
    pub junior_excluded_until: PeriodIndex,
    /// Senior tier may not cover from this period index onward.
    #[serde(default)]
    pub senior_excluded_from: Option<PeriodIndex>,
    pub same_day_penalty:     u64,
    pub back_to_back_penalty: u64,
    /// Required. A missing seed is rejected by the optimizer.
    #[serde(default)]
    pub seed:       Option<u64>,
    pub iterations: u32,
    pub restarts:   u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// Rolling window, in weekends, for the duty frequency rule.
    pub frequency_window_weekends: usize,
    /// Most duty weekends allowed inside one window.
    pub max_duties_per_window: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct EngineConfigFile {
    tier_targets:    BTreeMap<Tier, TierTargets>,
    #[serde(default)]
    trainee_targets: BTreeMap<String, TierTargets>,
    tier_policy:     TierPolicy,
    coverage:        CoverageConfig,
    compliance:      ComplianceConfig,
    must_staff:      Vec<Rotation>,
}

#[derive(Debug, Clone, Deserialize)]
struct RotationLabelsFile {
    labels: HashMap<String, Rotation>,
}

/// Everything the engine needs besides the program snapshot itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub tier_targets:    BTreeMap<Tier, TierTargets>,
    /// Per-trainee overrides of the tier targets.
    pub trainee_targets: BTreeMap<String, TierTargets>,
    pub tier_policy:     TierPolicy,
    pub coverage:        CoverageConfig,
    pub compliance:      ComplianceConfig,
    /// Rotations that must be staffed by at least one trainee every period.
    pub must_staff:      Vec<Rotation>,
    pub rotation_labels: RotationTable,
}

impl EngineConfig {
    /// Load from the data/ directory.
    /// In tests, use EngineConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/engine_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: EngineConfigFile = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;

        let labels_path = format!("{data_dir}/rotation_labels.json");
        let labels_content = std::fs::read_to_string(&labels_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {labels_path}: {e}"))?;
        let labels_file: RotationLabelsFile = serde_json::from_str(&labels_content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {labels_path}: {e}"))?;

        log::info!(
            "Loaded engine config: {} tiers, {} rotation labels",
            file.tier_targets.len(),
            labels_file.labels.len()
        );

        Ok(Self {
            tier_targets:    file.tier_targets,
            trainee_targets: file.trainee_targets,
            tier_policy:     file.tier_policy,
            coverage:        file.coverage,
            compliance:      file.compliance,
            must_staff:      file.must_staff,
            rotation_labels: RotationTable::new(labels_file.labels),
        })
    }

    /// Targets for one trainee: the per-trainee override if present,
    /// otherwise the tier's targets.
    pub fn targets_for(&self, trainee: &Trainee) -> EngineResult<TierTargets> {
        if let Some(t) = self.trainee_targets.get(&trainee.name) {
            return Ok(*t);
        }
        self.tier_targets
            .get(&trainee.tier)
            .copied()
            .ok_or(EngineError::MissingTierTargets { tier: trainee.tier })
    }

    /// Resolve targets for the whole roster, failing fast on any trainee
    /// named in the overrides but absent from the roster.
    pub fn resolve_targets(&self, roster: &Roster) -> EngineResult<Targets> {
        for name in self.trainee_targets.keys() {
            roster.require(name, "trainee targets")?;
        }
        let by_trainee = roster
            .iter()
            .map(|t| self.targets_for(t).map(|targets| (t.name.clone(), targets)))
            .collect::<EngineResult<HashMap<_, _>>>()?;
        Ok(Targets { by_trainee })
    }

    /// Reference configuration used throughout the test suite.
    /// Three tiers (4 junior, 6 senior), 2-week periods from 2025-07-01.
    pub fn default_test() -> Self {
        let tier_targets: BTreeMap<Tier, TierTargets> = [
            (4, TierTargets { call: 5, float: 5, coverage: 3 }),
            (5, TierTargets { call: 6, float: 4, coverage: 3 }),
            (6, TierTargets { call: 4, float: 3, coverage: 2 }),
        ]
        .into();

        let mut rotation_labels = RotationTable::default();
        for (label, rotation) in [
            ("Cath",     Rotation::Clinical),
            ("Echo",     Rotation::Clinical),
            ("EP",       Rotation::Clinical),
            ("Nuclear",  Rotation::Clinical),
            ("Imaging",  Rotation::Clinical),
            ("Consults", Rotation::Clinical),
            ("CCU",      Rotation::Icu),
            ("Floors",   Rotation::Floor),
            ("Nights",   Rotation::NightCoverage),
            ("Research", Rotation::Research),
            ("Admin",    Rotation::Administrative),
        ] {
            rotation_labels.insert(label, rotation);
        }

        Self {
            tier_targets,
            trainee_targets: BTreeMap::new(),
            tier_policy: TierPolicy {
                junior_tier: 4,
                senior_tier: 6,
                senior_call_milestone: NaiveDate::from_ymd_opt(2026, 1, 1)
                    .unwrap_or(NaiveDate::MIN),
            },
            coverage: CoverageConfig {
                cannot_cover: vec![Rotation::Icu, Rotation::NightCoverage, Rotation::Floor],
                junior_excluded_until: 2,
                senior_excluded_from:  None,
                same_day_penalty:      4,
                back_to_back_penalty:  3,
                seed:                  Some(0x5EED),
                iterations:            2_000,
                restarts:              8,
            },
            compliance: ComplianceConfig {
                frequency_window_weekends: 4,
                max_duties_per_window:     3,
            },
            must_staff: vec![Rotation::Icu, Rotation::Floor, Rotation::NightCoverage],
            rotation_labels,
        }
    }
}

/// Resolved targets for every trainee on a roster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Targets {
    by_trainee: HashMap<String, TierTargets>,
}

impl Targets {
    /// Zero targets for anyone not resolved, so an unknown name is never
    /// selected for a duty.
    pub fn get(&self, name: &str) -> TierTargets {
        self.by_trainee
            .get(name)
            .copied()
            .unwrap_or(TierTargets { call: 0, float: 0, coverage: 0 })
    }
}
