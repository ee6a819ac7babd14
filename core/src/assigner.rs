//! Balanced duty assigner. Fills every period's call and float weekends.
//!
//! EXECUTION ORDER (fixed): periods ascending; within a period the float
//! pass runs before the call pass, weekend 1 before weekend 2.
//!
//! Running counts are an accumulator threaded through a fold over periods.
//! Selection is greedy: among the candidates of a rung, those who would not
//! land a mixed back-to-back weekend or overflow the rolling duty window go
//! first, then lowest running count, then roster order.
//!
//! Relaxation ladder, per slot:
//!   1. strict:  available + tier gates + under target
//!   2. relaxed: available + under target (tier gates dropped), flagged
//!   3. missing: slot left empty
//! Availability covers approved leave and the rest rules around nights, so
//! no rung ever bypasses them. The target ceiling is never exceeded either.

use crate::{
    config::{ComplianceConfig, Targets},
    eligibility::{EligibilityContext, FloatEligibility},
    roster::{Roster, Trainee},
    types::{global_week, DutyType, Half, PeriodIndex, TraineeName},
};
use serde::{
    de::{self, Deserializer},
    ser::{SerializeMap, Serializer},
    Deserialize, Serialize,
};
use std::{
    collections::BTreeMap,
    fmt,
    str::FromStr,
};

/// `(period, weekend)`; renders as `"<period>-<weekend>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    pub period:  PeriodIndex,
    pub weekend: Half,
}

impl SlotKey {
    pub fn new(period: PeriodIndex, weekend: Half) -> Self {
        Self { period, weekend }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.period, self.weekend)
    }
}

impl FromStr for SlotKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (p, w) = s
            .split_once('-')
            .ok_or_else(|| format!("slot key '{s}' is not '<period>-<weekend>'"))?;
        let period = p.parse::<PeriodIndex>().map_err(|e| format!("slot key '{s}': {e}"))?;
        let weekend = w
            .parse::<u8>()
            .map_err(|e| format!("slot key '{s}': {e}"))
            .and_then(Half::try_from)?;
        Ok(Self { period, weekend })
    }
}

impl Serialize for SlotKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DutySlot {
    pub trainee: Option<TraineeName>,
    pub relaxed: bool,
}

impl DutySlot {
    pub fn strict(name: impl Into<String>) -> Self {
        Self { trainee: Some(name.into()), relaxed: false }
    }

    pub fn relaxed(name: impl Into<String>) -> Self {
        Self { trainee: Some(name.into()), relaxed: true }
    }

    pub fn missing() -> Self {
        Self::default()
    }

    pub fn is_missing(&self) -> bool {
        self.trainee.is_none()
    }

    pub fn holder(&self) -> Option<&str> {
        self.trainee.as_deref()
    }
}

/// One duty type's weekend slots, keyed by `SlotKey`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DutySchedule {
    slots: BTreeMap<SlotKey, DutySlot>,
}

impl DutySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: SlotKey) -> Option<&DutySlot> {
        self.slots.get(&key)
    }

    pub fn set(&mut self, key: SlotKey, slot: DutySlot) {
        self.slots.insert(key, slot);
    }

    /// Holder of a slot, if filled.
    pub fn holder(&self, period: PeriodIndex, weekend: Half) -> Option<&str> {
        self.slots.get(&SlotKey::new(period, weekend)).and_then(DutySlot::holder)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SlotKey, &DutySlot)> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn missing_slots(&self) -> Vec<SlotKey> {
        self.slots.iter().filter(|(_, s)| s.is_missing()).map(|(k, _)| *k).collect()
    }

    pub fn relaxed_slots(&self) -> Vec<SlotKey> {
        self.slots.iter().filter(|(_, s)| s.relaxed && !s.is_missing()).map(|(k, _)| *k).collect()
    }

    /// Number of slots held by `name`.
    pub fn count_for(&self, name: &str) -> usize {
        self.slots.values().filter(|s| s.holder() == Some(name)).count()
    }

    /// Slots held by `name` in `period`.
    pub fn weekends_held(&self, name: &str, period: PeriodIndex) -> Vec<Half> {
        Half::BOTH
            .into_iter()
            .filter(|&h| self.holder(period, h) == Some(name))
            .collect()
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum SlotValue<'a> {
    Missing,
    Name(&'a str),
    Relaxed { trainee: &'a str, relaxed: bool },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OwnedSlotValue {
    Name(String),
    Tagged {
        trainee: String,
        #[serde(default)]
        relaxed: bool,
    },
}

impl Serialize for DutySchedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.slots.len()))?;
        for (key, slot) in &self.slots {
            let value = match (slot.holder(), slot.relaxed) {
                (None, _)             => SlotValue::Missing,
                (Some(name), false)   => SlotValue::Name(name),
                (Some(name), true)    => SlotValue::Relaxed { trainee: name, relaxed: true },
            };
            map.serialize_entry(&key.to_string(), &value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DutySchedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<SlotKey, Option<OwnedSlotValue>>::deserialize(deserializer)?;
        let slots = raw
            .into_iter()
            .map(|(key, value)| {
                let slot = match value {
                    None => DutySlot::missing(),
                    Some(OwnedSlotValue::Name(n)) => DutySlot::strict(n),
                    Some(OwnedSlotValue::Tagged { trainee, relaxed }) => DutySlot { trainee: Some(trainee), relaxed },
                };
                (key, slot)
            })
            .collect();
        Ok(Self { slots })
    }
}

/// Running call/float counts per trainee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DutyCounts {
    pub call:  BTreeMap<TraineeName, u32>,
    pub float: BTreeMap<TraineeName, u32>,
}

impl DutyCounts {
    fn for_roster(roster: &Roster) -> Self {
        let zeros: BTreeMap<TraineeName, u32> = roster.iter().map(|t| (t.name.clone(), 0)).collect();
        Self { call: zeros.clone(), float: zeros }
    }

    pub fn get(&self, duty: DutyType, name: &str) -> u32 {
        let map = match duty {
            DutyType::Call  => &self.call,
            DutyType::Float => &self.float,
        };
        map.get(name).copied().unwrap_or(0)
    }

    fn bump(&mut self, duty: DutyType, name: &str) {
        let map = match duty {
            DutyType::Call  => &mut self.call,
            DutyType::Float => &mut self.float,
        };
        *map.entry(name.to_string()).or_insert(0) += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Filled with tier gates bypassed.
    Relaxed,
    /// No trainee available even under relaxation.
    Missing,
}

/// A slot the assigner could not fill strictly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentIssue {
    pub duty:    DutyType,
    pub slot:    SlotKey,
    pub kind:    IssueKind,
    pub trainee: Option<TraineeName>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentResult {
    pub call_schedule:  DutySchedule,
    pub float_schedule: DutySchedule,
    pub counts:         DutyCounts,
    pub violations:     Vec<AssignmentIssue>,
}

/// Fill every call and float slot of every period.
/// Never fails: infeasibility shows up as relaxed or missing slots.
pub fn assign(
    roster:  &Roster,
    ctx:     &EligibilityContext<'_>,
    targets: &Targets,
    limits:  &ComplianceConfig,
) -> AssignmentResult {
    let start = AssignmentResult {
        counts: DutyCounts::for_roster(roster),
        ..AssignmentResult::default()
    };

    let result = (0..ctx.calendar.len()).fold(start, |acc, period| {
        assign_period(acc, period, roster, ctx, targets, limits)
    });

    log::debug!(
        "assigned {} call / {} float slots: {} relaxed, {} missing",
        result.call_schedule.len(),
        result.float_schedule.len(),
        result.violations.iter().filter(|v| v.kind == IssueKind::Relaxed).count(),
        result.violations.iter().filter(|v| v.kind == IssueKind::Missing).count(),
    );
    result
}

/// One step of the fold: float pass, then call pass.
pub fn assign_period(
    mut acc: AssignmentResult,
    period:  PeriodIndex,
    roster:  &Roster,
    ctx:     &EligibilityContext<'_>,
    targets: &Targets,
    limits:  &ComplianceConfig,
) -> AssignmentResult {
    let weeks = ctx.calendar.len() * 2;

    for weekend in Half::BOTH {
        let key = SlotKey::new(period, weekend);
        let under = |t: &Trainee, counts: &DutyCounts| counts.get(DutyType::Float, &t.name) < targets.get(&t.name).float;

        let preferred = if weekend == Half::Second {
            roster.iter().find(|&t| {
                ctx.float_available(t, period) == FloatEligibility::Preferred && under(t, &acc.counts)
            })
        } else {
            None
        };

        let slot = match preferred {
            Some(t) => DutySlot::strict(&t.name),
            None => ladder(
                roster,
                |t| ctx.is_eligible_for_float_on(t, period, weekend).is_eligible() && under(t, &acc.counts),
                |t| ctx.float_available_on(t, period, weekend).is_eligible() && under(t, &acc.counts),
                // Night-coverage trainees only take weekend 1 when no day-shift trainee can.
                |t| (
                    ctx.float_available(t, period) == FloatEligibility::Preferred,
                    strains(&acc, &t.name, key, DutyType::Float, limits, weeks),
                    acc.counts.get(DutyType::Float, &t.name),
                ),
            ),
        };
        record(&mut acc, DutyType::Float, key, slot);
    }

    for weekend in Half::BOTH {
        let key = SlotKey::new(period, weekend);
        let float_holder = acc.float_schedule.holder(period, weekend).map(str::to_owned);
        let free = |t: &Trainee, counts: &DutyCounts| {
            counts.get(DutyType::Call, &t.name) < targets.get(&t.name).call
                && float_holder.as_deref() != Some(t.name.as_str())
        };
        let slot = ladder(
            roster,
            |t| ctx.call_available_on(t, period, weekend) && ctx.call_tier_gate(t, period) && free(t, &acc.counts),
            |t| ctx.call_available_on(t, period, weekend) && free(t, &acc.counts),
            |t| (
                strains(&acc, &t.name, key, DutyType::Call, limits, weeks),
                acc.counts.get(DutyType::Call, &t.name),
            ),
        );
        record(&mut acc, DutyType::Call, key, slot);
    }

    acc
}

/// Strict pick, then relaxed pick, then missing. Within a rung the lowest
/// rank wins; `min_by_key` keeps the first minimum, so ties fall to roster
/// order.
fn ladder<R: Ord>(
    roster:  &Roster,
    strict:  impl Fn(&Trainee) -> bool,
    relaxed: impl Fn(&Trainee) -> bool,
    rank:    impl Fn(&Trainee) -> R,
) -> DutySlot {
    if let Some(t) = roster.iter().filter(|&t| strict(t)).min_by_key(|&t| rank(t)) {
        return DutySlot::strict(&t.name);
    }
    if let Some(t) = roster.iter().filter(|&t| relaxed(t)).min_by_key(|&t| rank(t)) {
        return DutySlot::relaxed(&t.name);
    }
    DutySlot::missing()
}

/// (call, float) held by `name` on a global weekend index.
fn held(acc: &AssignmentResult, name: &str, week: usize) -> (bool, bool) {
    let (period, weekend) = (week / 2, if week % 2 == 0 { Half::First } else { Half::Second });
    (
        acc.call_schedule.holder(period, weekend) == Some(name),
        acc.float_schedule.holder(period, weekend) == Some(name),
    )
}

fn mixed(a: (bool, bool), b: (bool, bool)) -> bool {
    (a.0 && b.1 && !a.1) || (a.1 && b.0 && !a.0)
}

/// Would handing `duty` on `key` to `name` put a call and a float on
/// consecutive weekends, or push any rolling window past its limit?
/// Soft: it only ranks candidates, it never empties a slot.
fn strains(
    acc:    &AssignmentResult,
    name:   &str,
    key:    SlotKey,
    duty:   DutyType,
    limits: &ComplianceConfig,
    weeks:  usize,
) -> bool {
    let week = global_week(key.period, key.weekend);
    let current = held(acc, name, week);
    let after = match duty {
        DutyType::Call  => (true, current.1),
        DutyType::Float => (current.0, true),
    };

    if week > 0 && mixed(held(acc, name, week - 1), after) {
        return true;
    }
    if week + 1 < weeks && mixed(after, held(acc, name, week + 1)) {
        return true;
    }
    if current.0 || current.1 {
        return false;
    }

    let window = limits.frequency_window_weekends.max(1);
    ((week + 1).saturating_sub(window)..=week)
        .take_while(|&first| first + window <= weeks)
        .any(|first| {
            let busy = (first..first + window)
                .filter(|&w| {
                    let (call, float) = held(acc, name, w);
                    w == week || call || float
                })
                .count();
            busy > limits.max_duties_per_window
        })
}

fn record(acc: &mut AssignmentResult, duty: DutyType, key: SlotKey, slot: DutySlot) {
    match (&slot.trainee, slot.relaxed) {
        (Some(name), relaxed) => {
            acc.counts.bump(duty, name);
            if relaxed {
                log::warn!("{} {key}: relaxed assignment to {name}", duty.name());
                acc.violations.push(AssignmentIssue {
                    duty,
                    slot: key,
                    kind: IssueKind::Relaxed,
                    trainee: Some(name.clone()),
                });
            } else {
                log::trace!("{} {key}: {name}", duty.name());
            }
        }
        (None, _) => {
            log::warn!("{} {key}: MISSING", duty.name());
            acc.violations.push(AssignmentIssue {
                duty,
                slot: key,
                kind: IssueKind::Missing,
                trainee: None,
            });
        }
    }
    let schedule = match duty {
        DutyType::Call  => &mut acc.call_schedule,
        DutyType::Float => &mut acc.float_schedule,
    };
    schedule.set(key, slot);
}
