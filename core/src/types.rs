//! Shared primitive types used across the entire engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A trainee's unique name. Names are the roster's primary key.
pub type TraineeName = String;

/// 0-based index into the period calendar and every grid row.
pub type PeriodIndex = usize;

/// Program-year ordinal (e.g. 4, 5, 6). Lower is more junior.
pub type Tier = u8;

/// Clinic weekday: 0 = no clinic, 1 = Monday .. 5 = Friday.
pub type ClinicDay = u8;

/// Which of a period's two weekends (or weeks) a slot falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Half {
    First,
    Second,
}

impl Half {
    pub const BOTH: [Half; 2] = [Half::First, Half::Second];

    /// 1 or 2, as used in slot keys.
    pub fn number(self) -> u8 {
        match self {
            Half::First  => 1,
            Half::Second => 2,
        }
    }

    /// Offset in whole weeks from the start of the period.
    pub fn week_offset(self) -> usize {
        self.number() as usize - 1
    }
}

impl TryFrom<u8> for Half {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Half::First),
            2 => Ok(Half::Second),
            other => Err(format!("weekend/week must be 1 or 2, got {other}")),
        }
    }
}

impl From<Half> for u8 {
    fn from(h: Half) -> u8 { h.number() }
}

impl fmt::Display for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// The two weekend duty types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DutyType {
    Call,
    Float,
}

impl DutyType {
    pub fn name(self) -> &'static str {
        match self {
            DutyType::Call  => "call",
            DutyType::Float => "float",
        }
    }
}

/// Global week number across the whole program year.
/// Consecutive weeks differ by exactly one, including across period boundaries.
pub fn global_week(period: PeriodIndex, half: Half) -> usize {
    period * 2 + half.week_offset()
}
