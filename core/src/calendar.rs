//! Period calendar: the fixed, contiguous blocks the program year is cut into.

use crate::{
    error::{EngineError, EngineResult},
    types::{ClinicDay, Half, PeriodIndex},
};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end:   NaiveDate,
    /// Parent rotation-cycle number.
    pub cycle: u32,
}

impl Period {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// First day of week `half` within this period.
    pub fn week_start(&self, half: Half) -> NaiveDate {
        self.start + Duration::days(7 * half.week_offset() as i64)
    }

    /// Saturday of weekend `half`: the n-th Saturday on or after period start.
    pub fn weekend_date(&self, half: Half) -> NaiveDate {
        next_weekday(self.week_start(half), Weekday::Sat)
    }

    /// Date of the clinic session for `day` (1 = Monday .. 5 = Friday) in
    /// week `half`. None when the trainee has no clinic.
    pub fn clinic_date(&self, half: Half, day: ClinicDay) -> Option<NaiveDate> {
        let weekday = clinic_weekday(day)?;
        Some(next_weekday(self.week_start(half), weekday))
    }
}

/// Ordered, contiguous list of periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Period>", into = "Vec<Period>")]
pub struct PeriodCalendar {
    periods: Vec<Period>,
}

impl PeriodCalendar {
    /// Validate ordering and contiguity. Each period must start the day
    /// after its predecessor ends.
    pub fn new(periods: Vec<Period>) -> EngineResult<Self> {
        if periods.is_empty() {
            return Err(EngineError::EmptyCalendar);
        }
        for (i, p) in periods.iter().enumerate() {
            if p.end < p.start {
                return Err(EngineError::InvalidPeriod {
                    period: i,
                    reason: format!("ends {} before it starts {}", p.end, p.start),
                });
            }
            if i > 0 {
                let prev = &periods[i - 1];
                if p.start != prev.end + Duration::days(1) {
                    return Err(EngineError::InvalidPeriod {
                        period: i,
                        reason: format!("starts {} but previous period ends {}", p.start, prev.end),
                    });
                }
            }
        }
        Ok(Self { periods })
    }

    /// Build `count` back-to-back periods of `days` each, starting at `start`.
    /// Cycles advance every `periods_per_cycle` periods.
    pub fn uniform(start: NaiveDate, count: usize, days: i64, periods_per_cycle: usize) -> EngineResult<Self> {
        let per_cycle = periods_per_cycle.max(1);
        let periods = (0..count)
            .map(|i| {
                let s = start + Duration::days(days * i as i64);
                Period {
                    start: s,
                    end:   s + Duration::days(days - 1),
                    cycle: (i / per_cycle) as u32 + 1,
                }
            })
            .collect();
        Self::new(periods)
    }

    pub fn len(&self) -> usize { self.periods.len() }

    pub fn is_empty(&self) -> bool { self.periods.is_empty() }

    pub fn get(&self, index: PeriodIndex) -> Option<&Period> { self.periods.get(index) }

    pub fn iter(&self) -> impl Iterator<Item = (PeriodIndex, &Period)> {
        self.periods.iter().enumerate()
    }

    /// Period containing `date`, if any.
    pub fn period_of(&self, date: NaiveDate) -> Option<PeriodIndex> {
        self.periods.iter().position(|p| p.contains(date))
    }
}

impl TryFrom<Vec<Period>> for PeriodCalendar {
    type Error = EngineError;

    fn try_from(periods: Vec<Period>) -> Result<Self, Self::Error> {
        Self::new(periods)
    }
}

impl From<PeriodCalendar> for Vec<Period> {
    fn from(c: PeriodCalendar) -> Self { c.periods }
}

fn clinic_weekday(day: ClinicDay) -> Option<Weekday> {
    match day {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        _ => None,
    }
}

fn next_weekday(from: NaiveDate, target: Weekday) -> NaiveDate {
    let ahead = (7 + target.num_days_from_monday() as i64
        - from.weekday().num_days_from_monday() as i64) % 7;
    from + Duration::days(ahead)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn weekend_dates_are_saturdays() {
        // 2025-07-01 is a Tuesday.
        let cal = PeriodCalendar::uniform(d(2025, 7, 1), 2, 14, 2).unwrap();
        let p = cal.get(0).unwrap();
        assert_eq!(p.weekend_date(Half::First), d(2025, 7, 5));
        assert_eq!(p.weekend_date(Half::Second), d(2025, 7, 12));
        assert_eq!(p.clinic_date(Half::First, 1), Some(d(2025, 7, 7)));
        assert_eq!(p.clinic_date(Half::Second, 2), Some(d(2025, 7, 8)));
        assert_eq!(p.clinic_date(Half::First, 0), None);
    }

    #[test]
    fn gap_between_periods_is_rejected() {
        let periods = vec![
            Period { start: d(2025, 7, 1), end: d(2025, 7, 14), cycle: 1 },
            Period { start: d(2025, 7, 16), end: d(2025, 7, 29), cycle: 1 },
        ];
        assert!(matches!(
            PeriodCalendar::new(periods),
            Err(EngineError::InvalidPeriod { period: 1, .. })
        ));
    }

    #[test]
    fn cycles_advance() {
        let cal = PeriodCalendar::uniform(d(2025, 7, 1), 4, 14, 2).unwrap();
        let cycles: Vec<u32> = cal.iter().map(|(_, p)| p.cycle).collect();
        assert_eq!(cycles, vec![1, 1, 2, 2]);
        assert_eq!(cal.period_of(d(2025, 7, 20)), Some(1));
    }
}
