//! Time-partition layout primitives.
//!
//! A partition is a physically distinct sub-table holding the rows of one
//! contiguous time period. Descriptors produced here are always contiguous,
//! non-overlapping, and cover exactly the requested range.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

pub mod provisioner;

pub use provisioner::{
    PartitionDdl, PartitionProvisioner, ProvisionFailure, ProvisionOutcome,
};

/// Granularity of one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    Day,
    Week,
    Month,
}

impl PeriodUnit {
    /// Start of the period following `start`, or `None` past the calendar
    /// range chrono can represent.
    pub fn advance(&self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            PeriodUnit::Day => start.checked_add_days(Days::new(1)),
            PeriodUnit::Week => start.checked_add_days(Days::new(7)),
            PeriodUnit::Month => start.checked_add_months(Months::new(1)),
        }
    }

    /// Snap a date down to the start of the period containing it.
    pub fn align(&self, date: NaiveDate) -> NaiveDate {
        match self {
            PeriodUnit::Day => date,
            PeriodUnit::Week => {
                let back = date.weekday().num_days_from_monday() as u64;
                date.checked_sub_days(Days::new(back)).unwrap_or(date)
            }
            PeriodUnit::Month => date.with_day(1).unwrap_or(date),
        }
    }
}

impl std::str::FromStr for PeriodUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(PeriodUnit::Day),
            "week" => Ok(PeriodUnit::Week),
            "month" => Ok(PeriodUnit::Month),
            other => Err(format!("unknown period unit '{other}'")),
        }
    }
}

/// One provisioned partition: a half-open period `[period_start, period_end)`
/// and the deterministic name of its backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionDescriptor {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub partition_name: String,
}

/// Deterministic partition name derived from the period start, e.g.
/// `viewing_events_2026_08` for a month partition of `viewing_events`.
pub fn partition_name(table: &str, unit: PeriodUnit, period_start: NaiveDate) -> String {
    match unit {
        PeriodUnit::Month => format!(
            "{}_{:04}_{:02}",
            table,
            period_start.year(),
            period_start.month()
        ),
        PeriodUnit::Day | PeriodUnit::Week => format!(
            "{}_{:04}_{:02}_{:02}",
            table,
            period_start.year(),
            period_start.month(),
            period_start.day()
        ),
    }
}

/// Smallest aligned `(start, period_count)` range covering `[min, max]`.
///
/// Used to derive a provisioning range from observed data instead of asking
/// the operator to compute period boundaries by hand.
pub fn covering_range(min: NaiveDate, max: NaiveDate, unit: PeriodUnit) -> (NaiveDate, u32) {
    let start = unit.align(min);
    let mut count = 0u32;
    let mut cursor = start;
    while cursor <= max {
        count += 1;
        match unit.advance(cursor) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    (start, count.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_names_use_year_month() {
        assert_eq!(
            partition_name("viewing_events", PeriodUnit::Month, date(2026, 8, 1)),
            "viewing_events_2026_08"
        );
    }

    #[test]
    fn day_names_include_day() {
        assert_eq!(
            partition_name("viewing_events", PeriodUnit::Day, date(2026, 8, 7)),
            "viewing_events_2026_08_07"
        );
    }

    #[test]
    fn month_advance_handles_year_wrap() {
        assert_eq!(
            PeriodUnit::Month.advance(date(2025, 12, 1)),
            Some(date(2026, 1, 1))
        );
    }

    #[test]
    fn align_snaps_to_month_start() {
        assert_eq!(PeriodUnit::Month.align(date(2026, 8, 19)), date(2026, 8, 1));
    }

    #[test]
    fn align_snaps_to_week_monday() {
        // 2026-08-07 is a Friday
        assert_eq!(PeriodUnit::Week.align(date(2026, 8, 7)), date(2026, 8, 3));
    }

    #[test]
    fn covering_range_spans_min_to_max() {
        let (start, count) = covering_range(date(2026, 6, 15), date(2026, 8, 7), PeriodUnit::Month);
        assert_eq!(start, date(2026, 6, 1));
        assert_eq!(count, 3);
    }

    #[test]
    fn covering_range_single_point() {
        let (start, count) = covering_range(date(2026, 8, 7), date(2026, 8, 7), PeriodUnit::Day);
        assert_eq!(start, date(2026, 8, 7));
        assert_eq!(count, 1);
    }
}
