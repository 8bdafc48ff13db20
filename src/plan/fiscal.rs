//! Fiscal-year bucketing.
//!
//! A fiscal year starts on a fixed month-day and is labelled by the calendar
//! year in which it **ends**: with a July 1 start, `FY2027` runs from
//! 2026-07-01 to 2027-06-30. A January 1 start makes labels equal calendar years.
//!
//! Aggregations always cover a contiguous run of fiscal years, zero-filled.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use chrono::{Datelike, Days, NaiveDate};

use crate::domain::{
    FiscalYearTotal, RecurringForecastRow, RecurringOverviewRow, ReplacementEvent, ReplacementOverviewRow,
    WorkOrderCategory,
};
use crate::error::PlanError;

/// Fiscal-year boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiscalCalendar {
    start_month: u32,
    start_day: u32,
}

impl Default for FiscalCalendar {
    fn default() -> Self {
        Self {
            start_month: 7,
            start_day: 1,
        }
    }
}

impl FiscalCalendar {
    /// A calendar whose years start on `month`-`day`.
    ///
    /// The start must exist in every year, so February 29 is rejected.
    pub fn new(month: u32, day: u32) -> Result<Self, PlanError> {
        let exists = NaiveDate::from_ymd_opt(2001, month, day).is_some();
        if !exists {
            return Err(PlanError::validation(
                "Parameters",
                format!("Invalid fiscal year start {month:02}-{day:02} (must be a day that exists every year)."),
            ));
        }
        Ok(Self {
            start_month: month,
            start_day: day,
        })
    }

    fn starts_on_new_year(&self) -> bool {
        self.start_month == 1 && self.start_day == 1
    }

    /// Fiscal year (by end-year label) containing `date`.
    pub fn year_of(&self, date: NaiveDate) -> i32 {
        if self.starts_on_new_year() {
            return date.year();
        }
        if (date.month(), date.day()) >= (self.start_month, self.start_day) {
            date.year() + 1
        } else {
            date.year()
        }
    }

    /// First and last day of fiscal year `fy`.
    pub fn bounds(&self, fy: i32) -> (NaiveDate, NaiveDate) {
        let start = self.start_of(fy);
        let next = self.start_of(fy + 1);
        let end = next.checked_sub_days(Days::new(1)).unwrap_or(next);
        (start, end)
    }

    fn start_of(&self, fy: i32) -> NaiveDate {
        let year = if self.starts_on_new_year() { fy } else { fy - 1 };
        NaiveDate::from_ymd_opt(year, self.start_month, self.start_day).unwrap_or(NaiveDate::MIN)
    }

    pub fn label(fy: i32) -> String {
        format!("FY{fy}")
    }

    /// Fiscal years from the earliest of `dates`/`anchor` through the later of
    /// `horizon` and the latest date.
    pub fn span<I>(&self, dates: I, anchor: Option<NaiveDate>, horizon: NaiveDate) -> RangeInclusive<i32>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut first = anchor.map(|d| self.year_of(d));
        let mut last = self.year_of(horizon);
        for d in dates {
            let fy = self.year_of(d);
            first = Some(first.map_or(fy, |f| f.min(fy)));
            last = last.max(fy);
        }
        let first = first.unwrap_or(last).min(last);
        first..=last
    }
}

/// Sum `dated_values` per fiscal year.
///
/// One row per fiscal year from the earliest value (or `anchor`, if earlier)
/// through the fiscal year containing `horizon`, with zero rows for years
/// without values.
pub fn aggregate(
    dated_values: &[(NaiveDate, f64)],
    calendar: &FiscalCalendar,
    anchor: Option<NaiveDate>,
    horizon: NaiveDate,
) -> Vec<FiscalYearTotal> {
    let span = calendar.span(dated_values.iter().map(|(d, _)| *d), anchor, horizon);
    let mut buckets = bucket(dated_values.iter().copied(), calendar);

    span.map(|fy| {
        let (start, end) = calendar.bounds(fy);
        FiscalYearTotal {
            fiscal_year: FiscalCalendar::label(fy),
            start,
            end,
            amount: buckets.get_mut(&fy).map(|v| stable_sum(v)).unwrap_or(0.0),
        }
    })
    .collect()
}

/// PM02 overview for one scenario: replacement count and cost per fiscal year.
pub fn replacement_overview(
    events: &[ReplacementEvent],
    calendar: &FiscalCalendar,
    anchor: Option<NaiveDate>,
    horizon: NaiveDate,
) -> Vec<ReplacementOverviewRow> {
    let values: Vec<(NaiveDate, f64)> = events.iter().map(|e| (e.date, e.cost)).collect();
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for e in events {
        *counts.entry(calendar.year_of(e.date)).or_default() += 1;
    }

    aggregate(&values, calendar, anchor, horizon)
        .into_iter()
        .map(|total| {
            let fy = calendar.year_of(total.start);
            ReplacementOverviewRow {
                fiscal_year: total.fiscal_year,
                start: total.start,
                end: total.end,
                replacements: counts.get(&fy).copied().unwrap_or(0),
                cost: total.amount,
            }
        })
        .collect()
}

/// PM01/PM03 overview: recurring cost per category and fiscal year.
pub fn recurring_overview(
    forecast: &[RecurringForecastRow],
    calendar: &FiscalCalendar,
    anchor: Option<NaiveDate>,
    horizon: NaiveDate,
) -> Vec<RecurringOverviewRow> {
    let span = calendar.span(forecast.iter().map(|r| r.month), anchor, horizon);
    let of = |category: WorkOrderCategory| -> Vec<FiscalYearTotal> {
        let values: Vec<(NaiveDate, f64)> = forecast
            .iter()
            .filter(|r| r.category == category)
            .map(|r| (r.month, r.amount))
            .collect();
        // Both categories share the span so their rows line up.
        let (span_start, _) = calendar.bounds(*span.start());
        aggregate(&values, calendar, Some(span_start), horizon)
    };

    let pm01 = of(WorkOrderCategory::Pm01);
    let pm03 = of(WorkOrderCategory::Pm03);

    pm01.into_iter()
        .zip(pm03)
        .map(|(a, b)| RecurringOverviewRow {
            fiscal_year: a.fiscal_year,
            start: a.start,
            end: a.end,
            pm01: a.amount,
            pm03: b.amount,
            total: a.amount + b.amount,
        })
        .collect()
}

fn bucket<I>(values: I, calendar: &FiscalCalendar) -> BTreeMap<i32, Vec<f64>>
where
    I: IntoIterator<Item = (NaiveDate, f64)>,
{
    let mut out: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for (date, amount) in values {
        out.entry(calendar.year_of(date)).or_default().push(amount);
    }
    out
}

fn stable_sum(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    values.iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn july_start_labels_by_end_year() {
        let cal = FiscalCalendar::default();
        assert_eq!(cal.year_of(ymd(2026, 6, 30)), 2026);
        assert_eq!(cal.year_of(ymd(2026, 7, 1)), 2027);
        assert_eq!(cal.year_of(ymd(2027, 6, 30)), 2027);
        assert_eq!(cal.bounds(2027), (ymd(2026, 7, 1), ymd(2027, 6, 30)));
    }

    #[test]
    fn january_start_matches_calendar_years() {
        let cal = FiscalCalendar::new(1, 1).unwrap();
        assert_eq!(cal.year_of(ymd(2025, 1, 1)), 2025);
        assert_eq!(cal.year_of(ymd(2025, 12, 31)), 2025);
        assert_eq!(cal.bounds(2025), (ymd(2025, 1, 1), ymd(2025, 12, 31)));
    }

    #[test]
    fn october_start_bounds() {
        let cal = FiscalCalendar::new(10, 1).unwrap();
        assert_eq!(cal.year_of(ymd(2024, 9, 30)), 2024);
        assert_eq!(cal.year_of(ymd(2024, 10, 1)), 2025);
        assert_eq!(cal.bounds(2025), (ymd(2024, 10, 1), ymd(2025, 9, 30)));
    }

    #[test]
    fn invalid_starts_are_rejected() {
        assert!(FiscalCalendar::new(2, 29).is_err());
        assert!(FiscalCalendar::new(13, 1).is_err());
        assert!(FiscalCalendar::new(4, 31).is_err());
    }

    #[test]
    fn aggregate_zero_fills_without_gaps() {
        let cal = FiscalCalendar::default();
        let values = vec![
            (ymd(2024, 8, 15), 100.0),
            (ymd(2025, 2, 1), 50.0),
            (ymd(2026, 9, 1), 25.0),
        ];

        let rows = aggregate(&values, &cal, None, ymd(2027, 6, 30));

        let labels: Vec<&str> = rows.iter().map(|r| r.fiscal_year.as_str()).collect();
        assert_eq!(labels, vec!["FY2025", "FY2026", "FY2027"]);
        let amounts: Vec<f64> = rows.iter().map(|r| r.amount).collect();
        assert_eq!(amounts, vec![150.0, 0.0, 25.0]);
    }

    #[test]
    fn aggregate_with_no_values_spans_anchor_to_horizon() {
        let cal = FiscalCalendar::default();
        let rows = aggregate(&[], &cal, Some(ymd(2024, 1, 1)), ymd(2027, 6, 30));
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.amount == 0.0));

        let rows = aggregate(&[], &cal, None, ymd(2027, 6, 30));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fiscal_year, "FY2027");
    }

    #[test]
    fn replacement_overview_counts_events() {
        let cal = FiscalCalendar::default();
        let event = |date: NaiveDate, cost: f64| ReplacementEvent {
            scenario: "Scenario 1".to_string(),
            unit_id: "DT101".to_string(),
            sequence: 1,
            target_hours: 0.0,
            date,
            cost,
        };
        let events = vec![event(ymd(2025, 7, 2), 10.0), event(ymd(2026, 3, 1), 20.0)];

        let rows = replacement_overview(&events, &cal, Some(ymd(2024, 1, 1)), ymd(2027, 6, 30));

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[2].fiscal_year, "FY2026");
        assert_eq!(rows[2].replacements, 2);
        assert_eq!(rows[2].cost, 30.0);
        assert_eq!(rows[0].replacements, 0);
    }

    #[test]
    fn recurring_overview_lines_up_categories() {
        let cal = FiscalCalendar::default();
        let row = |category, month: NaiveDate, amount| RecurringForecastRow {
            unit_id: "DT101".to_string(),
            category,
            month,
            amount,
        };
        let forecast = vec![
            row(WorkOrderCategory::Pm01, ymd(2025, 8, 1), 10.0),
            row(WorkOrderCategory::Pm03, ymd(2026, 8, 1), 5.0),
        ];

        let rows = recurring_overview(&forecast, &cal, None, ymd(2027, 6, 30));

        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].pm01, rows[0].pm03, rows[0].total), (10.0, 0.0, 10.0));
        assert_eq!((rows[1].pm01, rows[1].pm03, rows[1].total), (0.0, 5.0, 5.0));
    }
}
