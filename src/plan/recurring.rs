//! Recurring maintenance (PM01/PM03) cost forecast.
//!
//! Each unit's history in a category is reduced to a monthly run rate:
//! total cost divided by the number of calendar months the history spans
//! (inclusive). The rate is then laid out month by month from the month after
//! the as-of date through the month containing the end-of-life date.

use chrono::{Datelike, Months, NaiveDate};

use crate::domain::RecurringForecastRow;
use crate::plan::costs::CostSummary;

/// Monthly forecast rows for every unit and recurring category with history.
///
/// Units without history in a category produce no rows for it.
pub fn forecast_recurring(
    summaries: &[CostSummary],
    unit_ids: &[String],
    as_of: NaiveDate,
    eol: NaiveDate,
) -> Vec<RecurringForecastRow> {
    let months = forecast_months(as_of, eol);
    if months.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    for unit_id in unit_ids {
        for summary in summaries {
            let Some(rate) = monthly_rate(summary, unit_id) else {
                continue;
            };
            out.extend(months.iter().map(|&month| RecurringForecastRow {
                unit_id: unit_id.clone(),
                category: summary.category,
                month,
                amount: rate,
            }));
        }
    }
    out
}

/// Average monthly cost of `unit_id` in the summary's category.
pub fn monthly_rate(summary: &CostSummary, unit_id: &str) -> Option<f64> {
    let mut costs = Vec::new();
    let mut first: Option<NaiveDate> = None;
    let mut last: Option<NaiveDate> = None;
    for r in summary.rows.iter().filter(|r| r.unit_id == unit_id) {
        costs.push(r.cost);
        first = Some(first.map_or(r.date, |d| d.min(r.date)));
        last = Some(last.map_or(r.date, |d| d.max(r.date)));
    }
    let (first, last) = (first?, last?);

    costs.sort_by(f64::total_cmp);
    let total: f64 = costs.iter().sum();
    let months = months_spanned(first, last);
    Some(total / months as f64)
}

/// Calendar months touched by `[first, last]`, counting both ends.
fn months_spanned(first: NaiveDate, last: NaiveDate) -> u32 {
    let diff = (last.year() - first.year()) * 12 + last.month() as i32 - first.month() as i32;
    (diff.max(0) + 1) as u32
}

/// Month starts after the as-of month, through the month containing `eol`.
fn forecast_months(as_of: NaiveDate, eol: NaiveDate) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let (Some(as_of_month), Some(eol_month)) = (month_start(as_of), month_start(eol)) else {
        return out;
    };

    let mut month = as_of_month.checked_add_months(Months::new(1));
    while let Some(m) = month {
        if m > eol_month {
            break;
        }
        out.push(m);
        month = m.checked_add_months(Months::new(1));
    }
    out
}

fn month_start(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)
}
