//! Counter trend fitting for a whole fleet.
//!
//! Responsibilities:
//!
//! - group counter readings by unit
//! - clean and fit each unit's trend (parallel)
//! - build the counter summary table and record units that cannot be scheduled

pub mod trend;

pub use trend::*;

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::warn;

use crate::domain::{CounterSample, CounterStatus, CounterSummaryRow, UnitGap};
use crate::error::PlanError;

/// Output of fitting every unit of a fleet.
#[derive(Debug, Clone, Default)]
pub struct FleetTrends {
    /// Projector per unit that could be fitted.
    pub trends: HashMap<String, CounterTrend>,
    /// One row per requested unit, in request order.
    pub summary: Vec<CounterSummaryRow>,
    /// Units without a usable trend.
    pub gaps: Vec<UnitGap>,
}

/// Fit counter trends for `unit_ids`.
///
/// Units with too little data are skipped and recorded as gaps; they never
/// fail the run.
pub fn fit_fleet(unit_ids: &[String], samples: &[CounterSample]) -> FleetTrends {
    let mut by_unit: HashMap<&str, Vec<&CounterSample>> = HashMap::new();
    for s in samples {
        by_unit.entry(s.unit_id.as_str()).or_default().push(s);
    }

    let results: Vec<(CounterSummaryRow, Result<CounterTrend, PlanError>)> = unit_ids
        .par_iter()
        .map(|unit_id| {
            let readings = by_unit.get(unit_id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            fit_unit(unit_id, readings)
        })
        .collect();

    let mut out = FleetTrends::default();
    for (row, result) in results {
        match result {
            Ok(trend) => {
                if trend.is_stalled() {
                    out.gaps.push(UnitGap {
                        unit_id: trend.unit_id.clone(),
                        reason: "counter is not accruing hours".to_string(),
                    });
                }
                out.trends.insert(trend.unit_id.clone(), trend);
            }
            Err(err) => {
                warn!(unit = %row.unit_id, "skipping unit: {err}");
                out.gaps.push(UnitGap {
                    unit_id: row.unit_id.clone(),
                    reason: err.to_string(),
                });
            }
        }
        out.summary.push(row);
    }
    out
}

fn fit_unit(unit_id: &str, readings: &[&CounterSample]) -> (CounterSummaryRow, Result<CounterTrend, PlanError>) {
    let series = clean_samples(readings);
    let result = CounterTrend::fit(unit_id, &series);

    let status = match &result {
        Ok(trend) if trend.is_stalled() => CounterStatus::Stalled,
        Ok(_) => CounterStatus::Ok,
        Err(_) if readings.is_empty() => CounterStatus::NoSamples,
        Err(_) => CounterStatus::InsufficientData,
    };

    let row = CounterSummaryRow {
        unit_id: unit_id.to_string(),
        samples_used: series.points.len(),
        samples_dropped: series.dropped,
        first_date: series.points.first().map(|(d, _)| *d),
        last_date: series.points.last().map(|(d, _)| *d),
        last_hours: series.points.last().map(|(_, h)| *h),
        hours_per_day: result.as_ref().ok().map(|t| t.rate_per_day),
        status,
    };
    (row, result)
}
