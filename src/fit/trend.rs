//! Counter trend extrapolation for a single unit.
//!
//! Given a unit's `(timestamp, cumulative hours)` readings we:
//! - clean the series (sort, drop readings below the running maximum, one point per day)
//! - fit `hours = a + b * days` by least squares
//! - project the calendar date at which any target hour value is reached
//!
//! Projection is anchored on the last clean reading, not on the fitted line,
//! so a forecast never starts below what the meter has already shown.

use chrono::{Days, NaiveDate};

use crate::domain::CounterSample;
use crate::error::PlanError;
use crate::math::fit_line;

/// Projections further out than this are treated as unreachable.
const MAX_PROJECTION_DAYS: f64 = 1_000_000.0;

/// Fitted slopes at or below this (hours/day) count as a stalled meter.
const MIN_RATE_PER_DAY: f64 = 1e-9;

/// Day counts within this of a whole day are not rounded up to the next one.
const DAY_ROUNDING_SLACK: f64 = 1e-6;

/// A unit's readings after cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanSeries {
    /// One `(date, hours)` point per day, strictly increasing in date and
    /// non-decreasing in hours.
    pub points: Vec<(NaiveDate, f64)>,
    /// Readings discarded as anomalies (decreasing, negative or non-finite).
    pub dropped: usize,
}

/// Clean raw readings for one unit.
///
/// Readings are ordered by timestamp. A reading below the running maximum is a
/// meter anomaly and is dropped rather than turned into a negative rate.
/// Several readings on the same day collapse to the highest one.
pub fn clean_samples(samples: &[&CounterSample]) -> CleanSeries {
    let mut ordered: Vec<&CounterSample> = samples.to_vec();
    ordered.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then(a.hours.partial_cmp(&b.hours).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut points: Vec<(NaiveDate, f64)> = Vec::with_capacity(ordered.len());
    let mut dropped = 0usize;
    let mut running_max = f64::NEG_INFINITY;

    for s in ordered {
        if !s.hours.is_finite() || s.hours < 0.0 || s.hours < running_max {
            dropped += 1;
            continue;
        }
        running_max = s.hours;

        let date = s.timestamp.date();
        match points.last_mut() {
            Some((last_date, last_hours)) if *last_date == date => *last_hours = s.hours,
            _ => points.push((date, s.hours)),
        }
    }

    CleanSeries { points, dropped }
}

/// Fitted counter trend for one unit.
///
/// This is the projector handed to the scheduler: pure and reusable for any
/// number of `project` calls.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterTrend {
    pub unit_id: String,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub last_hours: f64,
    /// Fitted accrual rate. Zero or negative means the meter is stalled.
    pub rate_per_day: f64,
    pub samples_used: usize,
    pub samples_dropped: usize,
}

impl CounterTrend {
    /// Fit a trend from a cleaned series.
    ///
    /// Fails with `InsufficientData` when fewer than two distinct days remain.
    pub fn fit(unit_id: &str, series: &CleanSeries) -> Result<Self, PlanError> {
        let n = series.points.len();
        if n < 2 {
            return Err(PlanError::InsufficientData {
                unit: unit_id.to_string(),
                detail: format!("{n} usable reading(s), at least 2 required"),
            });
        }

        let (first_date, _) = series.points[0];
        let (last_date, last_hours) = series.points[n - 1];

        let days: Vec<f64> = series
            .points
            .iter()
            .map(|(d, _)| (*d - first_date).num_days() as f64)
            .collect();
        let hours: Vec<f64> = series.points.iter().map(|(_, h)| *h).collect();

        let line = fit_line(&days, &hours).ok_or_else(|| PlanError::InsufficientData {
            unit: unit_id.to_string(),
            detail: "counter trend could not be fitted".to_string(),
        })?;

        // Cleaning guarantees non-decreasing hours, so a non-positive slope can
        // only come from a flat meter or numerical noise. Either way: no accrual.
        let rate_per_day = if line.slope.is_finite() && line.slope > MIN_RATE_PER_DAY {
            line.slope
        } else {
            0.0
        };

        Ok(Self {
            unit_id: unit_id.to_string(),
            first_date,
            last_date,
            last_hours,
            rate_per_day,
            samples_used: n,
            samples_dropped: series.dropped,
        })
    }

    pub fn is_stalled(&self) -> bool {
        self.rate_per_day <= 0.0
    }

    /// Date at which the counter reaches `target_hours`.
    ///
    /// - targets at or below the last reading were already reached on the last reading's date
    /// - otherwise extrapolate forward from the last reading, rounding up to whole days
    /// - `None` when the meter is stalled or the date is out of range
    pub fn project(&self, target_hours: f64) -> Option<NaiveDate> {
        if target_hours <= self.last_hours {
            return Some(self.last_date);
        }
        if self.is_stalled() || !target_hours.is_finite() {
            return None;
        }

        // Floating-point noise in the slope must not push a whole day to the next.
        let days = ((target_hours - self.last_hours) / self.rate_per_day - DAY_ROUNDING_SLACK).ceil();
        if !days.is_finite() || days > MAX_PROJECTION_DAYS {
            return None;
        }
        self.last_date.checked_add_days(Days::new(days.max(1.0) as u64))
    }
}
