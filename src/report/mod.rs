//! Reporting utilities: currency formatting and terminal output.

pub mod format;

pub use format::*;

use std::collections::BTreeMap;

use crate::app::pipeline::PlanOutput;
use crate::domain::{
    CostRecord, FiscalYearTotal, RecurringForecastRow, RecurringOverviewRow, ReplacementEvent, ReplacementOverviewRow,
    ScenarioOverview, ScenarioSchedule, StrategyDataRow, UnitWorkOrderRow, WorkOrderAverage,
};
use crate::error::AppError;
use crate::plan::CostSummary;

/// Round to cents, ties to even. Non-finite values pass through.
pub fn round_currency(v: f64) -> f64 {
    if !v.is_finite() {
        return v;
    }
    (v * 100.0).round_ties_even() / 100.0
}

/// Round every monetary column of a table; other columns are untouched.
pub trait FormatCurrency: Sized {
    fn format_currency(self) -> Self;
}

impl<T: FormatCurrency> FormatCurrency for Vec<T> {
    fn format_currency(self) -> Self {
        self.into_iter().map(FormatCurrency::format_currency).collect()
    }
}

impl FormatCurrency for ReplacementEvent {
    fn format_currency(mut self) -> Self {
        self.cost = round_currency(self.cost);
        self
    }
}

impl FormatCurrency for ScenarioSchedule {
    fn format_currency(mut self) -> Self {
        self.events = self.events.format_currency();
        self
    }
}

impl FormatCurrency for FiscalYearTotal {
    fn format_currency(mut self) -> Self {
        self.amount = round_currency(self.amount);
        self
    }
}

impl FormatCurrency for ReplacementOverviewRow {
    fn format_currency(mut self) -> Self {
        self.cost = round_currency(self.cost);
        self
    }
}

impl FormatCurrency for RecurringOverviewRow {
    fn format_currency(mut self) -> Self {
        self.pm01 = round_currency(self.pm01);
        self.pm03 = round_currency(self.pm03);
        self.total = round_currency(self.total);
        self
    }
}

impl<R: FormatCurrency> FormatCurrency for ScenarioOverview<R> {
    fn format_currency(mut self) -> Self {
        self.rows = self.rows.format_currency();
        self
    }
}

impl FormatCurrency for RecurringForecastRow {
    fn format_currency(mut self) -> Self {
        self.amount = round_currency(self.amount);
        self
    }
}

impl FormatCurrency for CostRecord {
    fn format_currency(mut self) -> Self {
        self.cost = round_currency(self.cost);
        self
    }
}

impl FormatCurrency for WorkOrderAverage {
    fn format_currency(mut self) -> Self {
        self.average_cost = round_currency(self.average_cost);
        self
    }
}

impl FormatCurrency for UnitWorkOrderRow {
    fn format_currency(mut self) -> Self {
        self.average_cost = round_currency(self.average_cost);
        self
    }
}

impl FormatCurrency for StrategyDataRow {
    fn format_currency(mut self) -> Self {
        self.average_cost = self.average_cost.map(round_currency);
        self
    }
}

impl FormatCurrency for CostSummary {
    fn format_currency(mut self) -> Self {
        self.rows = self.rows.format_currency();
        self.averages = self.averages.format_currency();
        self.per_unit = self.per_unit.format_currency();
        self
    }
}

impl FormatCurrency for PlanOutput {
    fn format_currency(mut self) -> Self {
        self.unit_costs = self
            .unit_costs
            .into_iter()
            .map(|(unit, cost)| (unit, round_currency(cost)))
            .collect::<BTreeMap<_, _>>();
        self.pm02 = self.pm02.format_currency();
        self.strategy_data = self.strategy_data.format_currency();
        self.schedules = self.schedules.format_currency();
        self.replacement_overviews = self.replacement_overviews.format_currency();
        self.recurring_forecast = self.recurring_forecast.format_currency();
        self.recurring_overviews = self.recurring_overviews.format_currency();
        self
    }
}

/// Reject plans carrying non-finite money; a compute failure, not an input error.
pub fn ensure_finite(output: &PlanOutput) -> Result<(), AppError> {
    let event_costs = output.schedules.iter().flat_map(|s| s.events.iter().map(|e| e.cost));
    let overview_costs = output
        .replacement_overviews
        .iter()
        .flat_map(|o| o.rows.iter().map(|r| r.cost));
    let recurring = output.recurring_forecast.iter().map(|r| r.amount);

    if event_costs.chain(overview_costs).chain(recurring).all(f64::is_finite) {
        Ok(())
    } else {
        Err(AppError::new(4, "Non-finite cost computed while building the plan."))
    }
}
