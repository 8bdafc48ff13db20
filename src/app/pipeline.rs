//! Shared planning pipeline used by the CLI and by `Planner`.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! resolve fleet -> filter costs -> fit counters -> schedule -> aggregate -> format
//!
//! Front-ends then only deal with presentation (printing, exporting).

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{
    ComponentIntervalRow, ComponentReading, CostRecord, CounterSample, CounterSummaryRow, FleetRow, MAX_SCENARIOS,
    PlanConfig, RecurringForecastRow, RecurringOverviewRow, ReplacementOverviewRow, ScenarioOverview, ScenarioSchedule,
    StrategyDataRow, StrategyRow, UnitGap, WorkOrderCategory,
};
use crate::error::PlanError;
use crate::fit::fit_fleet;
use crate::io::ingest::RowError;
use crate::plan::{
    CostSummary, FiscalCalendar, ResolvedFleet, ScheduleParams, component_intervals, filter_and_average,
    forecast_recurring, recurring_overview, replacement_overview, resolve, schedule, strategy_data,
};
use crate::report::FormatCurrency;

/// Typed input tables. `None` means "not uploaded".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanInputs {
    pub fleet_list: Option<Vec<FleetRow>>,
    pub costs: Option<Vec<CostRecord>>,
    pub counters: Option<Vec<CounterSample>>,
    /// Optional: per-unit strategy lines.
    pub strategy: Option<Vec<StrategyRow>>,
    /// Optional: component hour counters.
    pub component_counters: Option<Vec<ComponentReading>>,
    /// Rows skipped while ingesting the tables above.
    pub row_errors: Vec<RowError>,
}

/// All computed outputs of a single plan run.
///
/// Monetary columns are rounded to cents (half to even).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanOutput {
    pub fleet: String,
    pub as_of: NaiveDate,
    pub eol: NaiveDate,
    pub units: Vec<String>,
    /// Cost charged per replacement event, by unit.
    pub unit_costs: BTreeMap<String, f64>,
    pub pm02: CostSummary,
    /// Linked strategy of the fleet's units with PM02 averages.
    pub strategy_data: Vec<StrategyDataRow>,
    pub counter_summary: Vec<CounterSummaryRow>,
    /// Component counters with their maintenance interval in hours.
    pub component_intervals: Vec<ComponentIntervalRow>,
    pub schedules: Vec<ScenarioSchedule>,
    pub replacement_overviews: Vec<ScenarioOverview<ReplacementOverviewRow>>,
    pub recurring_forecast: Vec<RecurringForecastRow>,
    pub recurring_overviews: Vec<ScenarioOverview<RecurringOverviewRow>>,
    pub gaps: Vec<UnitGap>,
    pub row_errors: Vec<RowError>,
}

/// Execute the full planning pipeline.
pub fn run_plan(inputs: &PlanInputs, config: &PlanConfig) -> Result<PlanOutput, PlanError> {
    // 1) Parameters.
    validate_scenarios(config)?;
    let calendar = FiscalCalendar::new(config.fiscal_start_month, config.fiscal_start_day)?;

    // 2) Required uploads, in dependency order.
    let (fleet_list, costs, counters) = require_inputs(inputs)?;

    // 3) Fleet -> units.
    let fleet_id = config.fleet.as_deref().unwrap_or("");
    let fleet = resolve(fleet_id, fleet_list)?;
    if fleet.is_empty() {
        info!(fleet = fleet_id, "no units matched; nothing to schedule");
    } else {
        info!(fleet = fleet_id, units = fleet.unit_ids.len(), "resolved fleet");
    }

    // 4) Cost filtering.
    let pm02 = filter_and_average(costs, &fleet.unit_ids, WorkOrderCategory::Pm02);
    let recurring: Vec<CostSummary> = WorkOrderCategory::RECURRING
        .iter()
        .map(|&category| filter_and_average(costs, &fleet.unit_ids, category))
        .collect();
    info!(
        pm02_rows = pm02.rows.len(),
        work_order_types = pm02.averages.len(),
        "filtered cost data"
    );

    let strategy = inputs.strategy.as_deref().unwrap_or_default();
    let strategy_rows = strategy_data(strategy, &fleet.unit_ids, &pm02);
    let component_rows = inputs
        .component_counters
        .as_deref()
        .map(|readings| component_intervals(readings, strategy, &fleet.unit_ids))
        .unwrap_or_default();
    if inputs.strategy.is_some() || inputs.component_counters.is_some() {
        info!(
            strategy_rows = strategy_rows.len(),
            components = component_rows.len(),
            "joined linked strategy"
        );
    }

    // 5) Counter trends.
    let trends = fit_fleet(&fleet.unit_ids, counters);
    info!(fitted = trends.trends.len(), gaps = trends.gaps.len(), "fitted counter trends");

    let as_of = config
        .as_of
        .or_else(|| trends.trends.values().map(|t| t.last_date).max())
        .or_else(|| latest_cost_date(&pm02, &recurring))
        .unwrap_or(config.eol);
    debug!(%as_of, "forecast start");

    // 6) Replacement schedules.
    let cost_by_unit = replacement_costs(&fleet, &pm02);
    let params = ScheduleParams::new(config.eol, config.baseline, &cost_by_unit);
    let schedules = schedule(&fleet.unit_ids, &config.scenarios, &trends.trends, params);
    let mut gaps = trends.gaps;
    for s in &schedules {
        info!(scenario = %s.scenario.name, events = s.events.len(), "scheduled replacements");
        gaps.extend(truncation_gaps(s, params.max_events_per_unit));
    }

    // 7) Recurring costs.
    let recurring_forecast = forecast_recurring(&recurring, &fleet.unit_ids, as_of, config.eol);

    // 8) Fiscal-year overviews.
    let replacement_overviews = schedules
        .iter()
        .map(|s| ScenarioOverview {
            scenario: s.scenario.name.clone(),
            rows: replacement_overview(&s.events, &calendar, Some(as_of), config.eol),
        })
        .collect();
    let recurring_rows = recurring_overview(&recurring_forecast, &calendar, Some(as_of), config.eol);
    let recurring_overviews = config
        .scenarios
        .iter()
        .map(|s| ScenarioOverview {
            scenario: s.name.clone(),
            rows: recurring_rows.clone(),
        })
        .collect();

    let output = PlanOutput {
        fleet: fleet_id.trim().to_string(),
        as_of,
        eol: config.eol,
        units: fleet.unit_ids.clone(),
        unit_costs: cost_by_unit.into_iter().collect(),
        pm02,
        strategy_data: strategy_rows,
        counter_summary: trends.summary,
        component_intervals: component_rows,
        schedules,
        replacement_overviews,
        recurring_forecast,
        recurring_overviews,
        gaps,
        row_errors: inputs.row_errors.clone(),
    };

    // 9) Formatting.
    Ok(output.format_currency())
}

fn validate_scenarios(config: &PlanConfig) -> Result<(), PlanError> {
    let n = config.scenarios.len();
    if n == 0 || n > MAX_SCENARIOS {
        return Err(PlanError::validation(
            "Parameters",
            format!("Number of scenarios must be between 1 and {MAX_SCENARIOS} (got {n})."),
        ));
    }
    Ok(())
}

type RequiredTables<'a> = (&'a [FleetRow], &'a [CostRecord], &'a [CounterSample]);

/// Halt at the first missing dependency: fleet+cost, cost, fleet, counters.
fn require_inputs(inputs: &PlanInputs) -> Result<RequiredTables<'_>, PlanError> {
    match (&inputs.fleet_list, &inputs.costs, &inputs.counters) {
        (None, None, _) => Err(PlanError::missing_input(
            "Please upload the Fleet List and Cost Data to continue.",
        )),
        (_, None, _) => Err(PlanError::missing_input("Please upload Cost Data to continue.")),
        (None, _, _) => Err(PlanError::missing_input("Please upload the Fleet List to continue.")),
        (_, _, None) => Err(PlanError::missing_input(
            "Please upload Counter Data to project replacement dates.",
        )),
        (Some(fleet), Some(costs), Some(counters)) => Ok((fleet, costs, counters)),
    }
}

/// Per-unit event cost: fleet-list replacement cost when positive, otherwise
/// the unit's PM02 visit cost from history. Units with neither are absent.
fn replacement_costs(fleet: &ResolvedFleet, pm02: &CostSummary) -> HashMap<String, f64> {
    fleet
        .unit_ids
        .iter()
        .filter_map(|unit_id| {
            let listed = fleet.unit_costs.get(unit_id).copied().filter(|c| *c > 0.0);
            listed
                .or_else(|| pm02.unit_visit_cost(unit_id))
                .map(|cost| (unit_id.clone(), cost))
        })
        .collect()
}

/// A truncated schedule is reported against its unit, never dropped silently.
fn truncation_gaps(schedule: &ScenarioSchedule, limit: usize) -> Vec<UnitGap> {
    schedule
        .truncated_units
        .iter()
        .map(|unit_id| UnitGap {
            unit_id: unit_id.clone(),
            reason: format!(
                "{}: schedule stopped after {limit} replacements before reaching EOL",
                schedule.scenario.name
            ),
        })
        .collect()
}

fn latest_cost_date(pm02: &CostSummary, recurring: &[CostSummary]) -> Option<NaiveDate> {
    std::iter::once(pm02)
        .chain(recurring)
        .flat_map(|s| s.rows.iter().map(|r| r.date))
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BaselineMode, Scenario};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fleet_row(fleet: &str, unit: &str, cost: Option<f64>) -> FleetRow {
        FleetRow {
            fleet: fleet.to_string(),
            unit_id: unit.to_string(),
            replacement_cost: cost,
        }
    }

    fn cost(unit: &str, category: WorkOrderCategory, wo_type: &str, amount: f64, date: NaiveDate) -> CostRecord {
        CostRecord {
            unit_id: unit.to_string(),
            category,
            work_order_type: wo_type.to_string(),
            cost: amount,
            date,
        }
    }

    fn reading(unit: &str, date: NaiveDate, hours: f64) -> CounterSample {
        CounterSample {
            unit_id: unit.to_string(),
            timestamp: date.and_hms_opt(0, 0, 0).unwrap(),
            hours,
        }
    }

    fn inputs() -> PlanInputs {
        use WorkOrderCategory::*;
        PlanInputs {
            fleet_list: Some(vec![
                fleet_row("793F", "DT101", Some(1_000_000.0)),
                fleet_row("793F", "DT102", None),
                fleet_row("793F", "DT103", None),
                fleet_row("D11T", "DZ201", Some(5.0)),
            ]),
            costs: Some(vec![
                cost("DT101", Pm02, "Engine", 300_000.0, ymd(2023, 6, 1)),
                cost("DT102", Pm02, "Engine", 340_000.0, ymd(2023, 7, 1)),
                cost("DT102", Pm01, "Service", 3_000.0, ymd(2023, 1, 15)),
                cost("DT102", Pm01, "Service", 3_000.0, ymd(2023, 3, 15)),
                cost("DZ201", Pm02, "Engine", 1.0, ymd(2023, 7, 1)),
            ]),
            counters: Some(vec![
                reading("DT101", ymd(2023, 1, 1), 10_000.0),
                reading("DT101", ymd(2024, 1, 1), 50_000.0),
                reading("DT102", ymd(2023, 1, 1), 20_000.0),
                reading("DT102", ymd(2024, 1, 1), 60_000.0),
            ]),
            strategy: None,
            component_counters: None,
            row_errors: Vec::new(),
        }
    }

    fn config() -> PlanConfig {
        PlanConfig {
            fleet: Some("793F".to_string()),
            eol: ymd(2026, 6, 30),
            scenarios: vec![Scenario::new(1, 60_000), Scenario::new(2, 80_000)],
            ..PlanConfig::default()
        }
    }

    #[test]
    fn missing_inputs_halt_in_dependency_order() {
        let none = PlanInputs::default();
        let err = run_plan(&none, &config()).unwrap_err();
        assert!(err.to_string().contains("Fleet List and Cost Data"));

        let only_fleet = PlanInputs {
            fleet_list: inputs().fleet_list,
            ..PlanInputs::default()
        };
        assert!(run_plan(&only_fleet, &config()).unwrap_err().to_string().contains("Cost Data"));

        let only_costs = PlanInputs {
            costs: inputs().costs,
            ..PlanInputs::default()
        };
        assert!(run_plan(&only_costs, &config()).unwrap_err().to_string().contains("Fleet List"));

        let no_counters = PlanInputs {
            counters: None,
            ..inputs()
        };
        let err = run_plan(&no_counters, &config()).unwrap_err();
        assert!(matches!(err, PlanError::MissingInput(_)));
        assert!(err.to_string().contains("Counter Data"));
    }

    #[test]
    fn scenario_count_is_bounded() {
        let mut cfg = config();
        cfg.scenarios.clear();
        assert!(matches!(run_plan(&inputs(), &cfg), Err(PlanError::Validation { .. })));

        cfg.scenarios = crate::domain::default_scenarios(MAX_SCENARIOS + 1);
        assert!(matches!(run_plan(&inputs(), &cfg), Err(PlanError::Validation { .. })));
    }

    #[test]
    fn plan_schedules_fleet_units_only() {
        let out = run_plan(&inputs(), &config()).unwrap();

        assert_eq!(out.units, vec!["DT101", "DT102", "DT103"]);
        assert_eq!(out.as_of, ymd(2024, 1, 1));
        assert_eq!(out.schedules.len(), 2);
        assert_eq!(out.replacement_overviews.len(), 2);
        assert_eq!(out.recurring_overviews.len(), 2);

        let s1 = &out.schedules[0].events;
        assert_eq!(s1.len(), 2);
        assert!(s1.iter().all(|e| e.unit_id != "DZ201"));
        // DT102 falls back to its PM02 history.
        assert_eq!(out.unit_costs.get("DT101"), Some(&1_000_000.0));
        assert_eq!(out.unit_costs.get("DT102"), Some(&320_000.0));
        assert!(!out.unit_costs.contains_key("DT103"));

        let gap_units: Vec<&str> = out.gaps.iter().map(|g| g.unit_id.as_str()).collect();
        assert_eq!(gap_units, vec!["DT103"]);
    }

    #[test]
    fn fiscal_overviews_cover_as_of_through_eol() {
        let out = run_plan(&inputs(), &config()).unwrap();
        let labels: Vec<&str> = out.replacement_overviews[0]
            .rows
            .iter()
            .map(|r| r.fiscal_year.as_str())
            .collect();
        assert_eq!(labels, vec!["FY2024", "FY2025", "FY2026"]);

        let events = out.schedules[0].events.len();
        let counted: usize = out.replacement_overviews[0].rows.iter().map(|r| r.replacements).sum();
        assert_eq!(events, counted);
    }

    #[test]
    fn recurring_forecast_uses_history_rate() {
        let out = run_plan(&inputs(), &config()).unwrap();
        // DT102 PM01: 6,000 over Jan..Mar 2023 = 2,000 per month.
        assert!(out.recurring_forecast.iter().all(|r| r.unit_id == "DT102"));
        assert!(out.recurring_forecast.iter().all(|r| r.amount == 2_000.0));
        // Feb 2024 through Jun 2026.
        assert_eq!(out.recurring_forecast.len(), 29);
    }

    #[test]
    fn empty_fleet_is_not_an_error() {
        let cfg = PlanConfig {
            fleet: Some("777G".to_string()),
            ..config()
        };
        let out = run_plan(&inputs(), &cfg).unwrap();
        assert!(out.units.is_empty());
        assert!(out.schedules.iter().all(|s| s.events.is_empty()));
        assert!(out.recurring_forecast.is_empty());
    }

    #[test]
    fn zero_baseline_is_honoured() {
        let cfg = PlanConfig {
            baseline: BaselineMode::Zero,
            ..config()
        };
        let out = run_plan(&inputs(), &cfg).unwrap();
        let first = &out.schedules[0].events[0];
        assert_eq!(first.target_hours % 60_000.0, 0.0);
    }

    #[test]
    fn strategy_and_component_tables_are_optional() {
        let out = run_plan(&inputs(), &config()).unwrap();
        assert!(out.strategy_data.is_empty());
        assert!(out.component_intervals.is_empty());

        let with_strategy = PlanInputs {
            strategy: Some(vec![
                StrategyRow {
                    unit_id: "DT102".to_string(),
                    work_order_type: "Engine".to_string(),
                    interval_hours: Some(20_000.0),
                },
                StrategyRow {
                    unit_id: "DZ201".to_string(),
                    work_order_type: "Engine".to_string(),
                    interval_hours: Some(20_000.0),
                },
            ]),
            component_counters: Some(vec![ComponentReading {
                unit_id: "DT102".to_string(),
                component: "Engine".to_string(),
                timestamp: ymd(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap(),
                hours: 15_000.0,
            }]),
            ..inputs()
        };
        let out = run_plan(&with_strategy, &config()).unwrap();

        assert_eq!(out.strategy_data.len(), 1);
        assert_eq!(out.strategy_data[0].average_cost, Some(320_000.0));
        assert_eq!(out.component_intervals.len(), 1);
        assert_eq!(out.component_intervals[0].hours_remaining, Some(5_000.0));
        // Schedules do not depend on the strategy tables.
        assert_eq!(out.schedules, run_plan(&inputs(), &config()).unwrap().schedules);
    }

    #[test]
    fn truncated_schedules_become_gaps() {
        let schedule = ScenarioSchedule {
            scenario: Scenario::new(2, 1),
            events: Vec::new(),
            truncated_units: vec!["DT101".to_string()],
        };
        let gaps = truncation_gaps(&schedule, 5);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].unit_id, "DT101");
        assert!(gaps[0].reason.starts_with("Scenario 2: schedule stopped after 5 replacements"));
    }

    #[test]
    fn plan_is_deterministic() {
        let a = run_plan(&inputs(), &config()).unwrap();
        let b = run_plan(&inputs(), &config()).unwrap();
        assert_eq!(a, b);
    }
}
