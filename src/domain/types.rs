//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during planning
//! - exported to CSV/JSON
//! - hashed as part of the plan cache key

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Default end-of-life horizon.
pub const DEFAULT_EOL: (i32, u32, u32) = (2027, 6, 30);

/// Default replacement interval for a scenario (hours).
pub const DEFAULT_REPLACEMENT_HOURS: u64 = 60_000;

/// Spacing between generated scenarios (hours).
pub const DEFAULT_HOURS_STEP: u64 = 20_000;

/// Allowed number of scenarios per run.
pub const MAX_SCENARIOS: usize = 10;

/// Maintenance work-order category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkOrderCategory {
    /// Preventive maintenance.
    #[serde(rename = "PM01")]
    Pm01,
    /// Scheduled component replacement.
    #[serde(rename = "PM02")]
    Pm02,
    /// Corrective maintenance.
    #[serde(rename = "PM03")]
    Pm03,
}

impl WorkOrderCategory {
    /// Categories forecast as a recurring cost stream.
    pub const RECURRING: [WorkOrderCategory; 2] = [WorkOrderCategory::Pm01, WorkOrderCategory::Pm03];

    pub fn code(self) -> &'static str {
        match self {
            WorkOrderCategory::Pm01 => "PM01",
            WorkOrderCategory::Pm02 => "PM02",
            WorkOrderCategory::Pm03 => "PM03",
        }
    }

    /// Parse a category code such as `PM02`, `pm2` or `PM 02`.
    pub fn parse(s: &str) -> Option<Self> {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();
        let digits = compact.strip_prefix("PM")?;
        match digits.parse::<u32>().ok()? {
            1 => Some(WorkOrderCategory::Pm01),
            2 => Some(WorkOrderCategory::Pm02),
            3 => Some(WorkOrderCategory::Pm03),
            _ => None,
        }
    }
}

impl fmt::Display for WorkOrderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Where the hour count starts before the first replacement interval is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BaselineMode {
    /// Start from the unit's last known counter reading.
    LastReading,
    /// Start from zero hours; targets already passed are history and skipped.
    Zero,
}

/// One row of the fleet list.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetRow {
    pub fleet: String,
    pub unit_id: String,
    pub replacement_cost: Option<f64>,
}

/// One maintenance cost record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostRecord {
    pub unit_id: String,
    pub category: WorkOrderCategory,
    pub work_order_type: String,
    pub cost: f64,
    pub date: NaiveDate,
}

/// One usage-counter reading.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSample {
    pub unit_id: String,
    pub timestamp: NaiveDateTime,
    pub hours: f64,
}

/// A candidate replacement-interval policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub threshold_hours: u64,
}

impl Scenario {
    pub fn new(index: usize, threshold_hours: u64) -> Self {
        Self {
            name: format!("Scenario {index}"),
            threshold_hours,
        }
    }
}

/// A projected component replacement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplacementEvent {
    pub scenario: String,
    pub unit_id: String,
    /// 1-based position in the unit's sequence under this scenario.
    pub sequence: u32,
    pub target_hours: f64,
    pub date: NaiveDate,
    pub cost: f64,
}

/// The replacement schedule for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioSchedule {
    pub scenario: Scenario,
    pub events: Vec<ReplacementEvent>,
    /// Units whose schedule hit the event limit before EOL.
    pub truncated_units: Vec<String>,
}

/// A summed fiscal-year bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiscalYearTotal {
    pub fiscal_year: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub amount: f64,
}

/// Scheduled replacement (PM02) costs per fiscal year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplacementOverviewRow {
    pub fiscal_year: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub replacements: usize,
    pub cost: f64,
}

/// Recurring maintenance (PM01/PM03) costs per fiscal year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecurringOverviewRow {
    pub fiscal_year: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub pm01: f64,
    pub pm03: f64,
    pub total: f64,
}

/// A fiscal-year overview table attached to a scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioOverview<R> {
    pub scenario: String,
    pub rows: Vec<R>,
}

/// One month of forecast recurring cost for a unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecurringForecastRow {
    pub unit_id: String,
    pub category: WorkOrderCategory,
    pub month: NaiveDate,
    pub amount: f64,
}

/// Average cost of one work-order type across the filtered rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkOrderAverage {
    pub work_order_type: String,
    pub orders: usize,
    pub average_cost: f64,
}

/// Per-unit view of the work-order averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitWorkOrderRow {
    pub unit_id: String,
    pub work_order_type: String,
    pub orders: usize,
    pub average_cost: f64,
}

/// One line of a linked maintenance strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyRow {
    pub unit_id: String,
    /// Component or work-order type the strategy covers.
    pub work_order_type: String,
    /// Planned interval between changes, when the strategy states one.
    pub interval_hours: Option<f64>,
}

/// A reading of a component's own hour counter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentReading {
    pub unit_id: String,
    pub component: String,
    pub timestamp: NaiveDateTime,
    pub hours: f64,
}

/// A fleet unit's strategy line with the PM02 history of its type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyDataRow {
    pub unit_id: String,
    pub work_order_type: String,
    pub interval_hours: Option<f64>,
    /// PM02 orders of this type on this unit.
    pub orders: usize,
    /// Fleet-wide PM02 average for the type; absent without history.
    pub average_cost: Option<f64>,
}

/// Latest component counter with the strategy interval it runs against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentIntervalRow {
    pub unit_id: String,
    pub component: String,
    pub last_date: NaiveDate,
    pub component_hours: f64,
    pub interval_hours: Option<f64>,
    /// Interval minus component hours. Negative once the interval is overrun.
    pub hours_remaining: Option<f64>,
}

/// Health of a unit's counter history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CounterStatus {
    Ok,
    Stalled,
    InsufficientData,
    NoSamples,
}

impl CounterStatus {
    pub fn label(self) -> &'static str {
        match self {
            CounterStatus::Ok => "ok",
            CounterStatus::Stalled => "stalled",
            CounterStatus::InsufficientData => "insufficient data",
            CounterStatus::NoSamples => "no samples",
        }
    }
}

/// Counter-data summary for one unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterSummaryRow {
    pub unit_id: String,
    pub samples_used: usize,
    pub samples_dropped: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub last_hours: Option<f64>,
    pub hours_per_day: Option<f64>,
    pub status: CounterStatus,
}

/// A unit that could not be scheduled, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitGap {
    pub unit_id: String,
    pub reason: String,
}

/// A full run's parameters as understood by the pipeline.
///
/// Derived from CLI flags (plus defaults). Serialized into the cache key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanConfig {
    pub fleet: Option<String>,
    pub eol: NaiveDate,
    pub scenarios: Vec<Scenario>,
    pub fiscal_start_month: u32,
    pub fiscal_start_day: u32,
    pub baseline: BaselineMode,
    /// Forecast start. `None` means: latest counter reading of the fleet.
    pub as_of: Option<NaiveDate>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        let (y, m, d) = DEFAULT_EOL;
        Self {
            fleet: None,
            eol: NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MAX),
            scenarios: default_scenarios(3),
            fiscal_start_month: 7,
            fiscal_start_day: 1,
            baseline: BaselineMode::LastReading,
            as_of: None,
        }
    }
}

/// `count` scenarios spaced `DEFAULT_HOURS_STEP` apart from the default interval.
pub fn default_scenarios(count: usize) -> Vec<Scenario> {
    (0..count)
        .map(|i| Scenario::new(i + 1, DEFAULT_REPLACEMENT_HOURS + DEFAULT_HOURS_STEP * i as u64))
        .collect()
}
