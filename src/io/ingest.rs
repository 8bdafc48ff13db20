//! Typed ingestion of the input tables.
//!
//! This is the only place that looks columns up by name. Each table kind has a
//! fixed schema (required columns with accepted aliases); once a table passes
//! validation the rest of the crate works with typed records.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors naming table and column)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (no hidden defaults)

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::warn;

use crate::domain::{ComponentReading, CostRecord, CounterSample, FleetRow, StrategyRow, WorkOrderCategory};
use crate::error::PlanError;
use crate::io::table::{RawRow, RawTable};

pub const FLEET_LIST: &str = "Fleet List";
pub const COST_DATA: &str = "Cost Data";
pub const COUNTER_DATA: &str = "Counter Data";
pub const LINKED_STRATEGY: &str = "Linked Strategy";
pub const COMPONENT_COUNTER_DATA: &str = "Component Counter Data";

/// A required or optional column with the header spellings we accept.
#[derive(Debug, Clone, Copy)]
struct Column {
    name: &'static str,
    aliases: &'static [&'static str],
}

const FLEET: Column = Column {
    name: "fleet",
    aliases: &["fleet", "fleet_name"],
};
const UNIT: Column = Column {
    name: "unit",
    aliases: &["unit", "unit_number", "unit_id", "unit_no", "equipment"],
};
const REPLACEMENT_COST: Column = Column {
    name: "replacement_cost",
    aliases: &["replacement_cost", "repl_cost", "cost"],
};
const CATEGORY: Column = Column {
    name: "category",
    aliases: &["category", "order_type", "wo_category"],
};
const WORK_ORDER_TYPE: Column = Column {
    name: "work_order_type",
    aliases: &["work_order_type", "wo_type", "description"],
};
const COST: Column = Column {
    name: "cost",
    aliases: &["cost", "actual_cost", "total_cost"],
};
const COST_DATE: Column = Column {
    name: "date",
    aliases: &["date", "order_date", "posting_date"],
};
const TIMESTAMP: Column = Column {
    name: "timestamp",
    aliases: &["timestamp", "date", "reading_date"],
};
const HOURS: Column = Column {
    name: "hours",
    aliases: &["hours", "cumulative_hours", "counter", "counter_reading"],
};
const STRATEGY_ITEM: Column = Column {
    name: "work_order_type",
    aliases: &["work_order_type", "wo_type", "component", "description"],
};
const INTERVAL: Column = Column {
    name: "interval_hours",
    aliases: &[
        "interval_hours",
        "maintenance_interval",
        "maintenance_interval_hours",
        "interval",
        "replacement_hours",
    ],
};
const COMPONENT: Column = Column {
    name: "component",
    aliases: &["component", "work_order_type", "wo_type", "description"],
};

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub table: String,
    pub line: usize,
    pub message: String,
}

/// Valid records of one table plus the rows that were skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested<T> {
    pub records: Vec<T>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Validate and type the fleet list.
///
/// The fleet list is the lookup table for fleet resolution, so schema problems
/// are reported as `Lookup` errors rather than `Validation`.
pub fn ingest_fleet_list(table: &RawTable) -> Result<Ingested<FleetRow>, PlanError> {
    let to_lookup = |e: PlanError| PlanError::Lookup(e.to_string());
    let fleet = require(table, FLEET).map_err(to_lookup)?;
    let unit = require(table, UNIT).map_err(to_lookup)?;
    let cost = require(table, REPLACEMENT_COST).map_err(to_lookup)?;

    ingest_rows(table, |row| {
        Ok(FleetRow {
            fleet: required_cell(row, fleet, FLEET)?.to_string(),
            unit_id: required_cell(row, unit, UNIT)?.to_string(),
            replacement_cost: optional_cell(row, cost).map(parse_amount).transpose()?,
        })
    })
    .map_err(to_lookup)
}

/// Validate and type the cost data.
pub fn ingest_costs(table: &RawTable) -> Result<Ingested<CostRecord>, PlanError> {
    let unit = require(table, UNIT)?;
    let category = require(table, CATEGORY)?;
    let cost = require(table, COST)?;
    let date = require(table, COST_DATE)?;
    let wo_type = locate(table, WORK_ORDER_TYPE);

    ingest_rows(table, |row| {
        let raw_category = required_cell(row, category, CATEGORY)?;
        let category = WorkOrderCategory::parse(raw_category)
            .ok_or_else(|| format!("Unknown work-order category '{raw_category}' (expected PM01, PM02 or PM03)."))?;
        let work_order_type = wo_type
            .and_then(|idx| optional_cell(row, idx))
            .map(str::to_string)
            .unwrap_or_else(|| category.code().to_string());

        Ok(CostRecord {
            unit_id: required_cell(row, unit, UNIT)?.to_string(),
            category,
            work_order_type,
            cost: parse_amount(required_cell(row, cost, COST)?)?,
            date: parse_timestamp(required_cell(row, date, COST_DATE)?)?.date(),
        })
    })
}

/// Validate and type the counter data.
pub fn ingest_counters(table: &RawTable) -> Result<Ingested<CounterSample>, PlanError> {
    let unit = require(table, UNIT)?;
    let timestamp = require(table, TIMESTAMP)?;
    let hours = require(table, HOURS)?;

    ingest_rows(table, |row| {
        Ok(CounterSample {
            unit_id: required_cell(row, unit, UNIT)?.to_string(),
            timestamp: parse_timestamp(required_cell(row, timestamp, TIMESTAMP)?)?,
            hours: parse_amount(required_cell(row, hours, HOURS)?)?,
        })
    })
}

/// Validate and type a linked strategy.
///
/// The interval column is optional; when present, a stated interval must be
/// positive.
pub fn ingest_strategy(table: &RawTable) -> Result<Ingested<StrategyRow>, PlanError> {
    let unit = require(table, UNIT)?;
    let item = require(table, STRATEGY_ITEM)?;
    let interval = locate(table, INTERVAL);

    ingest_rows(table, |row| {
        let interval_hours = interval
            .and_then(|idx| optional_cell(row, idx))
            .map(parse_interval)
            .transpose()?;
        Ok(StrategyRow {
            unit_id: required_cell(row, unit, UNIT)?.to_string(),
            work_order_type: required_cell(row, item, STRATEGY_ITEM)?.to_string(),
            interval_hours,
        })
    })
}

/// Validate and type component counter readings.
pub fn ingest_component_counters(table: &RawTable) -> Result<Ingested<ComponentReading>, PlanError> {
    let unit = require(table, UNIT)?;
    let component = require(table, COMPONENT)?;
    let timestamp = require(table, TIMESTAMP)?;
    let hours = require(table, HOURS)?;

    ingest_rows(table, |row| {
        Ok(ComponentReading {
            unit_id: required_cell(row, unit, UNIT)?.to_string(),
            component: required_cell(row, component, COMPONENT)?.to_string(),
            timestamp: parse_timestamp(required_cell(row, timestamp, TIMESTAMP)?)?,
            hours: parse_amount(required_cell(row, hours, HOURS)?)?,
        })
    })
}

fn ingest_rows<T, F>(table: &RawTable, parse: F) -> Result<Ingested<T>, PlanError>
where
    F: Fn(&RawRow) -> Result<T, String>,
{
    let mut records = Vec::with_capacity(table.rows.len());
    let mut row_errors: Vec<RowError> = table
        .unreadable
        .iter()
        .map(|(line, message)| RowError {
            table: table.table.clone(),
            line: *line,
            message: message.clone(),
        })
        .collect();

    for row in &table.rows {
        match parse(row) {
            Ok(record) => records.push(record),
            Err(message) => row_errors.push(RowError {
                table: table.table.clone(),
                line: row.line,
                message,
            }),
        }
    }

    let rows_read = table.rows.len() + table.unreadable.len();
    if !row_errors.is_empty() {
        warn!(table = %table.table, skipped = row_errors.len(), rows_read, "skipped invalid rows");
    }
    if records.is_empty() {
        return Err(PlanError::validation(
            table.table.as_str(),
            format!("No valid rows ({rows_read} read, {} rejected).", row_errors.len()),
        ));
    }

    row_errors.sort_by_key(|e| e.line);
    Ok(Ingested {
        records,
        row_errors,
        rows_read,
    })
}

fn locate(table: &RawTable, column: Column) -> Option<usize> {
    column.aliases.iter().find_map(|alias| table.column(alias))
}

fn require(table: &RawTable, column: Column) -> Result<usize, PlanError> {
    locate(table, column).ok_or_else(|| {
        PlanError::validation(
            table.table.as_str(),
            format!(
                "Missing required column: `{}` (accepted headers: {})",
                column.name,
                column.aliases.join(", ")
            ),
        )
    })
}

fn required_cell<'a>(row: &'a RawRow, idx: usize, column: Column) -> Result<&'a str, String> {
    optional_cell(row, idx).ok_or_else(|| format!("Missing required value: `{}`", column.name))
}

fn optional_cell(row: &RawRow, idx: usize) -> Option<&str> {
    row.cells.get(idx).map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Parse a number, tolerating currency symbols and thousands separators.
fn parse_amount(s: &str) -> Result<f64, String> {
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' ' | '\u{a0}'))
        .collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("Invalid number '{s}'.")),
    }
}

fn parse_interval(s: &str) -> Result<f64, String> {
    match parse_amount(s)? {
        v if v > 0.0 => Ok(v),
        _ => Err(format!("Interval must be positive, got '{s}'.")),
    }
}

/// Parse a date or date-time.
///
/// We recommend ISO dates (`YYYY-MM-DD`), but maintenance system exports often
/// use `DD/MM/YYYY` or `DD-MM-YYYY`, sometimes with a time. Dates without a
/// time are taken at midnight.
fn parse_timestamp(s: &str) -> Result<NaiveDateTime, String> {
    const DATETIME_FMTS: [&str; 8] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
        "%d-%m-%Y %H:%M",
    ];
    const DATE_FMTS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(dt);
            }
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, DD/MM/YYYY, DD-MM-YYYY, YYYY/MM/DD (optionally with a time)."
    ))
}
