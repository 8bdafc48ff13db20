//! Export plan tables to CSV and the whole plan to JSON.
//!
//! Each table becomes one CSV file whose columns follow the row struct's field
//! order. The export is meant to be easy to consume in spreadsheets or
//! downstream scripts.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::app::pipeline::PlanOutput;
use crate::error::PlanError;

/// A rendered CSV table: file name plus contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTable {
    pub file_name: String,
    pub contents: String,
}

/// Render every plan table to CSV text, in a fixed order.
pub fn render_tables(output: &PlanOutput) -> Result<Vec<RenderedTable>, PlanError> {
    let mut tables = Vec::new();

    for (i, schedule) in output.schedules.iter().enumerate() {
        tables.push(render(
            format!("replacement_schedule_scenario_{}.csv", i + 1),
            &schedule.events,
        )?);
    }
    for (i, overview) in output.replacement_overviews.iter().enumerate() {
        tables.push(render(format!("pm02_fy_overview_scenario_{}.csv", i + 1), &overview.rows)?);
    }
    tables.push(render("pm01_pm03_forecast.csv".to_string(), &output.recurring_forecast)?);
    for (i, overview) in output.recurring_overviews.iter().enumerate() {
        tables.push(render(
            format!("pm01_pm03_fy_overview_scenario_{}.csv", i + 1),
            &overview.rows,
        )?);
    }
    tables.push(render("pm02_costs.csv".to_string(), &output.pm02.rows)?);
    tables.push(render("pm02_work_order_averages.csv".to_string(), &output.pm02.averages)?);
    tables.push(render("pm02_unit_work_orders.csv".to_string(), &output.pm02.per_unit)?);
    tables.push(render("strategy_data.csv".to_string(), &output.strategy_data)?);
    tables.push(render("counter_summary.csv".to_string(), &output.counter_summary)?);
    tables.push(render("component_intervals.csv".to_string(), &output.component_intervals)?);
    tables.push(render("unit_gaps.csv".to_string(), &output.gaps)?);
    tables.push(render("row_errors.csv".to_string(), &output.row_errors)?);

    Ok(tables)
}

/// Write every plan table into `dir` (created if needed). Returns the paths written.
pub fn write_tables(dir: &Path, output: &PlanOutput) -> Result<Vec<PathBuf>, PlanError> {
    fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;

    let mut written = Vec::new();
    for table in render_tables(output)? {
        let path = dir.join(&table.file_name);
        fs::write(&path, table.contents).map_err(|e| io_error(&path, e))?;
        written.push(path);
    }
    Ok(written)
}

/// Write the whole plan as pretty JSON.
pub fn write_plan_json(path: &Path, output: &PlanOutput) -> Result<(), PlanError> {
    let file = File::create(path).map_err(|e| io_error(path, e))?;
    serde_json::to_writer_pretty(file, output).map_err(|e| PlanError::Io {
        path: path.display().to_string(),
        detail: format!("Failed to write plan JSON: {e}"),
    })
}

fn render<T: Serialize>(file_name: String, rows: &[T]) -> Result<RenderedTable, PlanError> {
    let to_err = |detail: String| PlanError::Io {
        path: file_name.clone(),
        detail,
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).map_err(|e| to_err(e.to_string()))?;
    }
    let bytes = writer.into_inner().map_err(|e| to_err(e.to_string()))?;
    let contents = String::from_utf8(bytes).map_err(|e| to_err(e.to_string()))?;

    Ok(RenderedTable { file_name, contents })
}

fn io_error(path: &Path, e: std::io::Error) -> PlanError {
    PlanError::Io {
        path: path.display().to_string(),
        detail: e.to_string(),
    }
}
