//! Fleet name discovery.
//!
//! Fleet names come either from a database (through a caller-supplied
//! `QueryRunner`) or, without one, from the uploaded fleet list itself.

use std::collections::BTreeSet;

use crate::domain::FleetRow;
use crate::error::PlanError;

/// The only query the planner ever issues.
pub const FLEET_QUERY: &str = "SELECT DISTINCT fleet FROM fleet_list WHERE fleet IS NOT NULL ORDER BY fleet;";

/// Read-only access to a database holding the fleet list.
pub trait QueryRunner {
    /// Run `sql` and return every row as text cells.
    fn run_query(&self, sql: &str) -> Result<Vec<Vec<String>>, PlanError>;
}

/// Where fleet names are read from.
pub enum FleetSource<'a> {
    Database(&'a dyn QueryRunner),
    Table(&'a [FleetRow]),
}

impl FleetSource<'_> {
    pub fn fleet_names(&self) -> Result<Vec<String>, PlanError> {
        match self {
            FleetSource::Database(runner) => fleet_names_from_db(*runner),
            FleetSource::Table(rows) => Ok(fleet_names_from_table(rows)),
        }
    }
}

/// Fleet names as returned by the database, in query order, without blanks.
pub fn fleet_names_from_db(runner: &dyn QueryRunner) -> Result<Vec<String>, PlanError> {
    let rows = runner.run_query(FLEET_QUERY)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| row.into_iter().next())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect())
}

/// Distinct non-empty fleet names of an uploaded fleet list, sorted.
pub fn fleet_names_from_table(rows: &[FleetRow]) -> Vec<String> {
    rows.iter()
        .map(|r| r.fleet.trim())
        .filter(|f| !f.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
