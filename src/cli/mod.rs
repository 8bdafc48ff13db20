//! Command-line parsing for the equipment strategy planner.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the planning code.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};

use crate::domain::BaselineMode;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "eso", version, about = "Equipment replacement strategy planner")]
pub struct Cli {
    /// Increase log verbosity (`-v` info, `-vv` debug). `RUST_LOG` takes precedence.
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build replacement schedules and cost overviews for one fleet.
    Plan(PlanArgs),
    /// List the fleets present in a fleet list.
    Fleets(FleetsArgs),
}

/// Options for planning.
#[derive(Debug, Parser, Clone)]
pub struct PlanArgs {
    /// Fleet list (.csv or .xlsx): fleet, unit, replacement cost.
    #[arg(long, env = "ESO_FLEET_LIST", value_name = "FILE")]
    pub fleet_list: Option<PathBuf>,

    /// Maintenance cost data (.csv or .xlsx): unit, category, cost, date.
    #[arg(long, env = "ESO_COST_DATA", value_name = "FILE")]
    pub cost_data: Option<PathBuf>,

    /// Usage counter readings (.csv or .xlsx): unit, timestamp, hours.
    #[arg(long, env = "ESO_COUNTER_DATA", value_name = "FILE")]
    pub counter_data: Option<PathBuf>,

    /// Linked strategy (.csv or .xlsx): unit, component or work-order type, optional interval hours.
    #[arg(long = "strategy", env = "ESO_STRATEGY", value_name = "FILE")]
    pub linked_strategy: Option<PathBuf>,

    /// Component counter readings (.csv or .xlsx): unit, component, timestamp, hours.
    #[arg(long, env = "ESO_COMPONENT_COUNTER_DATA", value_name = "FILE")]
    pub component_counter_data: Option<PathBuf>,

    /// Fleet to plan.
    #[arg(short = 'f', long, env = "ESO_FLEET")]
    pub fleet: Option<String>,

    /// End-of-life horizon (YYYY-MM-DD). No replacement is planned after it.
    #[arg(long, env = "ESO_EOL", default_value = "2027-06-30")]
    pub eol: NaiveDate,

    /// Number of scenarios (1-10).
    #[arg(short = 's', long, default_value_t = 3)]
    pub scenarios: usize,

    /// Replacement interval in hours, per scenario in order (repeat or comma-separate).
    ///
    /// Scenarios without a value use 60000 + 20000 * (n - 1).
    #[arg(long = "hours", value_delimiter = ',', value_name = "HOURS")]
    pub hours: Vec<u64>,

    /// First day of the fiscal year (MM-DD).
    #[arg(long, default_value = "07-01")]
    pub fiscal_start: MonthDay,

    /// Where the hour count starts before the first interval is added.
    #[arg(long, value_enum, default_value_t = BaselineMode::LastReading)]
    pub baseline: BaselineMode,

    /// Forecast start date (defaults to the fleet's latest counter reading).
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Export every plan table as CSV into this directory.
    #[arg(long, value_name = "DIR")]
    pub export: Option<PathBuf>,

    /// Export the whole plan as JSON.
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,
}

/// Options for listing fleets.
#[derive(Debug, Parser)]
pub struct FleetsArgs {
    /// Fleet list (.csv or .xlsx).
    #[arg(long, env = "ESO_FLEET_LIST", value_name = "FILE")]
    pub fleet_list: PathBuf,
}

/// A month-day pair such as `07-01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl FromStr for MonthDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (m, d) = s
            .trim()
            .split_once(['-', '/'])
            .ok_or_else(|| format!("expected MM-DD, got '{s}'"))?;
        let month: u32 = m.parse().map_err(|_| format!("invalid month in '{s}'"))?;
        let day: u32 = d.parse().map_err(|_| format!("invalid day in '{s}'"))?;
        Ok(Self { month, day })
    }
}
