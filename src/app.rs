//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments (plus `.env` / environment fallbacks)
//! - initialises logging
//! - runs the planning pipeline
//! - prints reports and writes optional exports

use clap::Parser;
use tracing::{info, warn};

use crate::cli::{Command, FleetsArgs, PlanArgs};
use crate::domain::{DEFAULT_HOURS_STEP, DEFAULT_REPLACEMENT_HOURS, PlanConfig, Scenario};
use crate::error::{AppError, PlanError};

pub mod pipeline;
pub mod planner;

/// Entry point for the `eso` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    // We want `eso` and `eso --fleet 793F ...` to behave like `eso plan ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    init_tracing(cli.verbose);

    match cli.command {
        Command::Plan(args) => handle_plan(args),
        Command::Fleets(args) => handle_fleets(args),
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    // Ignore a second initialisation (tests, embedding).
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn handle_plan(args: PlanArgs) -> Result<(), AppError> {
    let config = plan_config_from_args(&args);
    let uploads = planner::Uploads::from_paths(
        args.fleet_list.as_deref(),
        args.cost_data.as_deref(),
        args.counter_data.as_deref(),
    )?
    .with_strategy_paths(args.linked_strategy.as_deref(), args.component_counter_data.as_deref())?;

    let mut planner = planner::Planner::new();
    let output = match planner.plan(&uploads, &config) {
        Ok(output) => output,
        // Missing uploads are an informational halt, not a failure.
        Err(PlanError::MissingInput(message)) => {
            println!("{message}");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    crate::report::ensure_finite(&output)?;

    println!("{}", crate::report::format_plan(&output));

    // Optional exports.
    if let Some(dir) = &args.export {
        let written = crate::io::export::write_tables(dir, &output)?;
        info!(dir = %dir.display(), files = written.len(), "exported plan tables");
    }
    if let Some(path) = &args.json {
        crate::io::export::write_plan_json(path, &output)?;
        info!(path = %path.display(), "exported plan JSON");
    }

    Ok(())
}

fn handle_fleets(args: FleetsArgs) -> Result<(), AppError> {
    let upload = crate::io::table::Upload::from_path(&args.fleet_list)?;
    let table = crate::io::table::read_table(crate::io::ingest::FLEET_LIST, &upload)?;
    let fleet = crate::io::ingest::ingest_fleet_list(&table)?;
    if !fleet.row_errors.is_empty() {
        warn!(skipped = fleet.row_errors.len(), "fleet list has invalid rows");
    }

    let names = crate::io::query::FleetSource::Table(&fleet.records).fleet_names()?;
    for name in names {
        println!("{name}");
    }
    Ok(())
}

pub fn plan_config_from_args(args: &PlanArgs) -> PlanConfig {
    let count = args.scenarios.max(args.hours.len());
    let scenarios = (0..count)
        .map(|i| {
            let hours = args
                .hours
                .get(i)
                .copied()
                .unwrap_or(DEFAULT_REPLACEMENT_HOURS + DEFAULT_HOURS_STEP * i as u64);
            Scenario::new(i + 1, hours)
        })
        .collect();

    PlanConfig {
        fleet: args.fleet.clone(),
        eol: args.eol,
        scenarios,
        fiscal_start_month: args.fiscal_start.month,
        fiscal_start_day: args.fiscal_start.day,
        baseline: args.baseline,
        as_of: args.as_of,
    }
}

/// Rewrite argv so `eso` defaults to `eso plan`.
///
/// Rules:
/// - `eso`                       -> `eso plan`
/// - `eso --fleet 793F ...`      -> `eso plan --fleet 793F ...`
/// - `eso --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("plan".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "plan" | "fleets");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "plan flags".
    if arg1.starts_with('-') {
        argv.insert(1, "plan".to_string());
        return argv;
    }

    argv
}
