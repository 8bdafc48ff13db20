//! Planning engine.
//!
//! Everything here is pure: typed tables and parameters in, plan tables out.
//!
//! - `resolver`: fleet id -> unit ids and replacement costs
//! - `costs`: cost filtering and work-order averages
//! - `scheduler`: replacement events per scenario
//! - `strategy`: linked strategy and component counters joined to history
//! - `recurring`: PM01/PM03 monthly forecast
//! - `fiscal`: fiscal-year overviews

pub mod costs;
pub mod fiscal;
pub mod recurring;
pub mod resolver;
pub mod scheduler;
pub mod strategy;

pub use costs::{CostSummary, filter_and_average};
pub use fiscal::{FiscalCalendar, aggregate, recurring_overview, replacement_overview};
pub use recurring::{forecast_recurring, monthly_rate};
pub use resolver::{ResolvedFleet, resolve};
pub use scheduler::{DEFAULT_MAX_EVENTS_PER_UNIT, ScheduleParams, UnitSchedule, schedule, schedule_unit};
pub use strategy::{component_intervals, strategy_data};
