//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input records (`FleetRow`, `CostRecord`, `CounterSample`)
//! - run parameters (`PlanConfig`, `Scenario`, `BaselineMode`)
//! - plan outputs (`ReplacementEvent`, fiscal-year overview rows, summaries)

pub mod types;

pub use types::*;
