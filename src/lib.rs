//! `fleet-strategy` library crate.
//!
//! The binary (`eso`) is a thin wrapper around this library so that:
//!
//! - planning logic is testable without spawning processes
//! - modules are reusable (e.g., a web front-end feeding uploads to `Planner`)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod plan;
pub mod report;
