//! Input/output helpers.
//!
//! - raw CSV/spreadsheet decoding (`table`)
//! - typed ingest + validation (`ingest`)
//! - fleet name discovery (`query`)
//! - plan exports (CSV/JSON) (`export`)

pub mod export;
pub mod ingest;
pub mod query;
pub mod table;

pub use export::*;
pub use ingest::*;
pub use query::*;
pub use table::*;
