//! Error types.
//!
//! - `PlanError` is the planning engine's taxonomy. Library code returns it.
//! - `AppError` is what the `eso` binary reports: a message plus a process exit code.

use thiserror::Error;

/// Errors raised while ingesting inputs or building a plan.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// A required upload or parameter is absent. The run halts gracefully.
    #[error("{0}")]
    MissingInput(String),

    /// A required column is absent or a value has the wrong shape.
    #[error("{table}: {detail}")]
    Validation { table: String, detail: String },

    /// A unit lacks enough counter history to fit a trend.
    #[error("Unit {unit}: insufficient counter data ({detail})")]
    InsufficientData { unit: String, detail: String },

    /// The fleet lookup table itself is malformed.
    #[error("Fleet list lookup failed: {0}")]
    Lookup(String),

    /// A file could not be read.
    #[error("Failed to read '{path}': {detail}")]
    Io { path: String, detail: String },
}

impl PlanError {
    pub fn validation(table: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Validation {
            table: table.into(),
            detail: detail.into(),
        }
    }

    pub fn missing_input(message: impl Into<String>) -> Self {
        Self::MissingInput(message.into())
    }

    /// Process exit code used by the binary for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            PlanError::MissingInput(_)
            | PlanError::Validation { .. }
            | PlanError::Lookup(_)
            | PlanError::Io { .. } => 2,
            PlanError::InsufficientData { .. } => 3,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
