//! Error types for pcb-engine
//!
//! Malformed input never produces an error: normalization degrades to zeros.
//! Errors are reserved for blend configuration, the data store and
//! configuration loading.

use thiserror::Error;

/// Engine result type
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level engine error
#[derive(Debug, Error)]
pub enum EngineError {
    /// Data store could not be read
    #[error("Data store error: {0}")]
    Store(#[from] StoreError),

    /// Blend configuration rejected
    #[error("Blend error: {0}")]
    Blend(#[from] BlendError),

    /// pcb-common error (configuration, I/O)
    #[error("Common error: {0}")]
    Common(#[from] pcb_common::Error),

    /// Work abandoned because the service is shutting down
    #[error("Operation cancelled")]
    Cancelled,

    /// Internal invariant broken
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Data store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unknown survey id
    #[error("Survey not found: {0}")]
    SurveyNotFound(String),

    /// Backend refused or failed the request
    #[error("Store backend failure: {0}")]
    Backend(String),

    /// Fixture file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Fixture file is not valid JSON for the store layout
    #[error("Invalid fixture: {0}")]
    Fixture(#[from] serde_json::Error),
}

/// Blend configuration errors
///
/// Returned before any computation; a blend never soft-degrades on a bad
/// configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BlendError {
    #[error("Blend configuration must include at least one year")]
    NoYears,

    #[error("Year percentages must total 100%, got {total:.1}%")]
    PercentageTotal { total: f64 },

    #[error("Year {0} is listed more than once")]
    DuplicateYear(i32),

    #[error("Year {year} has a percentage that is not a finite number ({percentage})")]
    NonFinitePercentage { year: i32, percentage: f64 },

    #[error("Year {year} has a negative percentage ({percentage}%)")]
    NegativePercentage { year: i32, percentage: f64 },
}
