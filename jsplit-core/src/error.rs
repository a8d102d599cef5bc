//! Error types for the partitioning engine

use thiserror::Error;

/// Partitioning error types
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("speculation impossible: no qualifying anchor keys")]
    SpeculationImpossible,
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("invalid projection expression: {0}")]
    InvalidProjection(String),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("I/O error: {0}")]
    Stream(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SplitError>;
