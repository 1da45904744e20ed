//! Error types for pairq

use thiserror::Error;

/// Main error type for pairq
#[derive(Error, Debug)]
pub enum PairqError {
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for pairq operations
pub type Result<T> = std::result::Result<T, PairqError>;
