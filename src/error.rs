//! Error types for the analysis pipeline.
//!
//! The core pipeline itself never fails per tick: malformed data degrades to
//! `NOISE` and is counted (see `session::QualityCounters`). Errors surface
//! only at the edges — invalid configuration at startup, and per-job
//! failures in batch processing.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors produced at the pipeline edges.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Invalid configuration, fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// A session job could not be processed (batch mode).
    #[error("session error for {symbol} {date}: {reason}")]
    Session {
        symbol: String,
        date: String,
        reason: String,
    },

    /// I/O failure while reading or writing configuration files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for adapter-boundary failures.
    #[error("{0}")]
    Generic(String),
}

impl AnalysisError {
    /// Create a configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        AnalysisError::Config(msg.into())
    }

    /// Create a generic error.
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        AnalysisError::Generic(msg.into())
    }
}
