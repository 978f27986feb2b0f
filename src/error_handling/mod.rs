//! Error types.
//!
//! The evaluator deliberately has a narrow error surface: most failure
//! modes are data, not errors — individual query failures become
//! [`QueryOutcome`][crate::models::QueryOutcome] tags and verification
//! failures become `error`-severity findings. Only problems that prevent a
//! check from running at all (bad input, broken process setup) surface as
//! `Err` values.

use log::SetLoggerError;
use thiserror::Error;

/// Errors that reject a check before any query is issued.
#[derive(Error, Debug)]
pub enum CheckError {
    /// The supplied domain name is syntactically invalid.
    #[error("invalid domain name: {0:?}")]
    InvalidDomain(String),
}

/// Errors during process setup (logger, journal, resolver).
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error opening the interaction journal for appending.
    #[error("Journal initialization error: {0}")]
    JournalError(#[from] std::io::Error),
}
