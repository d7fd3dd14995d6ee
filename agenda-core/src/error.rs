//! Error types for the agenda card.

use thiserror::Error;

/// Errors that can occur while configuring or fetching the agenda.
///
/// Absence of data (no events, no end time, no calendar selected) is never an
/// error; those are ordinary values.
#[derive(Error, Debug)]
pub enum AgendaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Event source error: {0}")]
    Source(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Event source request timed out after {0}s")]
    Timeout(u64),

    #[error("Fetch was cancelled")]
    Cancelled,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for agenda operations.
pub type AgendaResult<T> = Result<T, AgendaError>;
