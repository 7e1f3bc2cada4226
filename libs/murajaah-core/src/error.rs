//! Error types for murajaah-core.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias using ScheduleError.
pub type Result<T> = std::result::Result<T, ScheduleError>;

/// Failures of scheduling operations.
///
/// All of these are local and synchronous. Numeric degeneracy in stored
/// stability/difficulty is never reported here; it is clamped instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("review not allowed yet, next review at: {}", .earliest.format("%Y-%m-%d %H:%M"))]
    TooEarly { earliest: DateTime<Utc> },

    #[error("conflict: {0}")]
    Conflict(String),
}

impl ScheduleError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn unauthorized(what: impl Into<String>) -> Self {
        Self::Unauthorized(what.into())
    }

    pub fn invalid_state(what: impl Into<String>) -> Self {
        Self::InvalidState(what.into())
    }

    pub fn invalid_input(what: impl Into<String>) -> Self {
        Self::InvalidInput(what.into())
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        Self::Conflict(what.into())
    }
}
