//! Error types for recurrence-engine operations.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::rule::RuleError;

/// Errors returned by expansion and view construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid RRULE: {0}")]
    InvalidRule(#[from] RuleError),

    #[error("Invalid calendar month: {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("Invalid window: start {start} is after end {end}")]
    InvalidWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("Expansion error: {0}")]
    Expansion(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
