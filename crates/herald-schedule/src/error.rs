//! Error types for the scheduling core.

use thiserror::Error;

/// Errors that can occur in schedule operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Input did not parse as a time of day.
    #[error("invalid time of day '{0}', expected HH:MM")]
    InvalidTime(String),

    /// Theme label was empty or whitespace.
    #[error("theme must not be empty")]
    EmptyTheme,

    /// Time zone name is not a known IANA identifier.
    #[error("unknown time zone '{0}'")]
    UnknownTimeZone(String),

    /// Input did not name a selection policy.
    #[error("unknown selection policy '{0}', expected 'by-minute' or 'random'")]
    UnknownPolicy(String),
}
