//! Schedule types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Timelike, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::ScheduleError;

/// A daily recurrence point: hour and minute in the configured zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Create a time of day, rejecting out-of-range fields.
    pub fn new(hour: u8, minute: u8) -> Result<Self, ScheduleError> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::InvalidTime(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self { hour, minute })
    }

    /// The time of day of a clock reading, ignoring seconds.
    pub fn of<T: Timelike>(t: &T) -> Self {
        Self {
            hour: t.hour() as u8,
            minute: t.minute() as u8,
        }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }
}

impl FromStr for TimeOfDay {
    type Err = ScheduleError;

    /// Parse strict `HH:MM` (two digits each side).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidTime(s.to_string());
        let (h, m) = s.split_once(':').ok_or_else(invalid)?;
        if h.len() != 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour: u8 = h.parse().map_err(|_| invalid())?;
        let minute: u8 = m.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// An opaque, non-empty text label selected to parameterize one publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Theme(String);

impl Theme {
    /// Create a theme, rejecting empty or whitespace-only labels.
    pub fn new(label: impl Into<String>) -> Result<Self, ScheduleError> {
        let label = label.into();
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Err(ScheduleError::EmptyTheme);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the scheduler picks a theme for a matched time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Deterministic: the current minute modulo the theme count.
    #[default]
    ByMinute,
    /// Uniform random over the theme list.
    Random,
}

impl SelectionPolicy {
    /// Pick a theme from a non-empty list; `None` only when the list is empty.
    pub fn select<'a>(&self, themes: &'a [Theme], minute: u32) -> Option<&'a Theme> {
        match self {
            Self::ByMinute => themes.get(minute as usize % themes.len().max(1)),
            Self::Random => themes.choose(&mut rand::thread_rng()),
        }
    }
}

impl FromStr for SelectionPolicy {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "by-minute" => Ok(Self::ByMinute),
            "random" => Ok(Self::Random),
            other => Err(ScheduleError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Why a publish invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// Artifact generation errored or timed out; posting was never attempted.
    GenerationFailed,
    /// The artifact was generated but submission to the posting service failed.
    PostFailed,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GenerationFailed => f.write_str("generation-failed"),
            Self::PostFailed => f.write_str("post-failed"),
        }
    }
}

/// The result of one publish pipeline invocation. Log-only, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub theme: Theme,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub reason: Option<FailureReason>,
}

impl PublishOutcome {
    /// A successful publish.
    pub fn success(theme: Theme, timestamp: DateTime<Utc>) -> Self {
        Self {
            theme,
            timestamp,
            success: true,
            reason: None,
        }
    }

    /// A failed publish with the step that failed.
    pub fn failure(theme: Theme, timestamp: DateTime<Utc>, reason: FailureReason) -> Self {
        Self {
            theme,
            timestamp,
            success: false,
            reason: Some(reason),
        }
    }
}
