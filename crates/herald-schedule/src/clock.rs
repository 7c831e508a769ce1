//! Zone-aware clock abstraction.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::ScheduleError;

/// Supplies the current time in the process-configured zone.
///
/// The scheduler reads every timestamp through this trait so tick
/// evaluation can be driven by a fixed clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Tz>;
}

/// Production clock: system time converted to a fixed IANA zone.
#[derive(Debug, Clone)]
pub struct SystemClock {
    zone: Tz,
}

impl SystemClock {
    /// Create a clock for the given IANA zone name (e.g. "Asia/Taipei").
    pub fn new(zone: &str) -> Result<Self, ScheduleError> {
        let zone: Tz = zone
            .parse()
            .map_err(|_| ScheduleError::UnknownTimeZone(zone.to_string()))?;
        Ok(Self { zone })
    }

    /// Create a clock for an already-resolved zone.
    pub fn with_zone(zone: Tz) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.zone)
    }
}
