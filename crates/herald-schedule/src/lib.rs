//! Scheduling core for herald.
//!
//! This crate provides the in-memory schedule and the tick engine:
//! - Mutable set of publish times and ordered theme list behind one lock
//! - Fixed-interval tick evaluation with an at-most-once-per-minute guard
//! - Deterministic or random theme selection
//! - Zone-aware clock abstraction

mod clock;
mod error;
mod scheduler;
mod store;
mod types;

pub use clock::{Clock, SystemClock};
pub use error::ScheduleError;
pub use scheduler::{PublishFn, Tick, TickScheduler};
pub use store::{AddOutcome, RemoveOutcome, ScheduleSnapshot, ScheduleStore};
pub use types::{FailureReason, PublishOutcome, SelectionPolicy, Theme, TimeOfDay};
