//! In-memory schedule state.

use std::collections::BTreeSet;

use tokio::sync::RwLock;
use tracing::info;

use crate::{Theme, TimeOfDay};

/// Result of an add operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyExists,
}

/// Result of a remove operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

/// Owned copy of the schedule taken at the start of a tick evaluation.
/// Mutations made while a tick is in flight apply from the next tick.
#[derive(Debug, Clone)]
pub struct ScheduleSnapshot {
    /// Configured publish times, ascending.
    pub times: Vec<TimeOfDay>,
    /// Themes in insertion order.
    pub themes: Vec<Theme>,
    pub paused: bool,
}

#[derive(Debug, Default)]
struct ScheduleState {
    times: BTreeSet<TimeOfDay>,
    themes: Vec<Theme>,
    paused: bool,
}

/// The single process-wide mutable schedule.
///
/// All operations take the lock for the duration of one operation, so
/// concurrent readers never observe a partial update.
#[derive(Debug)]
pub struct ScheduleStore {
    state: RwLock<ScheduleState>,
}

impl ScheduleStore {
    /// Create a store with the startup configuration.
    pub fn new(times: impl IntoIterator<Item = TimeOfDay>, themes: Vec<Theme>) -> Self {
        Self {
            state: RwLock::new(ScheduleState {
                times: times.into_iter().collect(),
                themes,
                paused: false,
            }),
        }
    }

    /// Add a publish time. Duplicates are rejected, not appended.
    pub async fn add_time(&self, time: TimeOfDay) -> AddOutcome {
        let mut state = self.state.write().await;
        if state.times.insert(time) {
            info!(%time, "added publish time");
            AddOutcome::Added
        } else {
            AddOutcome::AlreadyExists
        }
    }

    /// Remove a publish time.
    pub async fn remove_time(&self, time: TimeOfDay) -> RemoveOutcome {
        let mut state = self.state.write().await;
        if state.times.remove(&time) {
            info!(%time, "removed publish time");
            RemoveOutcome::Removed
        } else {
            RemoveOutcome::NotFound
        }
    }

    /// Configured publish times, sorted ascending.
    pub async fn list_times(&self) -> Vec<TimeOfDay> {
        self.state.read().await.times.iter().copied().collect()
    }

    /// Add a theme. Duplicates are rejected.
    pub async fn add_theme(&self, theme: Theme) -> AddOutcome {
        let mut state = self.state.write().await;
        if state.themes.contains(&theme) {
            AddOutcome::AlreadyExists
        } else {
            info!(theme = %theme, "added theme");
            state.themes.push(theme);
            AddOutcome::Added
        }
    }

    /// Remove a theme by label.
    pub async fn remove_theme(&self, label: &str) -> RemoveOutcome {
        let mut state = self.state.write().await;
        let before = state.themes.len();
        state.themes.retain(|t| t.as_str() != label);
        if state.themes.len() < before {
            info!(theme = %label, "removed theme");
            RemoveOutcome::Removed
        } else {
            RemoveOutcome::NotFound
        }
    }

    /// Themes in insertion order.
    pub async fn list_themes(&self) -> Vec<Theme> {
        self.state.read().await.themes.clone()
    }

    pub async fn set_paused(&self, paused: bool) {
        self.state.write().await.paused = paused;
        info!(paused, "schedule pause flag updated");
    }

    pub async fn is_paused(&self) -> bool {
        self.state.read().await.paused
    }

    /// Take a consistent snapshot of the whole schedule.
    pub async fn snapshot(&self) -> ScheduleSnapshot {
        let state = self.state.read().await;
        ScheduleSnapshot {
            times: state.times.iter().copied().collect(),
            themes: state.themes.clone(),
            paused: state.paused,
        }
    }
}
