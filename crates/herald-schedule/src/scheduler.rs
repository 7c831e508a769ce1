//! Tick scheduler implementation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Timelike};
use tokio::sync::{RwLock, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::{Clock, PublishOutcome, ScheduleStore, SelectionPolicy, Theme, TimeOfDay};

/// Type alias for the publish pipeline callback.
pub type PublishFn =
    Box<dyn Fn(Theme) -> Pin<Box<dyn Future<Output = PublishOutcome> + Send>> + Send + Sync>;

/// What a single tick evaluation decided.
#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    /// Schedule is paused; nothing was evaluated.
    Paused,
    /// Current minute matches no configured time.
    NotDue,
    /// This minute already fired; suppressed.
    AlreadyFired,
    /// Time matched but the theme list is empty; skipped without error.
    NoThemes,
    /// The pipeline was invoked with this outcome.
    Fired(PublishOutcome),
}

/// The tick scheduler.
///
/// Once per interval it snapshots the schedule, checks the clock against
/// the configured times, and fires the publish callback at most once per
/// wall-clock minute. Evaluations are strictly serialized: the loop owns
/// evaluation, so two ticks never overlap.
pub struct TickScheduler<C: Clock> {
    store: Arc<ScheduleStore>,
    clock: C,
    policy: SelectionPolicy,
    interval: Duration,
    /// Zone-local minute of the last fire, successful or not.
    last_fired: RwLock<Option<NaiveDateTime>>,
    last_outcome: Arc<RwLock<Option<PublishOutcome>>>,
}

impl<C: Clock> TickScheduler<C> {
    /// Create a scheduler over the shared store.
    pub fn new(store: Arc<ScheduleStore>, clock: C, policy: SelectionPolicy, interval: Duration) -> Self {
        Self {
            store,
            clock,
            policy,
            interval,
            last_fired: RwLock::new(None),
            last_outcome: Arc::new(RwLock::new(None)),
        }
    }

    /// Handle to the most recent publish outcome, for status reporting.
    pub fn last_outcome(&self) -> Arc<RwLock<Option<PublishOutcome>>> {
        Arc::clone(&self.last_outcome)
    }

    /// Run the tick loop until shutdown is signalled.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>, publish: PublishFn) {
        info!(interval_secs = self.interval.as_secs(), "tick scheduler starting");

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }

                _ = interval.tick() => {
                    self.evaluate(&publish).await;
                }
            }
        }

        info!("tick scheduler shut down");
    }

    /// Evaluate one tick against the current schedule snapshot.
    ///
    /// Mutations made after the snapshot is taken apply from the next tick.
    pub async fn evaluate(&self, publish: &PublishFn) -> Tick {
        let snapshot = self.store.snapshot().await;
        if snapshot.paused {
            return Tick::Paused;
        }

        let now = self.clock.now();
        let current = TimeOfDay::of(&now);
        if !snapshot.times.contains(&current) {
            return Tick::NotDue;
        }

        let minute = truncate_to_minute(now.naive_local());
        if *self.last_fired.read().await == Some(minute) {
            debug!(%current, "minute already fired, suppressing");
            return Tick::AlreadyFired;
        }

        let Some(theme) = self.policy.select(&snapshot.themes, now.minute()) else {
            debug!(%current, "time matched but no themes configured, skipping");
            return Tick::NoThemes;
        };

        info!(%current, theme = %theme, "firing scheduled publish");
        let outcome = publish(theme.clone()).await;

        // Record the minute regardless of outcome so a failed publish is
        // not retried within the same minute.
        *self.last_fired.write().await = Some(minute);

        if outcome.success {
            info!(theme = %outcome.theme, "publish completed");
        } else {
            warn!(theme = %outcome.theme, reason = ?outcome.reason, "publish failed");
        }
        *self.last_outcome.write().await = Some(outcome.clone());

        Tick::Fired(outcome)
    }
}

fn truncate_to_minute(t: NaiveDateTime) -> NaiveDateTime {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}
