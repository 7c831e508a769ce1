//! Command channel actor.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono_tz::Tz;
use tokio::sync::{RwLock, mpsc, oneshot, watch};
use tracing::{debug, info};

use herald_schedule::{AddOutcome, PublishOutcome, RemoveOutcome, ScheduleStore};

use crate::{Command, GatewayError};

/// Opportunistic reachability of the external providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderLiveness {
    pub generation: bool,
    pub posting: bool,
}

/// Type alias for the provider probe callback used by `status`.
pub type ProbeFn =
    Box<dyn Fn() -> Pin<Box<dyn Future<Output = ProviderLiveness> + Send>> + Send + Sync>;

/// One command with its reply slot.
pub struct CommandRequest {
    pub command: Command,
    pub reply: oneshot::Sender<String>,
}

/// Gateway-facing handle: submit a command, await the acknowledgment.
#[derive(Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<CommandRequest>,
}

impl CommandSender {
    /// Submit a command and wait for its acknowledgment text.
    pub async fn submit(&self, command: Command) -> Result<String, GatewayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(CommandRequest {
                command,
                reply: reply_tx,
            })
            .await
            .map_err(|_| GatewayError::ChannelClosed)?;
        reply_rx.await.map_err(|_| GatewayError::ChannelClosed)
    }
}

/// Create the request channel shared by the gateway and the actor.
pub fn command_channel(capacity: usize) -> (CommandSender, mpsc::Receiver<CommandRequest>) {
    let (tx, rx) = mpsc::channel(capacity);
    (CommandSender { tx }, rx)
}

/// The single-owner actor applying commands to the schedule.
///
/// Runs as its own task; schedule mutations interleave with tick
/// evaluation only at operation granularity, and every mutation is
/// visible to the next tick.
pub struct CommandChannel {
    store: Arc<ScheduleStore>,
    last_outcome: Arc<RwLock<Option<PublishOutcome>>>,
    probe: ProbeFn,
    zone: Tz,
}

impl CommandChannel {
    pub fn new(
        store: Arc<ScheduleStore>,
        last_outcome: Arc<RwLock<Option<PublishOutcome>>>,
        probe: ProbeFn,
        zone: Tz,
    ) -> Self {
        Self {
            store,
            last_outcome,
            probe,
            zone,
        }
    }

    /// Serve command requests until shutdown is signalled or the sending
    /// side is dropped.
    pub async fn run(
        self,
        mut rx: mpsc::Receiver<CommandRequest>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        info!("command channel started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }

                request = rx.recv() => {
                    let Some(CommandRequest { command, reply }) = request else {
                        break;
                    };
                    debug!(?command, "applying command");
                    let ack = self.apply(command).await;
                    // Issuer may have gone away; nothing to do about it
                    let _ = reply.send(ack);
                }
            }
        }

        info!("command channel stopped");
    }

    /// Apply one command and render its acknowledgment.
    pub async fn apply(&self, command: Command) -> String {
        match command {
            Command::AddTime(t) => match self.store.add_time(t).await {
                AddOutcome::Added => format!("added publish time {t}"),
                AddOutcome::AlreadyExists => format!("publish time {t} already exists"),
            },
            Command::RemoveTime(t) => match self.store.remove_time(t).await {
                RemoveOutcome::Removed => format!("removed publish time {t}"),
                RemoveOutcome::NotFound => format!("publish time {t} not found"),
            },
            Command::ListTimes => {
                let times = self.store.list_times().await;
                if times.is_empty() {
                    "no publish times configured".to_string()
                } else {
                    format!("publish times: {}", join(times.iter()))
                }
            }
            Command::AddTheme(theme) => {
                let label = theme.as_str().to_string();
                match self.store.add_theme(theme).await {
                    AddOutcome::Added => format!("added theme '{label}'"),
                    AddOutcome::AlreadyExists => format!("theme '{label}' already exists"),
                }
            }
            Command::RemoveTheme(label) => match self.store.remove_theme(&label).await {
                RemoveOutcome::Removed => format!("removed theme '{label}'"),
                RemoveOutcome::NotFound => format!("theme '{label}' not found"),
            },
            Command::ListThemes => {
                let themes = self.store.list_themes().await;
                if themes.is_empty() {
                    "no themes configured".to_string()
                } else {
                    format!("themes: {}", join(themes.iter()))
                }
            }
            Command::Pause => {
                self.store.set_paused(true).await;
                "scheduled publishing paused".to_string()
            }
            Command::Resume => {
                self.store.set_paused(false).await;
                "scheduled publishing resumed".to_string()
            }
            Command::Status => self.render_status().await,
        }
    }

    async fn render_status(&self) -> String {
        let snapshot = self.store.snapshot().await;
        let liveness = (self.probe)().await;

        let times = if snapshot.times.is_empty() {
            "none".to_string()
        } else {
            join(snapshot.times.iter())
        };
        let themes = if snapshot.themes.is_empty() {
            "none".to_string()
        } else {
            join(snapshot.themes.iter())
        };

        let last_publish = match self.last_outcome.read().await.as_ref() {
            Some(outcome) if outcome.success => format!(
                "'{}' at {} (success)",
                outcome.theme,
                outcome.timestamp.with_timezone(&self.zone).format("%Y-%m-%d %H:%M")
            ),
            Some(outcome) => format!(
                "'{}' at {} (failed: {})",
                outcome.theme,
                outcome.timestamp.with_timezone(&self.zone).format("%Y-%m-%d %H:%M"),
                outcome
                    .reason
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            ),
            None => "none".to_string(),
        };

        format!(
            "zone: {}\ntimes: {}\nthemes ({}): {}\npaused: {}\nlast publish: {}\nproviders: generation {}, posting {}",
            self.zone,
            times,
            snapshot.themes.len(),
            themes,
            snapshot.paused,
            last_publish,
            up_or_down(liveness.generation),
            up_or_down(liveness.posting),
        )
    }
}

fn join<T: std::fmt::Display>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

fn up_or_down(alive: bool) -> &'static str {
    if alive { "ok" } else { "unreachable" }
}
