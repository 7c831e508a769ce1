//! Daemon command wiring the scheduler, pipeline, command channel and
//! health endpoint together.
//!
//! Task layout:
//! - Tick scheduler loop (fires the publish pipeline)
//! - Command channel actor + console line transport
//! - Health endpoint
//! - Ctrl-C watcher flipping the shared shutdown flag

use std::sync::Arc;
use std::time::Duration;

use miette::{IntoDiagnostic, Result, miette};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use herald_gateway::{
    Command, CommandChannel, CommandSender, ProbeFn, ProviderLiveness, command_channel,
};
use herald_pipeline::{ImageClient, ImageSize, PostClient, PublishPipeline};
use herald_schedule::{
    Clock, PublishFn, ScheduleStore, SelectionPolicy, SystemClock, Theme, TickScheduler, TimeOfDay,
};

/// Command queue size. Commands are short-lived; a small buffer is enough.
const COMMAND_QUEUE_SIZE: usize = 16;

/// Configuration for the daemon.
pub struct DaemonConfig {
    pub timezone: String,
    pub times: String,
    pub themes: String,
    pub tick_interval: u64,
    pub selection_policy: String,
    pub generation_url: String,
    pub generation_api_key: String,
    pub image_size: ImageSize,
    pub post_url: String,
    pub post_token: String,
    pub provider_timeout: u64,
    pub health_port: u16,
    pub shutdown_grace: u64,
}

pub async fn run(config: DaemonConfig) -> Result<()> {
    info!("starting herald daemon");

    let clock = SystemClock::new(&config.timezone).map_err(|e| miette!("{e}"))?;
    let zone = clock.zone();

    let times = parse_times(&config.times)?;
    let themes = parse_themes(&config.themes)?;
    let policy: SelectionPolicy = config
        .selection_policy
        .parse()
        .map_err(|e| miette!("{e}"))?;

    info!(
        zone = %zone,
        times = %config.times,
        themes = %config.themes,
        policy = %config.selection_policy,
        "schedule configured"
    );

    let store = Arc::new(ScheduleStore::new(times, themes));

    let provider_timeout = Duration::from_secs(config.provider_timeout);
    let pipeline = Arc::new(PublishPipeline::new(
        ImageClient::new(
            &config.generation_url,
            &config.generation_api_key,
            provider_timeout,
        ),
        PostClient::new(&config.post_url, &config.post_token, provider_timeout),
        config.image_size,
    ));

    let scheduler = Arc::new(TickScheduler::new(
        Arc::clone(&store),
        clock.clone(),
        policy,
        Duration::from_secs(config.tick_interval),
    ));
    let last_outcome = scheduler.last_outcome();

    // Bind the health endpoint before spawning anything; a taken port
    // must abort startup, not surface later as a dead probe.
    let listener = herald_web::bind(config.health_port)
        .await
        .into_diagnostic()?;

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Handle shutdown signals
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        let _ = shutdown_tx_clone.send(true);
    });

    // Health endpoint
    let health_handle = {
        let rx = shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = herald_web::serve(listener, rx).await {
                error!(error = %e, "health endpoint failed");
            }
        })
    };

    // Tick scheduler
    let scheduler_handle = {
        let scheduler = Arc::clone(&scheduler);
        let rx = shutdown_rx.clone();
        let publish: PublishFn = {
            let pipeline = Arc::clone(&pipeline);
            let clock = clock.clone();
            Box::new(move |theme: Theme| {
                let pipeline = Arc::clone(&pipeline);
                let clock = clock.clone();
                Box::pin(async move { pipeline.publish(&theme, clock.now()).await })
            })
        };
        tokio::spawn(async move { scheduler.run(rx, publish).await })
    };

    // Command channel actor
    let (command_sender, command_rx) = command_channel(COMMAND_QUEUE_SIZE);
    let channel_handle = {
        let probe: ProbeFn = {
            let pipeline = Arc::clone(&pipeline);
            Box::new(move || {
                let pipeline = Arc::clone(&pipeline);
                Box::pin(async move {
                    let (generation, posting) = pipeline.provider_liveness().await;
                    ProviderLiveness {
                        generation,
                        posting,
                    }
                })
            })
        };
        let channel = CommandChannel::new(Arc::clone(&store), last_outcome, probe, zone);
        tokio::spawn(channel.run(command_rx, shutdown_rx.clone()))
    };

    // Console transport: one command per stdin line
    let console_handle = tokio::spawn(console_loop(command_sender, shutdown_rx.clone()));

    // Wait for shutdown signal
    let mut main_shutdown_rx = shutdown_rx.clone();
    loop {
        if main_shutdown_rx.changed().await.is_err() || *main_shutdown_rx.borrow() {
            break;
        }
    }

    info!("shutting down daemon tasks");

    let grace = Duration::from_secs(config.shutdown_grace);
    drain("scheduler", scheduler_handle, grace).await;
    drain("command-channel", channel_handle, grace).await;
    drain("health", health_handle, grace).await;
    drain("console", console_handle, grace).await;

    info!("daemon shut down gracefully");
    Ok(())
}

/// Wait for a task to stop, aborting it if it outlives the grace period.
/// The console task routinely hits this: a pending stdin read only ends
/// when a line arrives.
async fn drain(name: &str, mut handle: JoinHandle<()>, grace: Duration) {
    if tokio::time::timeout(grace, &mut handle).await.is_err() {
        warn!(task = name, "task did not stop within grace period, aborting");
        handle.abort();
    }
}

/// Read commands from stdin, one per line, and print each acknowledgment.
async fn console_loop(sender: CommandSender, mut shutdown_rx: watch::Receiver<bool>) {
    info!("console transport started (one command per line)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }

            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        let reply = match Command::parse(line) {
                            Ok(command) => match sender.submit(command).await {
                                Ok(ack) => ack,
                                // Actor stopped; nothing more to serve
                                Err(_) => break,
                            },
                            Err(e) => e.to_string(),
                        };
                        println!("{reply}");
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "failed to read command line");
                        break;
                    }
                }
            }
        }
    }

    info!("console transport stopped");
}

fn parse_times(raw: &str) -> Result<Vec<TimeOfDay>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<TimeOfDay>()
                .map_err(|e| miette!("invalid publish time '{part}': {e}"))
        })
        .collect()
}

fn parse_themes(raw: &str) -> Result<Vec<Theme>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| Theme::new(part).map_err(|e| miette!("invalid theme '{part}': {e}")))
        .collect()
}
