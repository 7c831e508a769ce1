//! Herald: scheduled publish daemon
//!
//! Single `daemon` subcommand: runs the tick scheduler, the command
//! channel with its console transport, and the liveness endpoint.

use clap::{Parser, Subcommand};
use herald_pipeline::ImageSize;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod daemon;

/// Parse an image size in WIDTHxHEIGHT notation.
/// Only the square sizes the generation API accepts are valid.
fn parse_image_size(s: &str) -> Result<ImageSize, String> {
    match s {
        "256x256" => Ok(ImageSize::Square256),
        "512x512" => Ok(ImageSize::Square512),
        "1024x1024" => Ok(ImageSize::Square1024),
        _ => Err(format!(
            "invalid image size '{}', expected 256x256, 512x512 or 1024x1024",
            s
        )),
    }
}

#[derive(Parser)]
#[command(name = "herald")]
#[command(about = "Scheduled publish daemon", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon (tick scheduler, command channel, health endpoint)
    Daemon {
        /// IANA time zone the schedule is evaluated in
        #[arg(long, env = "HERALD_TIMEZONE", default_value = "Asia/Taipei")]
        timezone: String,

        /// Initial publish times, comma-separated HH:MM
        #[arg(long, env = "HERALD_TIMES", default_value = "08:00,12:00,18:00,22:00")]
        times: String,

        /// Initial theme labels, comma-separated
        #[arg(long, env = "HERALD_THEMES", default_value = "technology,art,life")]
        themes: String,

        /// Tick interval in seconds
        #[arg(long, default_value = "60")]
        tick_interval: u64,

        /// Theme selection policy: by-minute or random
        #[arg(long, env = "HERALD_SELECTION_POLICY", default_value = "by-minute")]
        selection_policy: String,

        /// Image generation API base URL
        #[arg(long, env = "HERALD_GENERATION_URL", default_value = "https://api.openai.com")]
        generation_url: String,

        /// Image generation API key
        #[arg(long, env = "HERALD_GENERATION_API_KEY")]
        generation_api_key: String,

        /// Generated image size
        #[arg(long, value_parser = parse_image_size, default_value = "1024x1024")]
        image_size: ImageSize,

        /// Posting service base URL
        #[arg(long, env = "HERALD_POST_URL", default_value = "https://api.twitter.com")]
        post_url: String,

        /// Posting service bearer token
        #[arg(long, env = "HERALD_POST_TOKEN")]
        post_token: String,

        /// Per-request provider timeout in seconds
        #[arg(long, default_value = "30")]
        provider_timeout: u64,

        /// Health endpoint port
        #[arg(long, env = "HERALD_HEALTH_PORT", default_value = "8080")]
        health_port: u16,

        /// Seconds to wait for tasks to stop before aborting them
        #[arg(long, default_value = "30")]
        shutdown_grace: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "herald=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon {
            timezone,
            times,
            themes,
            tick_interval,
            selection_policy,
            generation_url,
            generation_api_key,
            image_size,
            post_url,
            post_token,
            provider_timeout,
            health_port,
            shutdown_grace,
        } => {
            daemon::run(daemon::DaemonConfig {
                timezone,
                times,
                themes,
                tick_interval,
                selection_policy,
                generation_url,
                generation_api_key,
                image_size,
                post_url,
                post_token,
                provider_timeout,
                health_port,
                shutdown_grace,
            })
            .await
        }
    }
}
