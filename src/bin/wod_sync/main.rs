// ABOUTME: wod-sync CLI - publish Aimharder workouts to Strava and Garmin Connect
// ABOUTME: Sync, fetch, export, status, platform authorization, and the webhook server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors
//!
//! Usage:
//! ```bash
//! # Sync the last 30 days to Strava
//! wod-sync sync
//!
//! # Sync a range to both platforms, ignoring history
//! wod-sync sync --start 2025-01-01 --end 2025-01-31 --platform strava --platform garmin --force
//!
//! # Show what would be uploaded
//! wod-sync --dry-run sync --days 7
//!
//! # Authorize Strava
//! wod-sync auth strava
//! wod-sync auth strava --code <code-from-redirect>
//!
//! # Run the webhook server
//! wod-sync serve --bind 0.0.0.0:8080 --token secret
//! ```

mod commands;
mod helpers;

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use wod_sync::config::AppConfig;
use wod_sync::errors::{AppError, AppResult};
use wod_sync::logging;
use wod_sync::models::DateWindow;
use wod_sync::pipeline::SyncPipeline;
use wod_sync::providers::initialize_shared_client;

type Result<T> = AppResult<T>;

/// Request timeout for platform APIs
const HTTP_TIMEOUT_SECS: u64 = 60;
/// Connect timeout for platform APIs
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Parser)]
#[command(
    name = "wod-sync",
    version,
    about = "Publish CrossFit workouts from Aimharder to Strava and Garmin Connect",
    long_about = "Fetches workouts logged on Aimharder, encodes them as TCX files with a synthesized heart-rate track, and uploads them without creating duplicates."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: ~/.wod-sync/config.yaml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Decide and report without uploading or recording history
    #[arg(long, global = true)]
    dry_run: bool,
}

/// Date range selection shared by the fetching commands
#[derive(Args, Clone, Copy)]
struct RangeArgs {
    /// Days back from today (default from config)
    #[arg(long, short = 'd')]
    days: Option<u32>,

    /// First day, YYYY-MM-DD
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day, YYYY-MM-DD (default: today)
    #[arg(long)]
    end: Option<NaiveDate>,
}

impl RangeArgs {
    fn window(self, today: NaiveDate, default_days: u32) -> Result<DateWindow> {
        let default = DateWindow::last_days(today, self.days.unwrap_or(default_days));
        let window = DateWindow::new(
            self.start.unwrap_or(default.start),
            self.end.unwrap_or(default.end),
        );
        if window.start > window.end {
            return Err(AppError::invalid_input(format!(
                "start {} is after end {}",
                window.start, window.end
            )));
        }
        Ok(window)
    }
}

#[non_exhaustive]
#[derive(Subcommand)]
enum Command {
    /// Fetch, encode, and upload workouts
    Sync {
        #[command(flatten)]
        range: RangeArgs,

        /// Upload even when history records a previous success
        #[arg(long, short = 'f')]
        force: bool,

        /// Destination platform, repeatable (default from config)
        #[arg(long = "platform", short = 'p', value_parser = ["strava", "garmin"])]
        platforms: Vec<String>,
    },

    /// Fetch and parse workouts without uploading
    Fetch {
        #[command(flatten)]
        range: RangeArgs,

        /// Write the workouts as JSON to this file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Generate TCX files without uploading
    Export {
        #[command(flatten)]
        range: RangeArgs,

        /// Output directory (default from config)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Show sync history statistics and token state
    Status,

    /// Authorize a destination platform
    Auth {
        #[command(subcommand)]
        action: AuthCommand,
    },

    /// Run the webhook server
    Serve {
        /// Listen address (default from config)
        #[arg(long)]
        bind: Option<String>,

        /// Shared token required on triggers (default from config)
        #[arg(long)]
        token: Option<String>,
    },
}

#[non_exhaustive]
#[derive(Subcommand)]
enum AuthCommand {
    /// Print the authorization URL, or exchange the code from the redirect
    Strava {
        /// Authorization code from the redirect URL
        #[arg(long)]
        code: Option<String>,
    },

    /// Import a browser session cookie, or log in with configured credentials
    Garmin {
        /// Cookie header copied from a logged-in browser session
        #[arg(long)]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_from_env(cli.verbose)
        .map_err(|e| AppError::internal(format!("Failed to initialize logging: {e}")))?;

    let config = AppConfig::load(cli.config.as_deref())?;
    initialize_shared_client(HTTP_TIMEOUT_SECS, HTTP_CONNECT_TIMEOUT_SECS);
    info!("wod-sync {}", env!("CARGO_PKG_VERSION"));

    let today = Local::now().date_naive();
    let default_days = config.sync.default_days;
    let pipeline = SyncPipeline::new(config);

    match cli.command {
        Command::Sync {
            range,
            force,
            platforms,
        } => {
            let window = range.window(today, default_days)?;
            commands::sync::run(&pipeline, window, platforms, force, cli.dry_run).await?;
        }
        Command::Fetch { range, output } => {
            let window = range.window(today, default_days)?;
            commands::fetch::run(&pipeline, window, output).await?;
        }
        Command::Export { range, output } => {
            let window = range.window(today, default_days)?;
            commands::export::run(&pipeline, window, output).await?;
        }
        Command::Status => {
            commands::status::run(&pipeline).await?;
        }
        Command::Auth { action } => match action {
            AuthCommand::Strava { code } => commands::auth::strava(&pipeline, code).await?,
            AuthCommand::Garmin { session } => commands::auth::garmin(&pipeline, session).await?,
        },
        Command::Serve { bind, token } => {
            commands::serve::run(pipeline, bind, token).await?;
        }
    }

    Ok(())
}
