// ABOUTME: Sync pipeline wiring source fetch, parsing, TCX encoding, history, and the orchestrator
// ABOUTME: Builds platform clients from configuration; shared by the CLI and the webhook
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use std::sync::Arc;

#[cfg(feature = "provider-aimharder")]
use async_trait::async_trait;
use futures_util::TryStreamExt;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::history::HistoryStore;
use crate::models::{DateWindow, Workout};
use crate::parser::{ActivityParser, ParseContext};
use crate::providers::{
    create_activity_stream, DestinationClient, SourceClient, StreamConfig, TokenStore,
};
use crate::sync::{CancellationToken, Clock, SyncOptions, SyncOrchestrator, SyncSummary, SystemClock};
use crate::tcx::{EncodedWorkout, FileEncoder};

#[cfg(any(feature = "provider-strava", feature = "provider-garmin"))]
use crate::constants::platforms;
#[cfg(feature = "provider-aimharder")]
use crate::providers::aimharder_provider::AimharderProvider;
#[cfg(feature = "provider-aimharder")]
use crate::routes::SyncJob;
#[cfg(feature = "provider-garmin")]
use crate::providers::garmin_provider::GarminProvider;
#[cfg(feature = "provider-strava")]
use crate::providers::strava_provider::StravaProvider;

/// Everything one batch produced
#[derive(Debug, Clone, Default)]
pub struct SyncRun {
    /// Workouts parsed from the source, in source order
    pub workouts: Vec<Workout>,
    /// Files encoded for those workouts
    pub files: Vec<EncodedWorkout>,
    /// Per-item outcomes and counters
    pub summary: SyncSummary,
}

/// Fetch, parse, encode, and sync driven by one [`AppConfig`]
pub struct SyncPipeline {
    config: AppConfig,
    clock: Arc<dyn Clock>,
}

impl SyncPipeline {
    /// Pipeline on wall-clock time
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for windows, pacing, polling, and timestamps
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Window ending today and reaching back `days` days
    #[must_use]
    pub fn window_for_days(&self, days: u32) -> DateWindow {
        DateWindow::last_days(self.clock.now().date_naive(), days)
    }

    /// Options from configuration: configured platforms, no force, no dry run
    #[must_use]
    pub fn default_options(&self) -> SyncOptions {
        SyncOptions {
            platforms: self.config.sync.platforms.clone(),
            poll: self.config.sync.poll_policy(),
            ..SyncOptions::default()
        }
    }

    /// Parser bound to `window` and the configured box
    #[must_use]
    pub fn parser(&self, window: Option<DateWindow>) -> ActivityParser {
        ActivityParser::new(ParseContext {
            window,
            venue_name: self.config.aimharder.box_name.clone().unwrap_or_default(),
            venue_id: self.config.aimharder.box_id.clone(),
        })
    }

    /// Encoder writing to the configured TCX directory
    #[must_use]
    pub fn encoder(&self) -> FileEncoder {
        FileEncoder::new(
            self.config.storage.tcx_dir(),
            self.config.sync.default_duration(),
        )
    }

    /// Token file shared by the destination clients
    #[must_use]
    pub fn token_store(&self) -> TokenStore {
        TokenStore::new(self.config.storage.tokens_file())
    }

    /// History loaded from the configured file
    ///
    /// # Errors
    ///
    /// Returns a storage error when the file exists but cannot be read.
    pub async fn load_history(&self) -> AppResult<HistoryStore> {
        HistoryStore::load(self.config.storage.history_file()).await
    }

    /// Source client from configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` for an incomplete account, or an error when the
    /// HTTP client cannot be built.
    #[cfg(feature = "provider-aimharder")]
    pub fn source(&self) -> AppResult<AimharderProvider> {
        AimharderProvider::new(self.config.aimharder_config()?).map_err(AppError::from)
    }

    /// Destination client for `platform`
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown platforms, platforms not
    /// compiled into this build, or incomplete credentials.
    pub fn destination(&self, platform: &str) -> AppResult<Arc<dyn DestinationClient>> {
        match platform {
            #[cfg(feature = "provider-strava")]
            platforms::STRAVA => Ok(Arc::new(StravaProvider::new(
                self.config.strava_config()?,
                self.token_store(),
            ))),
            #[cfg(feature = "provider-garmin")]
            platforms::GARMIN => Ok(Arc::new(GarminProvider::new(
                self.config.garmin_config(),
                self.token_store(),
            )?)),
            other => Err(AppError::config_invalid(format!(
                "platform {other} is not available in this build"
            ))),
        }
    }

    /// Log in to the source and parse every record dated inside `window`
    ///
    /// `cancel` is checked before the login and before every record pulled
    /// from the feed, so no further page is requested once it fires. The
    /// records read so far are still parsed and returned.
    ///
    /// # Errors
    ///
    /// Returns the source's authentication error, or the first error raised
    /// while paging the activity feed.
    pub async fn fetch_workouts(
        &self,
        source: &dyn SourceClient,
        window: DateWindow,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<Workout>> {
        if cancel.is_cancelled() {
            warn!(source = source.name(), "Fetch cancelled before login");
            return Ok(Vec::new());
        }
        source.login().await?;

        let config = StreamConfig::with_page_delay(self.config.sync.page_delay());
        let mut stream = create_activity_stream(source, config);
        let mut records = Vec::new();
        while !cancel.is_cancelled() {
            match stream.try_next().await? {
                Some(record) => records.push(record),
                None => break,
            }
        }
        if cancel.is_cancelled() {
            warn!(
                source = source.name(),
                records = records.len(),
                "Fetch cancelled, feed not fully read"
            );
        }

        let workouts = self.parser(Some(window)).parse_all(&records);
        info!(
            source = source.name(),
            records = records.len(),
            workouts = workouts.len(),
            start = %window.start,
            end = %window.end,
            "Fetched workouts"
        );
        Ok(workouts)
    }

    /// Encode `workouts` into the configured TCX directory
    pub async fn encode(&self, workouts: &[Workout]) -> Vec<EncodedWorkout> {
        self.encoder().generate_all(workouts).await
    }

    /// Run one batch with explicit collaborators
    ///
    /// # Errors
    ///
    /// Returns source errors, history storage errors, and the fatal errors
    /// of [`SyncOrchestrator::run`]. A batch cancelled while fetching returns
    /// a cancelled summary without encoding or touching history.
    pub async fn run_with(
        &self,
        source: &dyn SourceClient,
        destinations: Vec<Arc<dyn DestinationClient>>,
        window: DateWindow,
        options: SyncOptions,
        cancel: CancellationToken,
    ) -> AppResult<SyncRun> {
        let workouts = self.fetch_workouts(source, window, &cancel).await?;
        if cancel.is_cancelled() {
            info!(workouts = workouts.len(), "Batch cancelled before encoding");
            return Ok(SyncRun {
                workouts,
                files: Vec::new(),
                summary: SyncSummary {
                    cancelled: true,
                    ..SyncSummary::default()
                },
            });
        }
        if workouts.is_empty() {
            info!("No workouts in range");
            return Ok(SyncRun::default());
        }

        let files = self.encode(&workouts).await;
        let mut history = self.load_history().await?;
        let orchestrator = destinations.into_iter().fold(
            SyncOrchestrator::new(options, Arc::clone(&self.clock), cancel),
            SyncOrchestrator::with_destination,
        );
        let summary = orchestrator.run(&workouts, &files, &mut history).await?;
        Ok(SyncRun {
            workouts,
            files,
            summary,
        })
    }

    /// Run one batch with clients built from configuration
    ///
    /// # Errors
    ///
    /// Returns configuration errors before any network access, then the
    /// errors of [`Self::run_with`].
    #[cfg(feature = "provider-aimharder")]
    pub async fn run(
        &self,
        window: DateWindow,
        options: SyncOptions,
        cancel: CancellationToken,
    ) -> AppResult<SyncRun> {
        self.config.validate_for(&options.platforms)?;
        let source = self.source()?;
        let destinations = options
            .platforms
            .iter()
            .map(|platform| self.destination(platform))
            .collect::<AppResult<Vec<_>>>()?;
        self.run_with(&source, destinations, window, options, cancel)
            .await
    }
}

#[cfg(feature = "provider-aimharder")]
#[async_trait]
impl SyncJob for SyncPipeline {
    async fn run(&self, days: u32) -> AppResult<SyncSummary> {
        let window = self.window_for_days(days);
        let run = Self::run(self, window, self.default_options(), CancellationToken::new()).await?;
        Ok(run.summary)
    }
}
