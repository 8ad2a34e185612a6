// ABOUTME: SyncOrchestrator running a batch of encoded workouts against destination platforms
// ABOUTME: History predicate, remote duplicate check, paced uploads, outcome recording, one save per run
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use tracing::{debug, error, info, warn};

use super::cancel::CancellationToken;
use super::clock::Clock;
use super::upload::{UploadDriver, UploadOutcome};
use super::{ItemOutcome, ItemReport, SyncOptions, SyncSummary};
use crate::constants::sync_reasons;
use crate::errors::{AppError, AppResult};
use crate::history::HistoryStore;
use crate::models::{SyncStatus, Workout};
use crate::providers::{DestinationClient, RemoteActivity, UploadMetadata};
use crate::tcx::{self, EncodedWorkout};

/// Runs one sync batch
///
/// Per platform, in the order given by [`SyncOptions::platforms`]:
///
/// 1. Workouts with a successful attempt on that platform in history are
///    reported as already synced, unless `force` is set.
/// 2. If anything is left, the destination must authenticate. Failure aborts
///    the run.
/// 3. Activities already on the platform around the batch dates are listed.
///    A workout whose ID matches an activity's external ID is recorded as
///    `already_exists` and never uploaded. A failed listing is logged and the
///    batch continues, relying on the platform's own duplicate rejection.
/// 4. The rest are uploaded one at a time with the platform's pacing delay
///    between uploads.
///
/// History is saved once when the run ends, including after cancellation
/// or an authentication failure. Dry runs never upload and never save.
pub struct SyncOrchestrator {
    options: SyncOptions,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    destinations: Vec<Arc<dyn DestinationClient>>,
}

impl SyncOrchestrator {
    /// Orchestrator without destinations
    #[must_use]
    pub fn new(options: SyncOptions, clock: Arc<dyn Clock>, cancel: CancellationToken) -> Self {
        Self {
            options,
            clock,
            cancel,
            destinations: Vec::new(),
        }
    }

    /// Register the client for one destination platform
    #[must_use]
    pub fn with_destination(mut self, destination: Arc<dyn DestinationClient>) -> Self {
        self.destinations.push(destination);
        self
    }

    /// Options this orchestrator runs with
    #[must_use]
    pub const fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Sync `workouts` using the files in `files`
    ///
    /// Workouts without an encoded file are left out.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a requested platform has no client,
    /// the destination's authentication error when it cannot authenticate,
    /// or a storage error when history cannot be saved.
    pub async fn run(
        &self,
        workouts: &[Workout],
        files: &[EncodedWorkout],
        history: &mut HistoryStore,
    ) -> AppResult<SyncSummary> {
        let mut summary = SyncSummary::default();
        let outcome = self
            .run_platforms(workouts, files, history, &mut summary)
            .await;

        let saved = if self.options.dry_run {
            Ok(())
        } else {
            history.save().await
        };
        outcome?;
        saved?;

        info!(
            uploaded = summary.uploaded,
            skipped = summary.skipped,
            errors = summary.errors,
            cancelled = summary.cancelled,
            "Sync finished"
        );
        Ok(summary)
    }

    async fn run_platforms(
        &self,
        workouts: &[Workout],
        files: &[EncodedWorkout],
        history: &mut HistoryStore,
        summary: &mut SyncSummary,
    ) -> AppResult<()> {
        for platform in &self.options.platforms {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            let destination = self
                .destinations
                .iter()
                .find(|destination| destination.platform() == platform.as_str())
                .ok_or_else(|| {
                    AppError::config(format!("no client configured for platform {platform}"))
                })?;
            self.sync_platform(destination.as_ref(), workouts, files, history, summary)
                .await?;
            if summary.cancelled {
                break;
            }
        }
        Ok(())
    }

    async fn sync_platform(
        &self,
        destination: &dyn DestinationClient,
        workouts: &[Workout],
        files: &[EncodedWorkout],
        history: &mut HistoryStore,
        summary: &mut SyncSummary,
    ) -> AppResult<()> {
        let platform = destination.platform();
        let mut candidates: Vec<(&Workout, &Path)> = Vec::new();
        for workout in workouts {
            if !history.needs_sync(&workout.id, platform, self.options.force) {
                debug!(workout_id = %workout.id, platform, "Already synced");
                summary.push(report(workout, platform, ItemOutcome::AlreadySynced));
                continue;
            }
            match encoded_file(files, &workout.id) {
                Some(path) => candidates.push((workout, path)),
                None => debug!(workout_id = %workout.id, platform, "No encoded file, skipping"),
            }
        }

        if candidates.is_empty() {
            info!(platform, "Nothing to upload");
            return Ok(());
        }
        if self.cancel.is_cancelled() {
            summary.cancelled = true;
            return Ok(());
        }

        destination.ensure_authenticated().await.map_err(|err| {
            error!(platform, reason = %err, "Destination authentication failed");
            AppError::from(err)
        })?;

        let remote = self.remote_activities(destination, &candidates).await;
        let mut uploads_started = 0_usize;

        for (workout, path) in candidates {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            if let Some(remote_id) = matching_remote(&remote, &workout.id) {
                info!(
                    workout_id = %workout.id,
                    platform,
                    external_id = %remote_id,
                    reason = sync_reasons::ALREADY_EXISTS,
                    "Activity already on platform"
                );
                if !self.options.dry_run {
                    history.record(SyncStatus::skipped(
                        &workout.id,
                        platform,
                        Some(remote_id.to_owned()),
                        sync_reasons::ALREADY_EXISTS,
                        self.clock.now(),
                    ));
                }
                summary.push(report(
                    workout,
                    platform,
                    ItemOutcome::AlreadyExists {
                        remote_id: remote_id.to_owned(),
                    },
                ));
                continue;
            }

            if self.options.dry_run {
                summary.push(report(workout, platform, ItemOutcome::WouldUpload));
                continue;
            }

            if uploads_started > 0 {
                self.clock.sleep(destination.pacing()).await;
                if self.cancel.is_cancelled() {
                    summary.cancelled = true;
                    break;
                }
            }
            uploads_started += 1;

            let metadata = upload_metadata(workout);
            let outcome = UploadDriver::new(
                destination,
                self.clock.as_ref(),
                &self.cancel,
                self.options.poll,
            )
            .run(path, &metadata)
            .await;

            let Some(item) = self.record_outcome(history, workout, platform, outcome) else {
                summary.push(report(workout, platform, ItemOutcome::Cancelled));
                break;
            };
            summary.push(report(workout, platform, item));
        }
        Ok(())
    }

    /// Record a finished upload; `None` when it was cancelled
    fn record_outcome(
        &self,
        history: &mut HistoryStore,
        workout: &Workout,
        platform: &str,
        outcome: UploadOutcome,
    ) -> Option<ItemOutcome> {
        let now = self.clock.now();
        match outcome {
            UploadOutcome::Succeeded { remote_id } => {
                info!(
                    workout_id = %workout.id,
                    platform,
                    external_id = remote_id.as_deref().unwrap_or_default(),
                    "Uploaded"
                );
                history.record(SyncStatus::uploaded(
                    &workout.id,
                    platform,
                    remote_id.clone(),
                    now,
                ));
                Some(ItemOutcome::Uploaded { remote_id })
            }
            UploadOutcome::DuplicateSucceeded { remote_id, message } => {
                info!(
                    workout_id = %workout.id,
                    platform,
                    external_id = remote_id.as_deref().unwrap_or_default(),
                    reason = message.as_deref().unwrap_or(sync_reasons::DUPLICATE),
                    "Platform reported duplicate"
                );
                history.record(SyncStatus::skipped(
                    &workout.id,
                    platform,
                    remote_id.clone(),
                    sync_reasons::DUPLICATE,
                    now,
                ));
                Some(ItemOutcome::Duplicate { remote_id })
            }
            UploadOutcome::Failed { reason } => {
                warn!(workout_id = %workout.id, platform, reason = %reason, "Upload failed");
                history.record(SyncStatus::failed(&workout.id, platform, reason.clone(), now));
                Some(ItemOutcome::Failed { reason })
            }
            UploadOutcome::Cancelled => {
                info!(workout_id = %workout.id, platform, "Upload cancelled");
                None
            }
        }
    }

    async fn remote_activities(
        &self,
        destination: &dyn DestinationClient,
        candidates: &[(&Workout, &Path)],
    ) -> Vec<RemoteActivity> {
        let dates = candidates.iter().map(|(workout, _)| workout.date);
        let (Some(first), Some(last)) = (dates.clone().min(), dates.max()) else {
            return Vec::new();
        };
        if self.cancel.is_cancelled() {
            return Vec::new();
        }

        let (start, end) = listing_range(first, last);
        match destination.list_activities_in_range(start, end).await {
            Ok(activities) => {
                debug!(
                    platform = destination.platform(),
                    count = activities.len(),
                    "Listed existing activities"
                );
                activities
            }
            Err(err) => {
                warn!(
                    platform = destination.platform(),
                    reason = %err,
                    "Could not list existing activities, relying on duplicate detection"
                );
                Vec::new()
            }
        }
    }
}

/// `[first - 1 day, last + 1 day]` as UTC instants
fn listing_range(first: NaiveDate, last: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = first.checked_sub_days(Days::new(1)).unwrap_or(first);
    let end = last.checked_add_days(Days::new(1)).unwrap_or(last);
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    (
        start.and_time(NaiveTime::MIN).and_utc(),
        end.and_time(end_of_day).and_utc(),
    )
}

/// Remote ID of the activity carrying `workout_id` as its external ID
fn matching_remote<'a>(remote: &'a [RemoteActivity], workout_id: &str) -> Option<&'a str> {
    remote
        .iter()
        .find(|activity| {
            activity.external_id.as_deref().is_some_and(|external_id| {
                external_id == workout_id
                    || external_id.strip_suffix(".tcx") == Some(workout_id)
            })
        })
        .map(|activity| activity.remote_id.as_str())
}

fn encoded_file<'a>(files: &'a [EncodedWorkout], workout_id: &str) -> Option<&'a Path> {
    files
        .iter()
        .find(|file| file.workout_id == workout_id)
        .map(|file| file.path.as_path())
}

/// Metadata sent with the encoded file
#[must_use]
pub fn upload_metadata(workout: &Workout) -> UploadMetadata {
    UploadMetadata {
        external_id: workout.id.clone(),
        name: workout.name.clone(),
        description: workout.description.clone(),
        workout_type: workout.workout_type,
        start_time: tcx::start_time(workout),
    }
}

fn report(workout: &Workout, platform: &str, outcome: ItemOutcome) -> ItemReport {
    ItemReport {
        workout_id: workout.id.clone(),
        workout_name: workout.name.clone(),
        platform: platform.to_owned(),
        outcome,
    }
}
