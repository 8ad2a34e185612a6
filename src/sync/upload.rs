// ABOUTME: Upload state machine driving one workout file through submit and status polling
// ABOUTME: Pending, Uploading, Polling until a terminal status, timeout, or cancellation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

//! # Upload state machine
//!
//! ```text
//! Pending ──▶ Uploading ──▶ Polling* ──▶ Done(Succeeded | DuplicateSucceeded | Failed)
//!    │                         │
//!    └──────── cancelled ──────┴──▶ Done(Cancelled)
//! ```
//!
//! Every transition is a call to [`UploadDriver::step`], so tests can walk
//! the machine one state at a time with a manual clock.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};

use super::cancel::CancellationToken;
use super::clock::Clock;
use crate::constants::{sync_reasons, timing};
use crate::providers::{DestinationClient, UploadHandle, UploadMetadata, UploadStatus};

/// How often and how long to poll for upload processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between status requests
    pub interval: Duration,
    /// Give up once this much time has passed since the upload
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(timing::POLL_INTERVAL_SECS),
            max_wait: Duration::from_secs(timing::MAX_UPLOAD_WAIT_SECS),
        }
    }
}

/// Terminal result of one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Platform created an activity
    Succeeded {
        /// Created activity ID, when reported
        remote_id: Option<String>,
    },
    /// Platform rejected the file as a duplicate of an existing activity
    DuplicateSucceeded {
        /// Existing activity ID, when reported
        remote_id: Option<String>,
        /// Platform message
        message: Option<String>,
    },
    /// Upload or processing failed
    Failed {
        /// Platform or transport error text
        reason: String,
    },
    /// Cancellation was requested before the upload concluded
    Cancelled,
}

impl UploadOutcome {
    fn from_status(status: UploadStatus) -> Self {
        if status.duplicate {
            Self::DuplicateSucceeded {
                remote_id: status.remote_id,
                message: status.error,
            }
        } else if let Some(reason) = status.error {
            Self::Failed { reason }
        } else {
            Self::Succeeded {
                remote_id: status.remote_id,
            }
        }
    }
}

/// States of one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    /// Not started
    Pending,
    /// File is being submitted
    Uploading,
    /// Waiting for the platform to finish processing
    Polling {
        /// Handle returned by the upload
        handle: UploadHandle,
        /// Time after which the upload counts as timed out
        deadline: DateTime<Utc>,
    },
    /// Finished
    Done(UploadOutcome),
}

/// Drives one file through the upload protocol of one destination
pub struct UploadDriver<'a> {
    destination: &'a dyn DestinationClient,
    clock: &'a dyn Clock,
    cancel: &'a CancellationToken,
    policy: PollPolicy,
}

impl<'a> UploadDriver<'a> {
    /// Driver for `destination`
    pub fn new(
        destination: &'a dyn DestinationClient,
        clock: &'a dyn Clock,
        cancel: &'a CancellationToken,
        policy: PollPolicy,
    ) -> Self {
        Self {
            destination,
            clock,
            cancel,
            policy,
        }
    }

    /// Run the machine from `Pending` to a terminal outcome
    pub async fn run(&self, path: &Path, metadata: &UploadMetadata) -> UploadOutcome {
        let mut state = UploadState::Pending;
        loop {
            state = match state {
                UploadState::Done(outcome) => return outcome,
                other => self.step(other, path, metadata).await,
            };
        }
    }

    /// Advance one transition
    pub async fn step(
        &self,
        state: UploadState,
        path: &Path,
        metadata: &UploadMetadata,
    ) -> UploadState {
        match state {
            UploadState::Pending => {
                if self.cancel.is_cancelled() {
                    UploadState::Done(UploadOutcome::Cancelled)
                } else {
                    UploadState::Uploading
                }
            }
            UploadState::Uploading => self.submit(path, metadata).await,
            UploadState::Polling { handle, deadline } => self.poll(handle, deadline).await,
            done @ UploadState::Done(_) => done,
        }
    }

    async fn submit(&self, path: &Path, metadata: &UploadMetadata) -> UploadState {
        let platform = self.destination.platform();
        match self.destination.upload(path, metadata).await {
            Err(error) => {
                warn!(
                    workout_id = %metadata.external_id,
                    platform,
                    reason = %error,
                    "Upload failed"
                );
                UploadState::Done(UploadOutcome::Failed {
                    reason: error.to_string(),
                })
            }
            Ok(handle) => match handle.settled.clone() {
                Some(status) if status.is_terminal() => {
                    UploadState::Done(UploadOutcome::from_status(status))
                }
                _ => {
                    debug!(
                        workout_id = %metadata.external_id,
                        platform,
                        upload_id = %handle.id,
                        "Upload accepted, polling for processing"
                    );
                    let max_wait =
                        TimeDelta::from_std(self.policy.max_wait).unwrap_or(TimeDelta::MAX);
                    let deadline = self
                        .clock
                        .now()
                        .checked_add_signed(max_wait)
                        .unwrap_or(DateTime::<Utc>::MAX_UTC);
                    UploadState::Polling { handle, deadline }
                }
            },
        }
    }

    async fn poll(&self, handle: UploadHandle, deadline: DateTime<Utc>) -> UploadState {
        if self.cancel.is_cancelled() {
            return UploadState::Done(UploadOutcome::Cancelled);
        }
        if self.clock.now() >= deadline {
            return UploadState::Done(UploadOutcome::Failed {
                reason: sync_reasons::TIMED_OUT.to_owned(),
            });
        }

        self.clock.sleep(self.policy.interval).await;
        if self.cancel.is_cancelled() {
            return UploadState::Done(UploadOutcome::Cancelled);
        }

        match self.destination.poll_status(&handle).await {
            Ok(status) if status.is_terminal() => {
                UploadState::Done(UploadOutcome::from_status(status))
            }
            Ok(_) => UploadState::Polling { handle, deadline },
            Err(error) if error.is_retryable() => {
                debug!(upload_id = %handle.id, reason = %error, "Retrying upload status");
                UploadState::Polling { handle, deadline }
            }
            Err(error) => UploadState::Done(UploadOutcome::Failed {
                reason: error.to_string(),
            }),
        }
    }
}
