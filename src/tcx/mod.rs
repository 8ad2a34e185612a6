// ABOUTME: FileEncoder writing workouts as TCX files with a synthesized heart-rate track
// ABOUTME: Batch encoding tolerates per-workout failures and reports which workouts were written
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

//! # TCX encoding
//!
//! Workouts are written as Training Center Database v2 files, the format
//! both destinations accept for activities without GPS. See
//! [`heart_rate`] for the synthesized signal.

mod document;
mod filename;
/// Synthesized heart-rate series
pub mod heart_rate;

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

use crate::constants::workout_defaults;
use crate::errors::{AppError, ErrorCode};
use crate::models::Workout;

pub use document::{render_tcx, start_time, SPORT};
pub use filename::{file_name, slugify, start_hhmm, EXTENSION, MAX_SLUG_CHARS};

/// Failure to write one encoded workout
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Creating the output directory or writing the file failed
    #[error("failed to write {path}: {source}")]
    Io {
        /// Path being written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl From<EncodeError> for AppError {
    fn from(error: EncodeError) -> Self {
        let message = error.to_string();
        Self::new(ErrorCode::StorageError, message).with_source(error)
    }
}

/// A workout and the file it was encoded to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedWorkout {
    /// Source workout ID
    pub workout_id: String,
    /// Written file
    pub path: PathBuf,
}

/// Writes workouts to TCX files in one directory
#[derive(Debug, Clone)]
pub struct FileEncoder {
    output_dir: PathBuf,
    default_duration: Duration,
}

impl FileEncoder {
    /// Encoder writing into `output_dir`
    ///
    /// A zero `default_duration` is replaced by the standard 60 minutes.
    pub fn new(output_dir: impl Into<PathBuf>, default_duration: Duration) -> Self {
        let default_duration = if default_duration.is_zero() {
            Duration::from_secs(workout_defaults::DURATION_MINUTES * 60)
        } else {
            default_duration
        };
        Self {
            output_dir: output_dir.into(),
            default_duration,
        }
    }

    /// Directory files are written to
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Explicit duration, then result elapsed time, then the default
    #[must_use]
    pub fn duration_for(&self, workout: &Workout) -> Duration {
        workout
            .effective_duration()
            .filter(|duration| !duration.is_zero())
            .unwrap_or(self.default_duration)
    }

    /// TCX document for `workout` without touching the filesystem
    #[must_use]
    pub fn render(&self, workout: &Workout) -> String {
        render_tcx(workout, start_time(workout), self.duration_for(workout))
    }

    /// Encode one workout, creating the output directory when missing
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::Io`] when the directory or file cannot be written.
    pub async fn generate(&self, workout: &Workout) -> Result<PathBuf, EncodeError> {
        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| EncodeError::Io {
                path: self.output_dir.clone(),
                source,
            })?;

        let path = self.output_dir.join(file_name(workout));
        fs::write(&path, self.render(workout))
            .await
            .map_err(|source| EncodeError::Io {
                path: path.clone(),
                source,
            })?;

        debug!(workout_id = %workout.id, path = %path.display(), "Encoded workout");
        Ok(path)
    }

    /// Encode every workout, skipping the ones that fail
    pub async fn generate_all(&self, workouts: &[Workout]) -> Vec<EncodedWorkout> {
        let mut encoded = Vec::with_capacity(workouts.len());
        for workout in workouts {
            match self.generate(workout).await {
                Ok(path) => encoded.push(EncodedWorkout {
                    workout_id: workout.id.clone(),
                    path,
                }),
                Err(error) => {
                    warn!(workout_id = %workout.id, %error, "Failed to encode workout");
                }
            }
        }
        encoded
    }
}
