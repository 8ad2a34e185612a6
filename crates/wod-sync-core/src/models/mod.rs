// ABOUTME: Data model re-exports for workouts and sync history
// ABOUTME: Groups the workout model and the sync status record behind one module
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

mod sync;
mod workout;

pub use sync::SyncStatus;
pub use workout::{
    DateWindow, Exercise, ExerciseFormat, PrimaryQuantity, Scaling, Workout, WorkoutResult,
    WorkoutSection, WorkoutType,
};
