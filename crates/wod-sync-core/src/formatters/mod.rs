// ABOUTME: Text renderings of workouts for activity descriptions, file notes, and previews
// ABOUTME: Re-exports the description renderers used by the encoder, uploaders, and CLI
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

//! Workout text formatting
//!
//! ## Renderings
//!
//! - **breakdown**: per-section listing of notes, exercises, and results.
//!   Stored as the workout description and sent as the activity description.
//! - **activity notes**: compact summary embedded in the encoded file.
//! - **preview**: boxed dry-run block printed by the CLI.

/// Workout description renderers
pub mod description;

pub use description::{
    clean_html_entities, format_duration, render_activity_notes, render_breakdown,
    render_preview, PreviewContext,
};
