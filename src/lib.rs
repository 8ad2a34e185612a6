// ABOUTME: Main library entry point for the wod-sync workout publisher
// ABOUTME: Parses gym platform records, encodes TCX files, and syncs them to fitness platforms
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

// Crate-level attributes:
// - deny(unsafe_code): Zero-tolerance unsafe policy
#![deny(unsafe_code)]

//! # wod-sync
//!
//! Publishes CrossFit workouts logged on Aimharder as activities on Strava
//! and Garmin Connect.
//!
//! ## Pipeline
//!
//! 1. The source client pages raw activity records ([`providers`]).
//! 2. [`parser::ActivityParser`] normalizes them into [`models::Workout`]s.
//! 3. [`tcx::FileEncoder`] writes one TCX file per workout with a
//!    synthesized heart-rate track.
//! 4. [`sync::SyncOrchestrator`] decides what to upload, checks for
//!    existing activities, drives uploads, and records attempts in
//!    [`history::HistoryStore`].
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use wod_sync::config::AppConfig;
//! use wod_sync::errors::AppResult;
//!
//! fn main() -> AppResult<()> {
//!     let config = AppConfig::load(None)?;
//!     println!("History file: {}", config.storage.history_file().display());
//!     Ok(())
//! }
//! ```

// Re-export the foundation crates so downstream code has one import root
pub use wod_sync_core::{constants, errors, formatters, models, pagination};
pub use wod_sync_providers as providers;

/// Configuration file and environment loading
pub mod config;

/// Persistent per-workout sync attempt log
pub mod history;

/// Structured logging setup
pub mod logging;

/// Raw activity record normalization
pub mod parser;

/// Fetch, encode, and sync wired together from configuration
pub mod pipeline;

/// Webhook HTTP routes
pub mod routes;

/// Sync decision engine and upload state machine
pub mod sync;

/// TCX training file encoding
pub mod tcx;
