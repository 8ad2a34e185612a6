// ABOUTME: Core types and constants for the wod-sync workout publisher
// ABOUTME: Foundation crate with the workout model, error handling, pagination, and formatters
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

#![deny(unsafe_code)]

//! # wod-sync core
//!
//! Shared types for the sync engine. Everything here is pure data and text
//! rendering; no network or filesystem access happens in this crate.
//!
//! ## Modules
//!
//! - **errors**: `AppError`, `ErrorCode`, and the collaborator `ProviderError`
//! - **constants**: platform names, sync reasons, and timing defaults
//! - **pagination**: watermark cursor and page types for the source feed
//! - **formatters**: human-readable workout descriptions and activity notes
//! - **models**: the canonical workout model and sync history records

/// Unified error handling with stable error codes
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Watermark pagination for the source activity feed
pub mod pagination;

/// Text renderings of workouts
pub mod formatters;

/// Canonical workout model and sync records
pub mod models;
