// ABOUTME: Platform clients for reading workouts from the gym platform and publishing them
// ABOUTME: Collaborator traits, paginated activity streaming, token storage, and HTTP plumbing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

#![deny(unsafe_code)]

//! Source and destination platform clients.
//!
//! The sync engine only talks to the traits in [`core`]; the concrete
//! clients are compiled in behind cargo features.

pub use wod_sync_core::constants;
pub use wod_sync_core::errors;
pub use wod_sync_core::models;
pub use wod_sync_core::pagination;

/// Streaming iteration over the paginated source activity feed
pub mod activity_iterator;
/// Collaborator traits and the types exchanged through them
pub mod core;
/// Shared HTTP client construction
pub mod http_client;
/// Token persistence and request helpers
pub mod utils;

/// Aimharder gym platform source client
#[cfg(feature = "provider-aimharder")]
pub mod aimharder_provider;
/// Garmin Connect destination client
#[cfg(feature = "provider-garmin")]
pub mod garmin_provider;
/// Strava destination client
#[cfg(feature = "provider-strava")]
pub mod strava_provider;

pub use activity_iterator::{
    collect_activities, create_activity_stream, ActivityStreamExt, RawActivityStream, StreamConfig,
};
pub use core::{
    DestinationClient, RemoteActivity, SourceClient, UploadHandle, UploadMetadata, UploadStatus,
};
pub use http_client::{build_session_client, initialize_shared_client, shared_client};
pub use utils::{GarminSession, StravaTokens, TokenStore};
pub use wod_sync_core::errors::provider::{ProviderError, ProviderResult};
