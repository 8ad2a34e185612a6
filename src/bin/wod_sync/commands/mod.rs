// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors
// ABOUTME: Re-exports command modules for wod-sync
// ABOUTME: Provides sync, fetch, export, status, auth, and serve commands

pub mod auth;
pub mod export;
pub mod fetch;
pub mod serve;
pub mod status;
pub mod sync;
