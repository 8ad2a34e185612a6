// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors
// ABOUTME: Re-exports helper modules for wod-sync
// ABOUTME: Provides terminal display formatting

pub mod display;
