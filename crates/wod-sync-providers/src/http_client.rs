// ABOUTME: Shared HTTP clients for platform API calls
// ABOUTME: Pooled bearer-token client plus cookie-carrying session clients with configured timeouts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::{Client, ClientBuilder};

use crate::errors::provider::ProviderError;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default connection timeout in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Browser user agent; the gym platform and Garmin SSO reject unknown agents
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Configured timeout values for all clients
static CLIENT_TIMEOUTS: OnceLock<(u64, u64)> = OnceLock::new();

/// Global shared client for token-authenticated APIs
static SHARED_CLIENT: OnceLock<Client> = OnceLock::new();

/// Initialize the timeout configuration
///
/// Must be called once at startup before any client is built. If not called,
/// defaults are used (60s timeout, 10s connect timeout).
pub fn initialize_shared_client(timeout_secs: u64, connect_timeout_secs: u64) {
    let _ = CLIENT_TIMEOUTS.set((timeout_secs, connect_timeout_secs));
}

fn timeouts() -> (Duration, Duration) {
    let (timeout, connect_timeout) = CLIENT_TIMEOUTS
        .get()
        .copied()
        .unwrap_or((DEFAULT_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS));
    (
        Duration::from_secs(timeout),
        Duration::from_secs(connect_timeout),
    )
}

/// Shared client for bearer-token APIs
///
/// Uses connection pooling and the configured timeouts.
pub fn shared_client() -> &'static Client {
    SHARED_CLIENT.get_or_init(|| {
        let (timeout, connect_timeout) = timeouts();
        ClientBuilder::new()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .unwrap_or_else(|_| Client::new())
    })
}

/// Build a client that keeps cookies in `jar` across requests
///
/// Session-based platforms authenticate through cookies, so each of them gets
/// its own jar instead of sharing the pooled client.
///
/// # Errors
///
/// Returns `ProviderError::NetworkError` if the TLS backend cannot be
/// initialized.
pub fn build_session_client(jar: Arc<Jar>) -> Result<Client, ProviderError> {
    let (timeout, connect_timeout) = timeouts();
    ClientBuilder::new()
        .cookie_provider(jar)
        .user_agent(BROWSER_USER_AGENT)
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .build()
        .map_err(ProviderError::from)
}
