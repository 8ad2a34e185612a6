// ABOUTME: Shared utilities for platform clients
// ABOUTME: Token file persistence, refresh checks, error mapping for HTTP responses, and upload parts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use reqwest::header::RETRY_AFTER;
use reqwest::multipart::Part;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::errors::provider::{ProviderError, ProviderResult};

const TOKENS: &str = "tokens";

/// Strava OAuth tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StravaTokens {
    /// Bearer token for API calls
    pub access_token: String,
    /// Token used to obtain a new access token
    pub refresh_token: String,
    /// Access token expiry
    pub expires_at: DateTime<Utc>,
    /// Authenticated athlete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub athlete_id: Option<i64>,
}

/// Garmin Connect session cookies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarminSession {
    /// `Cookie` header value for connect.garmin.com
    pub cookie_header: String,
    /// Display name of the account, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// When the session is assumed to lapse
    pub expires_at: DateTime<Utc>,
}

impl GarminSession {
    /// Garmin sessions usually last about a week
    pub const LIFETIME_DAYS: i64 = 7;

    /// Session created now from a cookie header
    pub fn new(cookie_header: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            cookie_header: cookie_header.into(),
            display_name: None,
            expires_at: now + Duration::days(Self::LIFETIME_DAYS),
        }
    }

    /// Whether the session is still usable at `now`
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.cookie_header.is_empty() && now < self.expires_at
    }
}

/// On-disk layout of the tokens file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenFile {
    /// Strava OAuth tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strava: Option<StravaTokens>,
    /// Garmin session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garmin: Option<GarminSession>,
}

/// Tokens file shared by all destination platforms
///
/// Each save rewrites the whole document, preserving the other platform's
/// section.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole tokens file; a missing file reads as empty
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(&self) -> ProviderResult<TokenFile> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No tokens file yet");
                return Ok(TokenFile::default());
            }
            Err(e) => {
                return Err(ProviderError::not_configured(
                    TOKENS,
                    format!("cannot read {}: {e}", self.path.display()),
                ))
            }
        };
        serde_json::from_slice(&bytes).map_err(|source| ProviderError::ParseError {
            provider: TOKENS.to_owned(),
            field: "tokens file",
            source,
        })
    }

    /// Strava tokens, if stored
    ///
    /// # Errors
    ///
    /// Propagates errors from [`TokenStore::load`].
    pub async fn strava(&self) -> ProviderResult<Option<StravaTokens>> {
        Ok(self.load().await?.strava)
    }

    /// Garmin session, if stored
    ///
    /// # Errors
    ///
    /// Propagates errors from [`TokenStore::load`].
    pub async fn garmin(&self) -> ProviderResult<Option<GarminSession>> {
        Ok(self.load().await?.garmin)
    }

    /// Replace the Strava section
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written.
    pub async fn save_strava(&self, tokens: &StravaTokens) -> ProviderResult<()> {
        let mut file = self.load().await?;
        file.strava = Some(tokens.clone());
        self.write(&file).await
    }

    /// Replace the Garmin section
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written.
    pub async fn save_garmin(&self, session: &GarminSession) -> ProviderResult<()> {
        let mut file = self.load().await?;
        file.garmin = Some(session.clone());
        self.write(&file).await
    }

    async fn write(&self, file: &TokenFile) -> ProviderResult<()> {
        let write_error = |e: io::Error| {
            ProviderError::not_configured(TOKENS, format!("cannot write {}: {e}", self.path.display()))
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(write_error)?;
        }
        let json = serde_json::to_vec_pretty(file).map_err(|source| ProviderError::ParseError {
            provider: TOKENS.to_owned(),
            field: "tokens file",
            source,
        })?;
        fs::write(&self.path, json).await.map_err(write_error)?;
        restrict_permissions(&self.path).await.map_err(write_error)
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, Permissions::from_mode(0o600)).await
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Whether a token expiring at `expires_at` should be refreshed at `now`
#[must_use]
pub fn needs_token_refresh(expires_at: DateTime<Utc>, now: DateTime<Utc>, margin_secs: i64) -> bool {
    now + Duration::seconds(margin_secs) > expires_at
}

/// Turn a non-success response into a `ProviderError`
///
/// 401 and 403 become authentication failures, 429 a rate limit, everything
/// else an API error that is retryable for 5xx statuses.
pub async fn error_from_response(provider: &str, response: Response) -> ProviderError {
    let status = response.status();
    let retry_after_secs = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::auth(
            provider,
            format!("{} {body}", status.as_u16()).trim_end().to_owned(),
        ),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded {
            provider: provider.to_owned(),
            retry_after_secs: retry_after_secs.unwrap_or(60),
        },
        _ => ProviderError::ApiError {
            provider: provider.to_owned(),
            status_code: status.as_u16(),
            message: body,
            retryable: status.is_server_error(),
        },
    }
}

/// Multipart part holding the file at `path`
///
/// # Errors
///
/// Returns `ProviderError::ConfigurationError` if the file cannot be read.
pub async fn file_part(provider: &str, path: &Path) -> ProviderResult<Part> {
    let bytes = fs::read(path).await.map_err(|e| {
        ProviderError::not_configured(provider, format!("cannot read {}: {e}", path.display()))
    })?;
    let file_name = path
        .file_name()
        .map_or_else(|| "workout.tcx".to_owned(), |name| name.to_string_lossy().into_owned());
    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("application/xml")
        .map_err(ProviderError::from)
}

/// Whether a platform message describes a duplicate upload
#[must_use]
pub fn is_duplicate_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("duplicate") || lowered.contains("already exists")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_token_refresh_margin() {
        let now = Utc::now();
        assert!(needs_token_refresh(now + Duration::seconds(200), now, 300));
        assert!(!needs_token_refresh(now + Duration::seconds(400), now, 300));
    }

    #[test]
    fn test_duplicate_messages() {
        assert!(is_duplicate_message("foo.tcx duplicate of activity 123"));
        assert!(is_duplicate_message("Activity Already Exists"));
        assert!(!is_duplicate_message("malformed file"));
    }

    #[tokio::test]
    async fn test_token_store_preserves_other_section() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join("tokens.json"));
        assert_eq!(store.load().await.unwrap(), TokenFile::default());

        let now = Utc::now();
        let strava = StravaTokens {
            access_token: "a".to_owned(),
            refresh_token: "r".to_owned(),
            expires_at: now,
            athlete_id: Some(7),
        };
        store.save_strava(&strava).await.unwrap();
        store
            .save_garmin(&GarminSession::new("SESSION=abc", now))
            .await
            .unwrap();

        let file = store.load().await.unwrap();
        assert_eq!(file.strava, Some(strava));
        assert!(file.garmin.unwrap().is_valid_at(now));
    }
}
