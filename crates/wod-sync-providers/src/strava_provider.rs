// ABOUTME: Strava destination client using OAuth2 tokens from the shared tokens file
// ABOUTME: Uploads TCX files, polls upload processing, and lists activities for duplicate detection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::multipart::Form;
use reqwest::{Client, Response};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use crate::constants::platforms::STRAVA;
use crate::constants::timing::{STRAVA_PACING_MS, TOKEN_REFRESH_MARGIN_SECS};
use crate::core::{DestinationClient, RemoteActivity, UploadHandle, UploadMetadata, UploadStatus};
use crate::errors::provider::{ProviderError, ProviderResult};
use crate::http_client::shared_client;
use crate::models::WorkoutType;
use crate::utils::{
    error_from_response, file_part, is_duplicate_message, needs_token_refresh, StravaTokens,
    TokenStore,
};

/// Scopes needed to upload and to list existing activities
pub const STRAVA_SCOPES: &str = "activity:write,activity:read_all";

/// Status text Strava reports once an upload became an activity
const READY_STATUS: &str = "Your activity is ready.";

const ACTIVITIES_PER_PAGE: usize = 100;

static DUPLICATE_ACTIVITY_ID: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"activities/(\d+)").ok());

/// Strava application settings
#[derive(Debug, Clone)]
pub struct StravaConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Redirect URI registered with the application
    pub redirect_uri: String,
    /// Authorization page
    pub auth_url: String,
    /// Token endpoint
    pub token_url: String,
    /// REST API base
    pub api_base_url: String,
}

impl StravaConfig {
    /// Settings pointing at the public Strava endpoints
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            auth_url: "https://www.strava.com/oauth/authorize".to_owned(),
            token_url: "https://www.strava.com/oauth/token".to_owned(),
            api_base_url: "https://www.strava.com/api/v3".to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_at: i64,
    #[serde(default)]
    athlete: Option<AthleteSummary>,
}

#[derive(Debug, Deserialize)]
struct AthleteSummary {
    id: i64,
}

/// Upload record returned by `/uploads` and `/uploads/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StravaUpload {
    /// Upload identifier
    #[serde(default)]
    pub id: i64,
    /// Processing error text
    #[serde(default)]
    pub error: Option<String>,
    /// Processing status text
    #[serde(default)]
    pub status: Option<String>,
    /// Created activity, once processing finished
    #[serde(default)]
    pub activity_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StravaActivity {
    id: i64,
    start_date: DateTime<Utc>,
    #[serde(default)]
    external_id: Option<String>,
}

/// Strava destination client
pub struct StravaProvider {
    config: StravaConfig,
    store: TokenStore,
    tokens: RwLock<Option<StravaTokens>>,
    client: &'static Client,
}

impl StravaProvider {
    /// Create a client whose tokens live in `store`
    #[must_use]
    pub fn new(config: StravaConfig, store: TokenStore) -> Self {
        Self {
            config,
            store,
            tokens: RwLock::new(None),
            client: shared_client(),
        }
    }

    /// URL the user opens to grant access
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the authorization URL is malformed.
    pub fn authorization_url(&self, state: &str) -> ProviderResult<String> {
        let url = Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("approval_prompt", "auto"),
                ("scope", STRAVA_SCOPES),
                ("state", state),
            ],
        )
        .map_err(|e| ProviderError::not_configured(STRAVA, format!("bad auth URL: {e}")))?;
        Ok(url.into())
    }

    /// Exchange an authorization code for tokens and persist them
    ///
    /// # Errors
    ///
    /// Returns an authentication error if Strava rejects the code.
    pub async fn exchange_code(&self, code: &str) -> ProviderResult<StravaTokens> {
        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(as_auth_error(error_from_response(STRAVA, response).await));
        }
        let token_response: TokenResponse = parse_json(response, "token response").await?;
        let tokens = StravaTokens {
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token.unwrap_or_default(),
            expires_at: timestamp(token_response.expires_at),
            athlete_id: token_response.athlete.map(|athlete| athlete.id),
        };
        self.store.save_strava(&tokens).await?;
        *self.tokens.write().await = Some(tokens.clone());
        info!(athlete_id = ?tokens.athlete_id, "Stored Strava tokens");
        Ok(tokens)
    }

    async fn refresh(&self, current: &StravaTokens) -> ProviderResult<StravaTokens> {
        info!("Refreshing Strava access token");
        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", current.refresh_token.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(as_auth_error(error_from_response(STRAVA, response).await));
        }
        let token_response: TokenResponse = parse_json(response, "token response").await?;
        Ok(StravaTokens {
            access_token: token_response.access_token,
            refresh_token: token_response
                .refresh_token
                .filter(|token| !token.is_empty())
                .unwrap_or_else(|| current.refresh_token.clone()),
            expires_at: timestamp(token_response.expires_at),
            athlete_id: current.athlete_id,
        })
    }

    async fn access_token(&self) -> ProviderResult<String> {
        self.ensure_authenticated().await?;
        self.tokens
            .read()
            .await
            .as_ref()
            .map(|tokens| tokens.access_token.clone())
            .ok_or_else(not_authenticated)
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl DestinationClient for StravaProvider {
    fn platform(&self) -> &'static str {
        STRAVA
    }

    fn pacing(&self) -> Duration {
        Duration::from_millis(STRAVA_PACING_MS)
    }

    fn activity_type(&self, workout_type: WorkoutType) -> &'static str {
        match workout_type {
            WorkoutType::Strength => "WeightTraining",
            _ => "Crossfit",
        }
    }

    async fn ensure_authenticated(&self) -> ProviderResult<()> {
        if self.config.client_id.is_empty() || self.config.client_secret.is_empty() {
            return Err(ProviderError::not_configured(
                STRAVA,
                "client ID and secret are required (STRAVA_CLIENT_ID, STRAVA_CLIENT_SECRET)",
            ));
        }

        let mut guard = self.tokens.write().await;
        if guard.is_none() {
            *guard = self.store.strava().await?;
        }
        let current = guard
            .as_ref()
            .filter(|tokens| !tokens.access_token.is_empty())
            .ok_or_else(not_authenticated)?;

        if needs_token_refresh(current.expires_at, Utc::now(), TOKEN_REFRESH_MARGIN_SECS) {
            let refreshed = self.refresh(current).await?;
            self.store.save_strava(&refreshed).await?;
            *guard = Some(refreshed);
        }
        Ok(())
    }

    async fn list_activities_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ProviderResult<Vec<RemoteActivity>> {
        let token = self.access_token().await?;
        let url = self.api_url("athlete/activities");
        let mut remote = Vec::new();

        for page in 1.. {
            let response = self
                .client
                .get(&url)
                .bearer_auth(&token)
                .query(&[
                    ("after", start.timestamp().to_string()),
                    ("before", end.timestamp().to_string()),
                    ("page", page.to_string()),
                    ("per_page", ACTIVITIES_PER_PAGE.to_string()),
                ])
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(error_from_response(STRAVA, response).await);
            }
            let activities: Vec<StravaActivity> = parse_json(response, "activity list").await?;
            let count = activities.len();
            remote.extend(activities.into_iter().map(|activity| RemoteActivity {
                external_id: activity.external_id.filter(|id| !id.is_empty()),
                remote_id: activity.id.to_string(),
                start_time: activity.start_date,
            }));
            if count < ACTIVITIES_PER_PAGE {
                break;
            }
        }

        debug!(count = remote.len(), "Listed Strava activities in range");
        Ok(remote)
    }

    async fn upload(&self, path: &Path, metadata: &UploadMetadata) -> ProviderResult<UploadHandle> {
        let token = self.access_token().await?;
        let name = if metadata.name.is_empty() {
            format!("CrossFit WOD - {}", metadata.start_time.format("%Y-%m-%d"))
        } else {
            metadata.name.clone()
        };

        let mut form = Form::new()
            .part("file", file_part(STRAVA, path).await?)
            .text("data_type", "tcx")
            .text("activity_type", self.activity_type(metadata.workout_type))
            .text("name", name)
            .text("external_id", metadata.external_id.clone());
        if !metadata.description.is_empty() {
            form = form.text("description", metadata.description.clone());
        }

        let response = self
            .client
            .post(self.api_url("uploads"))
            .bearer_auth(&token)
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(STRAVA, response).await);
        }

        let upload: StravaUpload = parse_json(response, "upload response").await?;
        let id = upload.id.to_string();
        let status = interpret_upload(&upload);
        Ok(if status.is_terminal() {
            UploadHandle::settled(id, status)
        } else {
            UploadHandle::pending(id)
        })
    }

    async fn poll_status(&self, handle: &UploadHandle) -> ProviderResult<UploadStatus> {
        if let Some(settled) = &handle.settled {
            return Ok(settled.clone());
        }
        let token = self.access_token().await?;
        let response = self
            .client
            .get(self.api_url(&format!("uploads/{}", handle.id)))
            .bearer_auth(&token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(STRAVA, response).await);
        }
        let upload: StravaUpload = parse_json(response, "upload status").await?;
        Ok(interpret_upload(&upload))
    }
}

/// Map an upload record onto the generic status
///
/// A duplicate error carries the existing activity's link, which becomes the
/// remote ID.
#[must_use]
pub fn interpret_upload(upload: &StravaUpload) -> UploadStatus {
    if let Some(error) = upload.error.as_deref().filter(|error| !error.is_empty()) {
        if is_duplicate_message(error) {
            return UploadStatus {
                remote_id: duplicate_activity_id(error),
                ..UploadStatus::duplicate(Some(error.to_owned()))
            };
        }
        return UploadStatus::failed(error);
    }
    if let Some(activity_id) = upload.activity_id.filter(|id| *id != 0) {
        return UploadStatus::created(activity_id.to_string());
    }
    if upload.status.as_deref() == Some(READY_STATUS) {
        return UploadStatus {
            done: true,
            ..UploadStatus::default()
        };
    }
    UploadStatus::default()
}

fn duplicate_activity_id(message: &str) -> Option<String> {
    DUPLICATE_ACTIVITY_ID
        .as_ref()?
        .captures(message)?
        .get(1)
        .map(|id| id.as_str().to_owned())
}

fn timestamp(epoch_secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(epoch_secs, 0).unwrap_or_else(Utc::now)
}

fn not_authenticated() -> ProviderError {
    ProviderError::auth(
        STRAVA,
        "not authenticated with Strava, run `wod-sync auth strava` first",
    )
}

fn as_auth_error(error: ProviderError) -> ProviderError {
    match error {
        ProviderError::ApiError {
            status_code,
            message,
            ..
        } if (400..500).contains(&status_code) => {
            ProviderError::auth(STRAVA, format!("{status_code} {message}"))
        }
        other => other,
    }
}

async fn parse_json<T>(response: Response, field: &'static str) -> ProviderResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|source| ProviderError::ParseError {
        provider: STRAVA.to_owned(),
        field,
        source,
    })
}
