// ABOUTME: Garmin Connect destination client driven by SSO session cookies
// ABOUTME: Logs in through the web SSO flow, uploads TCX files, and lists recent activities
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

//! # Garmin Connect client
//!
//! Garmin has no public upload API for personal accounts, so this client
//! behaves like the web app: it walks the SSO sign-in form, trades the
//! service ticket for session cookies and sends `NK: NT` on every API call.
//! Sessions are persisted in the shared tokens file and reused for a week.
//!
//! Uploads are processed synchronously, so every [`UploadHandle`] returned
//! here is already settled.

use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::constants::platforms::GARMIN;
use crate::constants::timing::GARMIN_PACING_MS;
use crate::core::{DestinationClient, RemoteActivity, UploadHandle, UploadMetadata, UploadStatus};
use crate::errors::provider::{ProviderError, ProviderResult};
use crate::http_client::build_session_client;
use crate::models::WorkoutType;
use crate::utils::{error_from_response, file_part, is_duplicate_message, GarminSession, TokenStore};

const ACTIVITY_LIMIT: usize = 100;

static CSRF_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r#"name="_csrf"\s+value="([^"]+)""#, r#""_csrf"\s*:\s*"([^"]+)""#]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
});

static TICKET_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"ticket=([A-Za-z0-9\-]+)").ok());

/// Garmin Connect settings
#[derive(Debug, Clone)]
pub struct GarminConfig {
    /// Account email, used when no stored session is valid
    pub email: Option<String>,
    /// Account password
    pub password: Option<String>,
    /// SSO host
    pub sso_url: String,
    /// Connect web host
    pub connect_url: String,
}

impl GarminConfig {
    /// Settings for the public Garmin hosts
    #[must_use]
    pub fn new(email: Option<String>, password: Option<String>) -> Self {
        Self {
            email,
            password,
            sso_url: "https://sso.garmin.com/sso".to_owned(),
            connect_url: "https://connect.garmin.com".to_owned(),
        }
    }

    fn modern_url(&self) -> String {
        format!("{}/modern", self.connect_url.trim_end_matches('/'))
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/upload-service/upload/.tcx",
            self.connect_url.trim_end_matches('/')
        )
    }

    fn activity_search_url(&self) -> String {
        format!(
            "{}/activitylist-service/activities/search/activities",
            self.connect_url.trim_end_matches('/')
        )
    }
}

/// Body of an upload response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GarminUploadResponse {
    /// Import outcome
    #[serde(default)]
    pub detailed_import_result: DetailedImportResult,
}

/// Per-file import outcome
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedImportResult {
    /// Upload identifier
    #[serde(default)]
    pub upload_id: Option<i64>,
    /// Activities created by the upload
    #[serde(default)]
    pub successes: Vec<ImportEntry>,
    /// Activities rejected by the upload
    #[serde(default)]
    pub failures: Vec<ImportEntry>,
}

/// One imported or rejected activity
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportEntry {
    /// Activity ID
    #[serde(default)]
    pub internal_id: Option<i64>,
    /// Messages explaining a rejection
    #[serde(default)]
    pub messages: Vec<ImportMessage>,
}

/// Rejection message
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportMessage {
    /// Numeric code
    #[serde(default)]
    pub code: Option<i64>,
    /// Human readable text
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminActivity {
    activity_id: i64,
    #[serde(rename = "startTimeGMT", default)]
    start_time_gmt: Option<String>,
}

/// Garmin Connect destination client
pub struct GarminProvider {
    config: GarminConfig,
    store: TokenStore,
    jar: Arc<Jar>,
    client: Client,
    session: RwLock<Option<GarminSession>>,
}

impl GarminProvider {
    /// Create a client with an empty cookie jar
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: GarminConfig, store: TokenStore) -> ProviderResult<Self> {
        let jar = Arc::new(Jar::default());
        let client = build_session_client(Arc::clone(&jar))?;
        Ok(Self {
            config,
            store,
            jar,
            client,
            session: RwLock::new(None),
        })
    }

    /// Store a session copied from a logged-in browser
    ///
    /// # Errors
    ///
    /// Returns an error if the tokens file cannot be written.
    pub async fn import_session(&self, cookie_header: &str) -> ProviderResult<GarminSession> {
        let session = GarminSession::new(cookie_header.trim(), Utc::now());
        if session.cookie_header.is_empty() {
            return Err(ProviderError::auth(GARMIN, "empty session cookie"));
        }
        self.install_session(&session)?;
        self.store.save_garmin(&session).await?;
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    /// Sign in with email and password and persist the resulting session
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::AuthenticationFailed` when Garmin rejects the
    /// credentials, the account is locked, or no ticket is issued.
    pub async fn login(&self) -> ProviderResult<GarminSession> {
        let (Some(email), Some(password)) = (
            self.config.email.as_deref().filter(|v| !v.is_empty()),
            self.config.password.as_deref().filter(|v| !v.is_empty()),
        ) else {
            return Err(ProviderError::not_configured(
                GARMIN,
                "no valid session and no credentials (GARMIN_EMAIL, GARMIN_PASSWORD)",
            ));
        };

        info!("Signing in to Garmin Connect");
        let signin_url = format!("{}/signin", self.config.sso_url.trim_end_matches('/'));
        let params = self.sso_params();

        let page = self.client.get(&signin_url).query(&params).send().await?;
        if !page.status().is_success() {
            return Err(error_from_response(GARMIN, page).await);
        }
        let page = page.text().await?;
        let csrf = extract_csrf(&page)
            .ok_or_else(|| ProviderError::auth(GARMIN, "sign-in page carried no CSRF token"))?;

        let response = self
            .client
            .post(&signin_url)
            .query(&params)
            .form(&[
                ("username", email),
                ("password", password),
                ("embed", "false"),
                ("_csrf", csrf.as_str()),
            ])
            .send()
            .await?;
        let final_url = response.url().to_string();
        let body = response.text().await?;
        check_signin_body(&body)?;

        let ticket = extract_ticket(&body)
            .or_else(|| extract_ticket(&final_url))
            .ok_or_else(|| ProviderError::auth(GARMIN, "sign-in returned no service ticket"))?;

        let exchange = self
            .client
            .get(self.config.modern_url())
            .query(&[("ticket", ticket.as_str())])
            .send()
            .await?;
        if !matches!(exchange.status(), StatusCode::OK | StatusCode::FOUND) {
            return Err(ProviderError::auth(
                GARMIN,
                format!("ticket exchange answered {}", exchange.status()),
            ));
        }

        let verify = connect_api(self.client.get(self.config.modern_url())).send().await?;
        if verify.status() != StatusCode::OK {
            return Err(ProviderError::auth(
                GARMIN,
                format!("session check answered {}", verify.status()),
            ));
        }

        let cookie_header = self
            .connect_url()
            .and_then(|url| self.jar.cookies(&url))
            .and_then(|value| value.to_str().ok().map(str::to_owned))
            .ok_or_else(|| ProviderError::auth(GARMIN, "no session cookies after sign-in"))?;

        let session = GarminSession::new(cookie_header, Utc::now());
        self.store.save_garmin(&session).await?;
        *self.session.write().await = Some(session.clone());
        info!("Garmin Connect session stored");
        Ok(session)
    }

    fn sso_params(&self) -> Vec<(&'static str, String)> {
        let modern = self.config.modern_url();
        let sso = self.config.sso_url.trim_end_matches('/');
        vec![
            ("service", modern.clone()),
            ("webhost", modern.clone()),
            ("source", format!("{}/signin", self.config.connect_url)),
            ("redirectAfterAccountLoginUrl", modern.clone()),
            ("redirectAfterAccountCreationUrl", modern),
            ("gauthHost", sso.to_owned()),
            ("locale", "en_US".to_owned()),
            ("id", "gauth-widget".to_owned()),
            ("clientId", "GarminConnect".to_owned()),
            ("rememberMeShown", "true".to_owned()),
            ("rememberMeChecked", "false".to_owned()),
            ("createAccountShown", "true".to_owned()),
            ("openCreateAccount", "false".to_owned()),
            ("displayNameShown", "false".to_owned()),
            ("consumeServiceTicket", "false".to_owned()),
            ("initialFocus", "true".to_owned()),
            ("embedWidget", "false".to_owned()),
            ("generateExtraServiceTicket", "true".to_owned()),
            ("generateTwoExtraServiceTickets", "false".to_owned()),
            ("generateNoServiceTicket", "false".to_owned()),
        ]
    }

    fn connect_url(&self) -> Option<Url> {
        Url::parse(&self.config.connect_url).ok()
    }

    fn install_session(&self, session: &GarminSession) -> ProviderResult<()> {
        let url = self.connect_url().ok_or_else(|| {
            ProviderError::not_configured(GARMIN, format!("bad connect URL {}", self.config.connect_url))
        })?;
        for pair in session.cookie_header.split(';').map(str::trim) {
            if !pair.is_empty() {
                self.jar.add_cookie_str(&format!("{pair}; Path=/"), &url);
            }
        }
        Ok(())
    }
}

fn connect_api(request: RequestBuilder) -> RequestBuilder {
    request.header("NK", "NT")
}

#[async_trait]
impl DestinationClient for GarminProvider {
    fn platform(&self) -> &'static str {
        GARMIN
    }

    fn pacing(&self) -> Duration {
        Duration::from_millis(GARMIN_PACING_MS)
    }

    fn activity_type(&self, workout_type: WorkoutType) -> &'static str {
        match workout_type {
            WorkoutType::Strength => "strength_training",
            _ => "indoor_cardio",
        }
    }

    async fn ensure_authenticated(&self) -> ProviderResult<()> {
        let now = Utc::now();
        if self
            .session
            .read()
            .await
            .as_ref()
            .is_some_and(|session| session.is_valid_at(now))
        {
            return Ok(());
        }

        if let Some(stored) = self.store.garmin().await? {
            if stored.is_valid_at(now) {
                debug!("Reusing stored Garmin session");
                self.install_session(&stored)?;
                *self.session.write().await = Some(stored);
                return Ok(());
            }
            warn!("Stored Garmin session expired");
        }

        self.login().await.map(|_| ())
    }

    async fn list_activities_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ProviderResult<Vec<RemoteActivity>> {
        self.ensure_authenticated().await?;
        let response = connect_api(self.client.get(self.config.activity_search_url()))
            .query(&[
                ("startDate", start.format("%Y-%m-%d").to_string()),
                ("endDate", end.format("%Y-%m-%d").to_string()),
                ("start", "0".to_owned()),
                ("limit", ACTIVITY_LIMIT.to_string()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(GARMIN, response).await);
        }
        let bytes = response.bytes().await?;
        let activities: Vec<GarminActivity> =
            serde_json::from_slice(&bytes).map_err(|source| ProviderError::ParseError {
                provider: GARMIN.to_owned(),
                field: "activity list",
                source,
            })?;

        Ok(activities
            .into_iter()
            .filter_map(|activity| {
                let start_time = parse_gmt(activity.start_time_gmt.as_deref()?)?;
                Some(RemoteActivity {
                    external_id: None,
                    remote_id: activity.activity_id.to_string(),
                    start_time,
                })
            })
            .collect())
    }

    async fn upload(&self, path: &Path, metadata: &UploadMetadata) -> ProviderResult<UploadHandle> {
        self.ensure_authenticated().await?;
        let form = Form::new().part("file", file_part(GARMIN, path).await?);
        let response = connect_api(self.client.post(self.config.upload_url()))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !(status.is_success() || status == StatusCode::CONFLICT) {
            return Err(error_from_response(GARMIN, response).await);
        }
        let bytes = response.bytes().await?;
        let parsed: GarminUploadResponse = if bytes.is_empty() {
            GarminUploadResponse::default()
        } else {
            serde_json::from_slice(&bytes).map_err(|source| ProviderError::ParseError {
                provider: GARMIN.to_owned(),
                field: "upload response",
                source,
            })?
        };

        let id = parsed
            .detailed_import_result
            .upload_id
            .map_or_else(|| metadata.external_id.clone(), |id| id.to_string());
        Ok(UploadHandle::settled(id, interpret_upload(&parsed)))
    }

    async fn poll_status(&self, handle: &UploadHandle) -> ProviderResult<UploadStatus> {
        handle.settled.clone().ok_or_else(|| ProviderError::ApiError {
            provider: GARMIN.to_owned(),
            status_code: 0,
            message: format!("upload {} has no recorded outcome", handle.id),
            retryable: false,
        })
    }
}

/// Map an upload response onto the generic status
#[must_use]
pub fn interpret_upload(response: &GarminUploadResponse) -> UploadStatus {
    let result = &response.detailed_import_result;
    if let Some(id) = result.successes.iter().find_map(|entry| entry.internal_id) {
        return UploadStatus::created(id.to_string());
    }
    if let Some(failure) = result.failures.first() {
        let message = failure
            .messages
            .iter()
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        if is_duplicate_message(&message) {
            return UploadStatus {
                remote_id: failure.internal_id.map(|id| id.to_string()),
                ..UploadStatus::duplicate(Some(message))
            };
        }
        return UploadStatus::failed(if message.is_empty() {
            "upload rejected".to_owned()
        } else {
            message
        });
    }
    UploadStatus {
        done: true,
        ..UploadStatus::default()
    }
}

/// CSRF token embedded in the SSO sign-in page
#[must_use]
pub fn extract_csrf(html: &str) -> Option<String> {
    CSRF_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(html)?.get(1))
        .map(|token| token.as_str().to_owned())
}

/// Service ticket from a sign-in response body or redirect URL
#[must_use]
pub fn extract_ticket(text: &str) -> Option<String> {
    TICKET_PATTERN
        .as_ref()?
        .captures(text)?
        .get(1)
        .map(|ticket| ticket.as_str().to_owned())
}

fn check_signin_body(body: &str) -> ProviderResult<()> {
    if body.contains("ACCOUNT_LOCKED") {
        return Err(ProviderError::auth(GARMIN, "account is locked"));
    }
    if body.contains("INVALID_CREDENTIALS") || body.contains("Invalid credentials") {
        return Err(ProviderError::auth(GARMIN, "invalid email or password"));
    }
    Ok(())
}

fn parse_gmt(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_csrf_from_form_or_script() {
        let form = r#"<input type="hidden" name="_csrf"   value="ABC123" />"#;
        assert_eq!(extract_csrf(form).as_deref(), Some("ABC123"));

        let script = r#"var context = {"_csrf" : "XYZ"};"#;
        assert_eq!(extract_csrf(script).as_deref(), Some("XYZ"));

        assert_eq!(extract_csrf("<html></html>"), None);
    }

    #[test]
    fn test_extract_ticket() {
        let body = r#"var response_url = "https://connect.garmin.com/modern?ticket=ST-0123-abc-cas";"#;
        assert_eq!(extract_ticket(body).as_deref(), Some("ST-0123-abc-cas"));
        assert_eq!(extract_ticket("no ticket here"), None);
    }

    #[test]
    fn test_signin_body_failures() {
        assert!(check_signin_body("status: ACCOUNT_LOCKED")
            .unwrap_err()
            .is_auth_error());
        assert!(check_signin_body("Invalid credentials").is_err());
        assert!(check_signin_body("<html>ok</html>").is_ok());
    }

    #[test]
    fn test_interpret_upload_outcomes() {
        let created: GarminUploadResponse = serde_json::from_str(
            r#"{"detailedImportResult":{"uploadId":5,"successes":[{"internalId":42}],"failures":[]}}"#,
        )
        .unwrap();
        assert_eq!(interpret_upload(&created), UploadStatus::created("42"));

        let duplicate: GarminUploadResponse = serde_json::from_str(
            r#"{"detailedImportResult":{"successes":[],"failures":[{"internalId":17,"messages":[{"code":202,"content":"Duplicate Activity."}]}]}}"#,
        )
        .unwrap();
        let status = interpret_upload(&duplicate);
        assert!(status.duplicate);
        assert_eq!(status.remote_id.as_deref(), Some("17"));

        let failed: GarminUploadResponse = serde_json::from_str(
            r#"{"detailedImportResult":{"failures":[{"messages":[{"content":"Invalid file"}]}]}}"#,
        )
        .unwrap();
        let status = interpret_upload(&failed);
        assert!(!status.duplicate);
        assert_eq!(status.error.as_deref(), Some("Invalid file"));
    }

    #[test]
    fn test_connect_api_marks_search_and_upload_requests() {
        let client = Client::new();
        let search = connect_api(client.get("https://connect.garmin.com/activitylist-service"))
            .build()
            .unwrap();
        assert_eq!(search.headers()["NK"], "NT");

        let upload = connect_api(client.post("https://connect.garmin.com/upload-service"))
            .build()
            .unwrap();
        assert_eq!(upload.headers()["NK"], "NT");
    }

    #[test]
    fn test_parse_gmt_start_time() {
        let parsed = parse_gmt("2024-01-15 07:00:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-01-15T07:00:00+00:00");
        assert!(parse_gmt("15/01/2024").is_none());
    }
}
