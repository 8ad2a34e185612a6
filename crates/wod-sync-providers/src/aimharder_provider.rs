// ABOUTME: Aimharder gym platform client that logs in with a browser-like session and pages activities
// ABOUTME: Discovers the athlete's user ID and maps the activity timeline API onto watermark pages
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

//! # Aimharder source client
//!
//! Aimharder has no public API. The client reproduces the browser login
//! flow on a cookie-carrying client:
//!
//! 1. visit the landing page,
//! 2. visit the login page,
//! 3. post the credential form,
//! 4. confirm the `amhrdrauth` cookie was issued, visiting `/home` if the
//!    redirect chain did not set it.
//!
//! Activities come from the timeline endpoint, which pages with a
//! `loadAfter` watermark.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::constants::platforms::AIMHARDER;
use crate::core::SourceClient;
use crate::errors::provider::{ProviderError, ProviderResult};
use crate::http_client::build_session_client;
use crate::pagination::{ActivityPage, Watermark};

/// Cookie issued after a successful login
pub const AUTH_COOKIE: &str = "amhrdrauth";

const LOGIN_BUTTON_LABEL: &str = "Iniciar sesión";
const ACCEPT_LANGUAGE_VALUE: &str = "es-ES,es;q=0.9,en;q=0.8";
const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const ACCEPT_JSON: &str = "application/json, text/javascript, */*; q=0.01";

const INVALID_CREDENTIAL_PHRASES: [&str; 5] = [
    "datos incorrectos",
    "email o contraseña incorrectos",
    "credenciales incorrectas",
    "invalid email",
    "invalid password",
];

static USER_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"userId['":\s]+(\d+)"#,
        r#"userID['":\s]+(\d+)"#,
        r#"user_id['":\s]+(\d+)"#,
        r#"data-userid="(\d+)""#,
        r"var\s+userId\s*=\s*(\d+)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Connection settings for Aimharder
#[derive(Debug, Clone)]
pub struct AimharderConfig {
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
    /// Box subdomain, e.g. `crossfitexample`
    pub box_name: String,
    /// Athlete user ID; discovered from the schedule page when absent
    pub user_id: Option<String>,
    /// Main site URL
    pub base_url: String,
    /// Login site URL
    pub login_url: String,
}

impl AimharderConfig {
    /// Box site URL
    #[must_use]
    pub fn box_url(&self) -> String {
        format!("https://{}.aimharder.com", self.box_name)
    }
}

#[derive(Debug, Deserialize)]
struct TimelineResponse {
    #[serde(default)]
    elements: Vec<Value>,
    #[serde(default, rename = "lastLoaded")]
    last_loaded: Value,
}

/// Aimharder source client
pub struct AimharderProvider {
    config: AimharderConfig,
    jar: Arc<Jar>,
    client: Client,
    user_id: RwLock<Option<String>>,
}

impl AimharderProvider {
    /// Create a client with a fresh cookie jar
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: AimharderConfig) -> ProviderResult<Self> {
        let jar = Arc::new(Jar::default());
        let client = build_session_client(Arc::clone(&jar))?;
        let user_id = config.user_id.clone().filter(|id| !id.is_empty());
        Ok(Self {
            config,
            jar,
            client,
            user_id: RwLock::new(user_id),
        })
    }

    fn page_request(&self, url: &str, referer: Option<&str>) -> RequestBuilder {
        let request = self
            .client
            .get(url)
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_VALUE);
        match referer {
            Some(referer) => request.header(REFERER, referer),
            None => request,
        }
    }

    fn has_auth_cookie(&self) -> bool {
        let candidates = [
            self.config.base_url.as_str(),
            self.config.login_url.as_str(),
            "https://www.aimharder.com",
        ];
        candidates
            .iter()
            .filter_map(|candidate| Url::parse(candidate).ok())
            .filter_map(|url| self.jar.cookies(&url))
            .filter_map(|header| header.to_str().ok().map(str::to_owned))
            .any(|cookies| has_cookie(&cookies, AUTH_COOKIE))
    }

    async fn visit(&self, url: &str, referer: Option<&str>) -> ProviderResult<StatusCode> {
        let response = self.page_request(url, referer).send().await?;
        let status = response.status();
        let _ = response.bytes().await;
        debug!(url, status = status.as_u16(), "Visited page");
        Ok(status)
    }

    async fn submit_credentials(&self) -> ProviderResult<()> {
        if self.config.email.is_empty() || self.config.password.is_empty() {
            return Err(ProviderError::not_configured(
                AIMHARDER,
                "email and password are required (AIMHARDER_EMAIL, AIMHARDER_PASSWORD)",
            ));
        }

        let login_url = self.config.login_url.as_str();
        let form = [
            ("mail", self.config.email.as_str()),
            ("pw", self.config.password.as_str()),
            ("loginfingerprint", "0"),
            ("loginiframe", "0"),
            ("login", LOGIN_BUTTON_LABEL),
        ];
        let response = self
            .client
            .post(login_url)
            .header(REFERER, login_url)
            .header(ORIGIN, login_url)
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_VALUE)
            .form(&form)
            .send()
            .await?;
        let body = response.text().await.unwrap_or_default();

        if is_invalid_credentials(&body) {
            return Err(ProviderError::auth(AIMHARDER, "invalid credentials"));
        }
        Ok(())
    }

    async fn discover_user_id(&self) -> ProviderResult<String> {
        let box_url = self.config.box_url();
        let schedule_url = format!("{box_url}/schedule");
        let body = self
            .page_request(&schedule_url, Some(&box_url))
            .send()
            .await?
            .text()
            .await?;
        extract_user_id(&body).ok_or_else(|| {
            ProviderError::not_configured(
                AIMHARDER,
                "user ID not found on the schedule page; set AIMHARDER_USER_ID",
            )
        })
    }

    async fn current_user_id(&self) -> ProviderResult<String> {
        self.user_id.read().await.clone().ok_or_else(|| {
            ProviderError::not_configured(AIMHARDER, "not logged in or user ID unknown")
        })
    }
}

#[async_trait]
impl SourceClient for AimharderProvider {
    fn name(&self) -> &'static str {
        AIMHARDER
    }

    async fn login(&self) -> ProviderResult<()> {
        let base_url = self.config.base_url.as_str();
        let login_url = self.config.login_url.as_str();

        let status = self.visit(base_url, None).await?;
        if status != StatusCode::OK {
            return Err(ProviderError::ApiError {
                provider: AIMHARDER.to_owned(),
                status_code: status.as_u16(),
                message: "main page unavailable".to_owned(),
                retryable: status.is_server_error(),
            });
        }
        sleep(Duration::from_millis(300)).await;

        let status = self.visit(login_url, Some(base_url)).await?;
        if status != StatusCode::OK {
            return Err(ProviderError::ApiError {
                provider: AIMHARDER.to_owned(),
                status_code: status.as_u16(),
                message: "login page unavailable".to_owned(),
                retryable: status.is_server_error(),
            });
        }
        sleep(Duration::from_millis(200)).await;

        self.submit_credentials().await?;

        if !self.has_auth_cookie() {
            debug!("Auth cookie not set by the login redirect, visiting /home");
            self.visit(&format!("{base_url}/home"), Some(login_url))
                .await?;
        }
        if !self.has_auth_cookie() {
            return Err(ProviderError::auth(
                AIMHARDER,
                format!("{AUTH_COOKIE} cookie not received"),
            ));
        }

        if self.user_id.read().await.is_none() {
            let discovered = self.discover_user_id().await?;
            *self.user_id.write().await = Some(discovered);
        }

        info!(box_name = %self.config.box_name, "Logged into Aimharder");
        Ok(())
    }

    async fn fetch_activities_page(
        &self,
        cursor: Option<Watermark>,
    ) -> ProviderResult<ActivityPage> {
        let user_id = self.current_user_id().await?;
        let url = activity_url(
            &self.config.base_url,
            &user_id,
            cursor,
            Utc::now().timestamp_millis(),
        );

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, ACCEPT_JSON)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_VALUE)
            .header("X-Requested-With", "XMLHttpRequest")
            .header(REFERER, self.config.base_url.as_str())
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            warn!(
                status = response.status().as_u16(),
                "Activity timeline returned a non-OK status, ending pagination"
            );
            return Ok(ActivityPage::empty());
        }

        let body = response.bytes().await?;
        parse_activity_page(&body)
    }
}

/// Timeline URL for the page after `cursor`
#[must_use]
pub fn activity_url(
    base_url: &str,
    user_id: &str,
    cursor: Option<Watermark>,
    now_millis: i64,
) -> String {
    match cursor.filter(|watermark| !watermark.is_exhausted()) {
        None => format!(
            "{base_url}/api/activity?timeLineFormat=0&timeLineContent=2&userID={user_id}&_={now_millis}"
        ),
        Some(watermark) => format!(
            "{base_url}/api/activity?timeLineFormat=2&timeLineContent=2&userID={user_id}&loadAfter={watermark}&_={now_millis}"
        ),
    }
}

/// Decode a timeline response into a page
///
/// # Errors
///
/// Returns `ProviderError::ParseError` when the body is not the expected JSON.
pub fn parse_activity_page(body: &[u8]) -> ProviderResult<ActivityPage> {
    let response: TimelineResponse =
        serde_json::from_slice(body).map_err(|source| ProviderError::ParseError {
            provider: AIMHARDER.to_owned(),
            field: "activity timeline",
            source,
        })?;
    let last_loaded = match &response.last_loaded {
        Value::Number(number) => number.as_i64().unwrap_or_default(),
        Value::String(text) => text.trim().parse().unwrap_or_default(),
        _ => 0,
    };
    Ok(ActivityPage::new(
        response.elements,
        Watermark::new(last_loaded),
    ))
}

/// Whether a login response body reports rejected credentials
#[must_use]
pub fn is_invalid_credentials(body: &str) -> bool {
    let lowered = body.to_lowercase();
    INVALID_CREDENTIAL_PHRASES
        .iter()
        .any(|phrase| lowered.contains(phrase))
}

/// First user ID found in a schedule page, trying each pattern in order
#[must_use]
pub fn extract_user_id(html: &str) -> Option<String> {
    USER_ID_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(html)
            .and_then(|captures| captures.get(1))
            .map(|id| id.as_str().to_owned())
    })
}

fn has_cookie(cookie_header: &str, name: &str) -> bool {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .any(|(key, value)| key == name && !value.is_empty())
}
