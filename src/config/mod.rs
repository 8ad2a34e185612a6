// ABOUTME: Configuration loading from defaults, an optional YAML file, and environment overrides
// ABOUTME: Credentials per platform, storage paths, sync tuning, and webhook settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

//! Configuration for wod-sync
//!
//! Values are layered, later layers winning:
//!
//! 1. **Defaults** built into this module
//! 2. **YAML file**, `~/.wod-sync/config.yaml` unless a path is given
//! 3. **Environment** variables for credentials and storage
//!
//! Credentials are only checked for the platforms a run actually uses,
//! see [`AppConfig::validate_for`].

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::{platforms, timing, workout_defaults};
use crate::errors::{AppError, AppResult};
use crate::sync::PollPolicy;

#[cfg(feature = "provider-aimharder")]
use crate::providers::aimharder_provider::AimharderConfig;
#[cfg(feature = "provider-garmin")]
use crate::providers::garmin_provider::GarminConfig;
#[cfg(feature = "provider-strava")]
use crate::providers::strava_provider::StravaConfig;

/// Directory under the home directory holding config, tokens, and history
pub const DATA_DIR_NAME: &str = ".wod-sync";
/// Config file name inside the data directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Source gym platform
    pub aimharder: AimharderSettings,
    /// Strava OAuth application
    pub strava: StravaSettings,
    /// Garmin Connect account
    pub garmin: GarminSettings,
    /// Where tokens, history, and TCX files live
    pub storage: StorageSettings,
    /// Sync defaults
    pub sync: SyncSettings,
    /// Webhook server
    pub webhook: WebhookSettings,
}

/// Aimharder account and box
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimharderSettings {
    /// Login email
    pub email: Option<String>,
    /// Login password
    pub password: Option<String>,
    /// Box subdomain, e.g. `crossfitmadrid`
    pub box_name: Option<String>,
    /// Box identifier, recorded as the workout venue ID
    pub box_id: Option<String>,
    /// Athlete ID; discovered after login when absent
    pub user_id: Option<String>,
    /// Main site
    pub base_url: String,
    /// Login host
    pub login_url: String,
}

impl Default for AimharderSettings {
    fn default() -> Self {
        Self {
            email: None,
            password: None,
            box_name: None,
            box_id: None,
            user_id: None,
            base_url: "https://aimharder.com".to_owned(),
            login_url: "https://login.aimharder.com".to_owned(),
        }
    }
}

/// Strava OAuth application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StravaSettings {
    /// Application client ID
    pub client_id: Option<String>,
    /// Application client secret
    pub client_secret: Option<String>,
    /// Redirect URI registered with the application
    pub redirect_uri: String,
}

impl Default for StravaSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: "http://localhost:8080/callback".to_owned(),
        }
    }
}

/// Garmin Connect account
///
/// Both fields may stay empty when a browser session was imported with
/// `wod-sync auth garmin --session`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GarminSettings {
    /// Login email
    pub email: Option<String>,
    /// Login password
    pub password: Option<String>,
}

/// Storage locations
///
/// Relative file names resolve under `data_dir`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Base directory
    pub data_dir: PathBuf,
    /// Platform tokens and sessions
    pub tokens_file: PathBuf,
    /// Sync attempt history
    pub history_file: PathBuf,
    /// Generated TCX files
    pub tcx_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            tokens_file: PathBuf::from("tokens.json"),
            history_file: PathBuf::from("sync_history.json"),
            tcx_dir: PathBuf::from("tcx"),
        }
    }
}

impl StorageSettings {
    /// Resolved token file path
    #[must_use]
    pub fn tokens_file(&self) -> PathBuf {
        self.resolve(&self.tokens_file)
    }

    /// Resolved history file path
    #[must_use]
    pub fn history_file(&self) -> PathBuf {
        self.resolve(&self.history_file)
    }

    /// Resolved TCX output directory
    #[must_use]
    pub fn tcx_dir(&self) -> PathBuf {
        self.resolve(&self.tcx_dir)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        let path = expand_home(path);
        if path.is_absolute() {
            path
        } else {
            expand_home(&self.data_dir).join(path)
        }
    }
}

/// Sync defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Days back from today when no range is given
    pub default_days: u32,
    /// Duration for workouts without an explicit or elapsed time
    pub default_duration_minutes: u64,
    /// Destination platforms when none are given
    pub platforms: Vec<String>,
    /// Upload status polling interval
    pub poll_interval_secs: u64,
    /// Maximum wait for upload processing
    pub max_wait_secs: u64,
    /// Pause between source pages
    pub source_page_delay_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            default_days: 30,
            default_duration_minutes: workout_defaults::DURATION_MINUTES,
            platforms: vec![platforms::STRAVA.to_owned()],
            poll_interval_secs: timing::POLL_INTERVAL_SECS,
            max_wait_secs: timing::MAX_UPLOAD_WAIT_SECS,
            source_page_delay_ms: timing::SOURCE_PAGE_DELAY_MS,
        }
    }
}

impl SyncSettings {
    /// Polling policy for the upload state machine
    #[must_use]
    pub const fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_wait: Duration::from_secs(self.max_wait_secs),
        }
    }

    /// Pause between source pages
    #[must_use]
    pub const fn page_delay(&self) -> Duration {
        Duration::from_millis(self.source_page_delay_ms)
    }

    /// Fallback workout duration
    #[must_use]
    pub const fn default_duration(&self) -> Duration {
        Duration::from_secs(self.default_duration_minutes * 60)
    }
}

/// Webhook server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    /// Listen address
    pub bind: String,
    /// Shared secret expected in `X-Auth-Token` or `?token=`
    pub token: Option<String>,
    /// Days synced when a trigger gives none
    pub default_days: u32,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_owned(),
            token: None,
            default_days: 1,
        }
    }
}

impl AppConfig {
    /// Load configuration
    ///
    /// An explicit `path` must exist. Without one, the default file is read
    /// when present. Environment overrides are applied last.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) => match Self::from_file(&path) {
                    Ok(config) => config,
                    Err(_) if !path.exists() => {
                        debug!(path = %path.display(), "No config file, using defaults");
                        Self::default()
                    }
                    Err(err) => return Err(err),
                },
                None => Self::default(),
            },
        };
        config.apply_env();
        info!(
            data_dir = %config.storage.data_dir.display(),
            platforms = ?config.sync.platforms,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parse a YAML file
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the file is missing or malformed.
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path).map_err(|err| {
            let message = if err.kind() == ErrorKind::NotFound {
                format!("config file {} not found", path.display())
            } else {
                format!("cannot read config file {}", path.display())
            };
            AppError::config_invalid(message).with_source(err)
        })?;
        Self::from_yaml(&content)
            .map_err(|err| AppError::config_invalid(format!("{}: {}", path.display(), err.message)))
    }

    /// Parse YAML text
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the text is not valid YAML for
    /// this structure.
    pub fn from_yaml(content: &str) -> AppResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|err| {
            AppError::config_invalid(format!("invalid YAML: {err}")).with_source(err)
        })
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| env::var(key).ok().filter(|value| !value.is_empty()));
    }

    /// Apply overrides from `lookup`, keyed by environment variable name
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut Option<String>, key: &str| {
            if let Some(value) = lookup(key) {
                *target = Some(value);
            }
        };
        set(&mut self.aimharder.email, "AIMHARDER_EMAIL");
        set(&mut self.aimharder.password, "AIMHARDER_PASSWORD");
        set(&mut self.aimharder.box_name, "AIMHARDER_BOX_NAME");
        set(&mut self.aimharder.box_id, "AIMHARDER_BOX_ID");
        set(&mut self.aimharder.user_id, "AIMHARDER_USER_ID");
        set(&mut self.strava.client_id, "STRAVA_CLIENT_ID");
        set(&mut self.strava.client_secret, "STRAVA_CLIENT_SECRET");
        set(&mut self.garmin.email, "GARMIN_EMAIL");
        set(&mut self.garmin.password, "GARMIN_PASSWORD");
        set(&mut self.webhook.token, "WOD_SYNC_WEBHOOK_TOKEN");

        if let Some(redirect_uri) = lookup("STRAVA_REDIRECT_URI") {
            self.strava.redirect_uri = redirect_uri;
        }
        if let Some(data_dir) = lookup("WOD_SYNC_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(data_dir);
        }
    }

    /// Check that everything a run against `targets` needs is present
    ///
    /// The source account is always required.
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` naming the first missing value, or
    /// `ConfigInvalid` for an unknown platform.
    pub fn validate_for(&self, targets: &[String]) -> AppResult<()> {
        require(self.aimharder.email.as_ref(), "aimharder.email (AIMHARDER_EMAIL)")?;
        require(
            self.aimharder.password.as_ref(),
            "aimharder.password (AIMHARDER_PASSWORD)",
        )?;
        require(
            self.aimharder.box_name.as_ref(),
            "aimharder.box_name (AIMHARDER_BOX_NAME)",
        )?;

        for platform in targets {
            match platform.as_str() {
                platforms::STRAVA => {
                    require(self.strava.client_id.as_ref(), "strava.client_id (STRAVA_CLIENT_ID)")?;
                    require(
                        self.strava.client_secret.as_ref(),
                        "strava.client_secret (STRAVA_CLIENT_SECRET)",
                    )?;
                }
                platforms::GARMIN => {}
                other => {
                    return Err(AppError::config_invalid(format!(
                        "unknown platform {other}, expected one of {}",
                        platforms::DESTINATIONS.join(", ")
                    )))
                }
            }
        }
        Ok(())
    }

    /// Source client settings
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` when the account is incomplete.
    #[cfg(feature = "provider-aimharder")]
    pub fn aimharder_config(&self) -> AppResult<AimharderConfig> {
        let settings = &self.aimharder;
        Ok(AimharderConfig {
            email: require(settings.email.as_ref(), "aimharder.email")?.clone(),
            password: require(settings.password.as_ref(), "aimharder.password")?.clone(),
            box_name: require(settings.box_name.as_ref(), "aimharder.box_name")?.clone(),
            user_id: settings.user_id.clone(),
            base_url: settings.base_url.clone(),
            login_url: settings.login_url.clone(),
        })
    }

    /// Strava client settings
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` when the OAuth application is incomplete.
    #[cfg(feature = "provider-strava")]
    pub fn strava_config(&self) -> AppResult<StravaConfig> {
        let settings = &self.strava;
        Ok(StravaConfig::new(
            require(settings.client_id.as_ref(), "strava.client_id")?.clone(),
            require(settings.client_secret.as_ref(), "strava.client_secret")?.clone(),
            settings.redirect_uri.clone(),
        ))
    }

    /// Garmin client settings
    #[cfg(feature = "provider-garmin")]
    #[must_use]
    pub fn garmin_config(&self) -> GarminConfig {
        GarminConfig::new(self.garmin.email.clone(), self.garmin.password.clone())
    }
}

fn require<'a>(value: Option<&'a String>, name: &str) -> AppResult<&'a String> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::config(format!("missing {name}")))
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir().map_or_else(|| PathBuf::from(DATA_DIR_NAME), |home| home.join(DATA_DIR_NAME))
}

/// `~/.wod-sync/config.yaml`, when a home directory is known
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DATA_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.sync.default_days, 30);
        assert_eq!(config.sync.platforms, vec!["strava".to_owned()]);
        assert_eq!(config.sync.poll_policy().interval, Duration::from_secs(2));
        assert_eq!(config.sync.poll_policy().max_wait, Duration::from_secs(120));
        assert_eq!(config.webhook.bind, "0.0.0.0:8080");
        assert_eq!(config.webhook.default_days, 1);
        assert_eq!(config.aimharder.login_url, "https://login.aimharder.com");
    }

    #[test]
    fn test_relative_paths_resolve_under_data_dir() {
        let storage = StorageSettings {
            data_dir: PathBuf::from("/var/lib/wod-sync"),
            tokens_file: PathBuf::from("tokens.json"),
            history_file: PathBuf::from("/tmp/history.json"),
            tcx_dir: PathBuf::from("out/tcx"),
        };
        assert_eq!(
            storage.tokens_file(),
            PathBuf::from("/var/lib/wod-sync/tokens.json")
        );
        assert_eq!(storage.history_file(), PathBuf::from("/tmp/history.json"));
        assert_eq!(storage.tcx_dir(), PathBuf::from("/var/lib/wod-sync/out/tcx"));
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = AppConfig::from_yaml("aimharder:\n  email: file@example.com\n").unwrap();
        let vars: HashMap<&str, &str> = [
            ("AIMHARDER_EMAIL", "env@example.com"),
            ("STRAVA_REDIRECT_URI", "http://127.0.0.1:9000/cb"),
        ]
        .into_iter()
        .collect();
        config.apply_overrides(|key| vars.get(key).map(|value| (*value).to_owned()));

        assert_eq!(config.aimharder.email.as_deref(), Some("env@example.com"));
        assert_eq!(config.strava.redirect_uri, "http://127.0.0.1:9000/cb");
        assert!(config.aimharder.password.is_none());
    }

    #[test]
    fn test_validate_reports_first_missing_value() {
        let mut config = AppConfig::default();
        config.aimharder.email = Some("a@b.c".to_owned());
        config.aimharder.password = Some("pw".to_owned());
        config.aimharder.box_name = Some("mybox".to_owned());

        assert!(config.validate_for(&["garmin".to_owned()]).is_ok());
        let err = config.validate_for(&["strava".to_owned()]).unwrap_err();
        assert!(err.message.contains("strava.client_id"));
        assert!(config.validate_for(&["polar".to_owned()]).is_err());
    }
}
