// ABOUTME: Structured errors for source and destination platform collaborators
// ABOUTME: Distinguishes fatal authentication failures from per-item API and network failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use thiserror::Error;

/// Errors raised while talking to the gym platform or an upload destination
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
    /// Login or token refresh was rejected
    #[error("{provider} authentication failed: {reason}")]
    AuthenticationFailed {
        /// Platform name
        provider: String,
        /// Why the platform refused us
        reason: String,
    },

    /// Non-success HTTP response or platform-reported failure
    #[error("{provider} API error ({status_code}): {message}")]
    ApiError {
        /// Platform name
        provider: String,
        /// HTTP status code, 0 when the failure was reported in a 2xx body
        status_code: u16,
        /// Response body or platform message
        message: String,
        /// Whether retrying the same call could succeed
        retryable: bool,
    },

    /// Transport failure before a response was received
    #[error("network error: {0}")]
    NetworkError(String),

    /// Response body did not have the expected shape
    #[error("{provider} returned an unparseable {field}: {source}")]
    ParseError {
        /// Platform name
        provider: String,
        /// What we were trying to read
        field: &'static str,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },

    /// Credentials or client settings are missing locally
    #[error("{provider} is not configured: {details}")]
    ConfigurationError {
        /// Platform name
        provider: String,
        /// Which setting is missing
        details: String,
    },

    /// Requested remote resource does not exist
    #[error("{provider} {resource_type} '{resource_id}' not found")]
    NotFound {
        /// Platform name
        provider: String,
        /// Kind of resource
        resource_type: String,
        /// Identifier that was looked up
        resource_id: String,
    },

    /// Platform asked us to slow down
    #[error("{provider} rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded {
        /// Platform name
        provider: String,
        /// Seconds to wait before retrying
        retry_after_secs: u64,
    },
}

impl ProviderError {
    /// Authentication failure for `provider`
    pub fn auth(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Missing local configuration for `provider`
    pub fn not_configured(provider: impl Into<String>, details: impl Into<String>) -> Self {
        Self::ConfigurationError {
            provider: provider.into(),
            details: details.into(),
        }
    }

    /// Whether this error invalidates the whole run against the platform
    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed { .. } | Self::ConfigurationError { .. }
        )
    }

    /// Whether a retry of the same request might succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::ApiError { retryable, .. } => *retryable,
            Self::NetworkError(_) | Self::RateLimitExceeded { .. } => true,
            _ => false,
        }
    }
}

#[cfg(feature = "provider-errors")]
impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        Self::NetworkError(error.to_string())
    }
}

/// Result alias for collaborator calls
pub type ProviderResult<T> = Result<T, ProviderError>;
