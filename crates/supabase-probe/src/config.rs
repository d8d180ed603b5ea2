// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Validated client configuration.
//!
//! A [`ClientConfig`] can only be obtained through [`ClientConfig::new`], which
//! checks the base URL and API key up front. Everything downstream can rely on
//! both being usable.

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Path of the GoTrue endpoint that returns the user behind a bearer token.
pub const USER_ENDPOINT: &str = "auth/v1/user";

/// Startup validation failures.
///
/// These are configuration problems, not runtime errors: the client cannot do
/// anything useful until they are fixed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Supabase URL is empty")]
    EmptyUrl,

    #[error("invalid Supabase URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported URL scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),

    #[error("Supabase API key is empty")]
    MissingApiKey,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Immutable connection settings for one Supabase project.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: Url,
    api_key: String,
    access_token: Option<String>,
    request_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Validate a base URL and API key.
    ///
    /// The URL must be absolute with an `http` or `https` scheme. Surrounding
    /// whitespace is ignored for both values.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyUrl);
        }

        let mut url = Url::parse(trimmed).map_err(|source| ConfigError::InvalidUrl {
            url: trimmed.to_string(),
            source,
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }

        // Endpoints are joined relative to the base, so the path needs a trailing slash
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        Ok(Self {
            base_url: url,
            api_key: api_key.to_string(),
            access_token: None,
            request_timeout: None,
        })
    }

    /// Use a user access token as the bearer instead of the API key.
    ///
    /// Blank tokens are ignored.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        let token = token.trim();
        self.access_token = (!token.is_empty()).then(|| token.to_string());
        self
    }

    /// Bound every request with a total timeout.
    ///
    /// A zero duration means no timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// Token sent in the `Authorization: Bearer` header.
    #[must_use]
    pub fn bearer_token(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }

    /// Absolute URL of the session-fetch endpoint.
    #[must_use]
    pub fn user_endpoint(&self) -> Url {
        // Joining a relative path onto a validated http(s) base cannot fail
        self.base_url
            .join(USER_ENDPOINT)
            .unwrap_or_else(|_| self.base_url.clone())
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &redact(&self.api_key))
            .field("access_token", &self.access_token.as_deref().map(redact))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Mask a secret for logs, keeping a short prefix for recognition.
#[must_use]
pub fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    format!("{prefix}*** ({} chars)", secret.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = ClientConfig::new("https://example.supabase.co", "anon-key").unwrap();
        assert_eq!(config.base_url().as_str(), "https://example.supabase.co/");
        assert_eq!(config.api_key(), "anon-key");
        assert_eq!(config.bearer_token(), "anon-key");
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn test_empty_url_rejected() {
        assert!(matches!(
            ClientConfig::new("", "anon-key"),
            Err(ConfigError::EmptyUrl)
        ));
        assert!(matches!(
            ClientConfig::new("   ", "anon-key"),
            Err(ConfigError::EmptyUrl)
        ));
    }

    #[test]
    fn test_relative_url_rejected() {
        let err = ClientConfig::new("example.supabase.co", "anon-key").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
        assert!(err.to_string().contains("example.supabase.co"));
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        let err = ClientConfig::new("ftp://example.supabase.co", "anon-key").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme(scheme) if scheme == "ftp"));
    }

    #[test]
    fn test_blank_api_key_rejected() {
        assert!(matches!(
            ClientConfig::new("https://example.supabase.co", "  "),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn test_user_endpoint_respects_base_path() {
        let config = ClientConfig::new("http://localhost:54321/proxy", "key").unwrap();
        assert_eq!(
            config.user_endpoint().as_str(),
            "http://localhost:54321/proxy/auth/v1/user"
        );

        let config = ClientConfig::new("https://example.supabase.co", "key").unwrap();
        assert_eq!(
            config.user_endpoint().as_str(),
            "https://example.supabase.co/auth/v1/user"
        );
    }

    #[test]
    fn test_access_token_overrides_bearer() {
        let config = ClientConfig::new("https://example.supabase.co", "anon-key")
            .unwrap()
            .with_access_token("user-jwt");
        assert_eq!(config.bearer_token(), "user-jwt");
        assert_eq!(config.api_key(), "anon-key");

        let config = config.with_access_token("  ");
        assert_eq!(config.access_token(), None);
        assert_eq!(config.bearer_token(), "anon-key");
    }

    #[test]
    fn test_zero_timeout_means_none() {
        let config = ClientConfig::new("https://example.supabase.co", "key")
            .unwrap()
            .with_request_timeout(Duration::from_millis(250));
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(250)));

        let config = config.with_request_timeout(Duration::ZERO);
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ClientConfig::new("https://example.supabase.co", "supersecretkey")
            .unwrap()
            .with_access_token("user-jwt-token");
        let debug = format!("{config:?}");
        assert!(!debug.contains("supersecretkey"));
        assert!(!debug.contains("user-jwt-token"));
        assert!(debug.contains("supe***"));
    }
}
