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

//! Supabase client and the provider that owns it.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};

use crate::auth::{AuthError, ErrorBody, Session, SessionFetcher, SessionPayload};
use crate::config::{ClientConfig, ConfigError};

const USER_AGENT: &str = concat!("supabase-probe/", env!("CARGO_PKG_VERSION"));

/// Shared handle to the configured client.
pub type ClientHandle = Arc<SupabaseClient>;

/// HTTP client bound to one Supabase project.
pub struct SupabaseClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    /// Build the underlying HTTP client for a validated configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { config, http })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn auth_headers(&self) -> Result<HeaderMap, AuthError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let api_key = HeaderValue::from_str(self.config.api_key())
            .map_err(|e| AuthError::Decode(format!("API key is not a valid header value: {e}")))?;
        headers.insert("apikey", api_key);

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", self.config.bearer_token()))
            .map_err(|e| AuthError::Decode(format!("bearer token is not a valid header value: {e}")))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        Ok(headers)
    }
}

#[async_trait]
impl SessionFetcher for SupabaseClient {
    async fn fetch_session(&self) -> Result<Session, AuthError> {
        let url = self.config.user_endpoint();
        debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .headers(self.auth_headers()?)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(ErrorBody::into_message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request rejected")
                        .to_string()
                });
            debug!("Session fetch rejected with HTTP {}: {}", status.as_u16(), message);
            return Err(AuthError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: SessionPayload =
            serde_json::from_slice(&body).map_err(|e| AuthError::Decode(e.to_string()))?;
        Ok(payload.into_session(self.config.bearer_token()))
    }
}

/// Owner of the one client a front end talks to.
///
/// Construction validates the configuration and builds the client exactly
/// once; [`ClientProvider::get`] hands out clones of the same handle. Front
/// ends receive the provider by injection instead of reaching for a global.
#[derive(Debug, Clone)]
pub struct ClientProvider {
    client: ClientHandle,
}

impl ClientProvider {
    /// Validate `config` and construct the client.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        info!("Configuring Supabase client for {}", config.base_url());
        let client = SupabaseClient::new(config)?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Validate raw settings and construct the client.
    pub fn from_parts(base_url: &str, api_key: &str) -> Result<Self, ConfigError> {
        Self::new(ClientConfig::new(base_url, api_key)?)
    }

    /// Handle to the configured client. Every call returns the same client.
    #[must_use]
    pub fn get(&self) -> ClientHandle {
        Arc::clone(&self.client)
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        self.client.config()
    }
}
