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

//! Application configuration management.
//!
//! Settings are persisted in TOML through confy. Connection settings can be
//! overridden per run from the environment or the command line; those
//! overrides are never written back to disk, so secrets passed that way stay
//! out of the config file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use supabase_probe::config::redact;
use supabase_probe::{ClientConfig, ConfigError, OverlapPolicy};

/// confy application name
pub const APP_NAME: &str = "dual-desktop";

/// confy config file stem
const CONFIG_NAME: &str = "config";

pub const ENV_URL: &str = "SUPABASE_URL";
pub const ENV_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_ACCESS_TOKEN: &str = "SUPABASE_ACCESS_TOKEN";

/// Application configuration stored in TOML format
#[derive(Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Supabase project URL, e.g. `https://<ref>.supabase.co`
    #[serde(default)]
    pub supabase_url: String,

    /// Public anon key (env var takes precedence)
    #[serde(default)]
    pub supabase_anon_key: Option<String>,

    /// Optional user access token sent as the bearer instead of the anon key
    #[serde(default)]
    pub access_token: Option<String>,

    /// Total request timeout; transport default when unset or 0
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// How overlapping probes are reconciled
    #[serde(default)]
    pub overlap_policy: OverlapPolicy,

    /// Number of probe results kept in the history panel
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_config_version() -> u32 {
    1
}

fn default_history_limit() -> usize {
    20
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            supabase_url: String::new(),
            supabase_anon_key: None,
            access_token: None,
            request_timeout_secs: None,
            overlap_policy: OverlapPolicy::default(),
            history_limit: default_history_limit(),
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("config_version", &self.config_version)
            .field("supabase_url", &self.supabase_url)
            .field("supabase_anon_key", &self.supabase_anon_key.as_deref().map(redact))
            .field("access_token", &self.access_token.as_deref().map(redact))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("overlap_policy", &self.overlap_policy)
            .field("history_limit", &self.history_limit)
            .finish()
    }
}

/// Per-run connection settings from the environment or command line.
#[derive(Default, Clone)]
pub struct Overrides {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub access_token: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl AppConfig {
    /// Load configuration from the platform config directory
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Load configuration from an explicit file, creating it with defaults if missing
    pub fn load_from(path: &Path) -> Result<Self, confy::ConfyError> {
        confy::load_path(path)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Merge overrides over the file settings and validate the result.
    ///
    /// Blank override values fall through to the file.
    pub fn client_config(&self, overrides: &Overrides) -> Result<ClientConfig, ConfigError> {
        let url = pick(overrides.url.as_deref(), Some(self.supabase_url.as_str())).unwrap_or_default();
        let anon_key =
            pick(overrides.anon_key.as_deref(), self.supabase_anon_key.as_deref()).unwrap_or_default();

        let mut config = ClientConfig::new(url, anon_key)?;

        if let Some(token) = pick(overrides.access_token.as_deref(), self.access_token.as_deref()) {
            config = config.with_access_token(token);
        }

        if let Some(secs) = overrides.request_timeout_secs.or(self.request_timeout_secs) {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

/// First non-blank value.
fn pick<'a>(preferred: Option<&'a str>, fallback: Option<&'a str>) -> Option<&'a str> {
    preferred
        .filter(|v| !v.trim().is_empty())
        .or_else(|| fallback.filter(|v| !v.trim().is_empty()))
}
