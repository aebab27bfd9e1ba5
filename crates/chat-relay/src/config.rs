//! Process-wide relay configuration.
//!
//! Built once at startup and passed by reference into the pipeline; nothing
//! in the crate reads the environment after that.
//!
//! Environment variables read by [`RelayConfig::try_from_env`]:
//! - `OPENROUTER_API_KEY` (required)
//! - `OPENROUTER_MODEL` (optional, defaults to [`DEFAULT_MODEL`])
//! - `OPENROUTER_ENDPOINT` (optional, defaults to [`DEFAULT_ENDPOINT`])
//! - `OPENROUTER_SITE_URL` / `OPENROUTER_SITE_NAME` (optional identification headers)
//! - `OPENROUTER_TIMEOUT_SECS` (optional per-attempt timeout)

use crate::error::RelayError;
use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "qwen/qwen3-coder:free";
pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_SITE_URL: &str = "http://localhost:3000";
pub const DEFAULT_SITE_NAME: &str = "BitsTechFest";

pub const API_KEY_VAR: &str = "OPENROUTER_API_KEY";

/// Connection settings for the upstream completion API.
#[derive(Clone)]
pub struct RelayConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    /// Sent as `HTTP-Referer`.
    pub site_url: String,
    /// Sent as `X-Title`.
    pub site_name: String,
    /// Per-attempt timeout. `None` leaves the transport default in place.
    pub request_timeout: Option<Duration>,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("site_url", &self.site_url)
            .field("site_name", &self.site_name)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl RelayConfig {
    /// Creates a configuration with the given API key and defaults for everything else.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            site_name: DEFAULT_SITE_NAME.to_string(),
            request_timeout: None,
        }
    }

    /// Loads configuration from environment variables.
    pub fn try_from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get(API_KEY_VAR).ok_or_else(|| {
            RelayError::Config(format!("Missing {API_KEY_VAR} environment variable."))
        })?;

        let mut config = Self::new(api_key);
        if let Some(model) = get("OPENROUTER_MODEL") {
            config.model = model;
        }
        if let Some(endpoint) = get("OPENROUTER_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Some(site_url) = get("OPENROUTER_SITE_URL") {
            config.site_url = site_url;
        }
        if let Some(site_name) = get("OPENROUTER_SITE_NAME") {
            config.site_name = site_name;
        }
        if let Some(raw) = get("OPENROUTER_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| {
                    RelayError::Config(format!(
                        "OPENROUTER_TIMEOUT_SECS must be a positive integer, got {raw:?}"
                    ))
                })?;
            config.request_timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the identification headers sent with every request.
    pub fn with_site(mut self, url: impl Into<String>, name: impl Into<String>) -> Self {
        self.site_url = url.into();
        self.site_name = name.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}
