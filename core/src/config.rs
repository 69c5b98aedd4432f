//! Client configuration.
//!
//! Credentials and endpoint selection can be set in code with the `with_*`
//! setters or read from `NEXTCALLER_*` environment variables.

use std::fmt;
use std::time::Duration;

use crate::error::ApiError;

pub const PRODUCTION_URL: &str = "https://api.nextcaller.com";
pub const SANDBOX_URL: &str = "https://api.sandbox.nextcaller.com";
pub const DEFAULT_VERSION: &str = "2.1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_USERNAME: &str = "NEXTCALLER_USERNAME";
pub const ENV_PASSWORD: &str = "NEXTCALLER_PASSWORD";
pub const ENV_SANDBOX: &str = "NEXTCALLER_SANDBOX";
pub const ENV_VERSION: &str = "NEXTCALLER_VERSION";
pub const ENV_BASE_URL: &str = "NEXTCALLER_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "NEXTCALLER_TIMEOUT_SECS";

#[derive(Clone)]
pub struct ClientConfig {
    pub username: String,
    pub password: String,
    /// Route requests to the sandbox host instead of production.
    pub sandbox: bool,
    /// API version without the leading `v`, e.g. `"2.1"`.
    pub version: String,
    /// Overrides both production and sandbox hosts when set.
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            sandbox: false,
            version: DEFAULT_VERSION.to_string(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("sandbox", &self.sandbox)
            .field("version", &self.version)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            ..Default::default()
        }
    }

    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// An empty version keeps the default.
    pub fn with_version(mut self, version: &str) -> Self {
        if !version.is_empty() {
            self.version = version.trim_start_matches('v').to_string();
        }
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup. Username and
    /// password are required; everything else falls back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ApiError::validation(key, "environment variable is not set"))
        };

        let mut config = Self::new(&required(ENV_USERNAME)?, &required(ENV_PASSWORD)?);

        if let Some(sandbox) = lookup(ENV_SANDBOX) {
            config.sandbox = parse_flag(&sandbox)
                .ok_or_else(|| ApiError::validation(ENV_SANDBOX, format!("expected a boolean, got `{sandbox}`")))?;
        }
        if let Some(version) = lookup(ENV_VERSION) {
            config = config.with_version(&version);
        }
        if let Some(base_url) = lookup(ENV_BASE_URL).filter(|value| !value.is_empty()) {
            config.base_url = Some(base_url);
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs
                .parse()
                .map_err(|_| ApiError::validation(ENV_TIMEOUT_SECS, format!("expected seconds, got `{secs}`")))?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Versioned API root, always ending in `/`, e.g.
    /// `https://api.nextcaller.com/v2.1/`.
    pub fn api_url(&self) -> String {
        let host = match (&self.base_url, self.sandbox) {
            (Some(base_url), _) => base_url.as_str(),
            (None, true) => SANDBOX_URL,
            (None, false) => PRODUCTION_URL,
        };
        format!("{}/v{}/", host.trim_end_matches('/'), self.version)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
