//! Configuration types and loading
//!
//! Precedence: environment variables > config file > defaults.
//! Secrets are read from `BLEEMEO_*` env vars or from `*_file` paths and are
//! never stored in the TOML directly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bleemeo_client::config::{
    DEFAULT_OAUTH_CLIENT_ID, DEFAULT_USER_AGENT, ENV_OAUTH_CLIENT_SECRET,
    ENV_OAUTH_INITIAL_REFRESH_TOKEN, ENV_PASSWORD,
};
use bleemeo_client::{ClientConfig, Secret};
use serde::Deserialize;

pub const ENV_CONFIG: &str = "BLEEMEO_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "bleemeo.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub headers: Vec<HeaderInjection>,
}

/// API endpoint settings
#[derive(Debug, Default, Deserialize)]
pub struct ApiConfig {
    pub url: Option<String>,
    pub account_id: Option<String>,
    pub user_agent: Option<String>,
    /// 0 disables the automatic retry of throttled requests.
    pub throttle_max_auto_retry_delay_secs: Option<u64>,
}

/// OAuth settings
#[derive(Debug, Default, Deserialize)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub oauth_client_id: Option<String>,
    #[serde(skip)]
    pub password: Option<Secret<String>>,
    pub password_file: Option<PathBuf>,
    #[serde(skip)]
    pub oauth_client_secret: Option<Secret<String>>,
    pub oauth_client_secret_file: Option<PathBuf>,
    #[serde(skip)]
    pub refresh_token: Option<Secret<String>>,
    pub refresh_token_file: Option<PathBuf>,
}

/// Extra header sent with every request
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderInjection {
    pub name: String,
    pub value: String,
}

impl Config {
    /// Load configuration from a TOML file and resolve secrets.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Like `load`, but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> common::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Self::parse("")
        }
    }

    fn parse(contents: &str) -> common::Result<Self> {
        let mut config: Config = toml::from_str(contents)?;

        if let Some(url) = &config.api.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "api.url must start with http:// or https://, got: {url}"
                )));
            }
        }
        if config.headers.iter().any(|h| h.name.trim().is_empty()) {
            return Err(common::Error::Config("header name must not be empty".into()));
        }

        let auth = &mut config.auth;
        auth.password = resolve_secret(ENV_PASSWORD, auth.password_file.as_deref())?;
        auth.oauth_client_secret =
            resolve_secret(ENV_OAUTH_CLIENT_SECRET, auth.oauth_client_secret_file.as_deref())?;
        auth.refresh_token =
            resolve_secret(ENV_OAUTH_INITIAL_REFRESH_TOKEN, auth.refresh_token_file.as_deref())?;

        Ok(config)
    }

    /// Resolve config file path from CLI arg or `BLEEMEO_CONFIG` env var.
    /// The second value tells whether the path was given explicitly.
    pub fn resolve_path(cli_path: Option<&str>) -> (PathBuf, bool) {
        if let Some(p) = cli_path {
            return (PathBuf::from(p), true);
        }
        if let Ok(p) = std::env::var(ENV_CONFIG) {
            return (PathBuf::from(p), true);
        }
        (PathBuf::from(DEFAULT_CONFIG_PATH), false)
    }

    /// Client configuration: environment first, then this file's values.
    pub fn into_client_config(self) -> ClientConfig {
        self.into_client_config_with(|key| std::env::var(key).ok())
    }

    pub fn into_client_config_with(
        self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ClientConfig {
        let mut client = ClientConfig::new().with_env_from(lookup);

        if client.api_url.is_none() {
            client.api_url = self.api.url;
        }
        if client.account_id.is_none() {
            client.account_id = self.api.account_id;
        }
        if let Some(user_agent) = self.api.user_agent {
            if client.user_agent == DEFAULT_USER_AGENT {
                client.user_agent = user_agent;
            }
        }
        if let Some(secs) = self.api.throttle_max_auto_retry_delay_secs {
            client.throttle_max_auto_retry_delay = Some(Duration::from_secs(secs));
        }

        let creds = &mut client.credentials;
        if creds.username.is_none() {
            creds.username = self.auth.username;
        }
        if creds.password.is_none() {
            creds.password = self.auth.password;
        }
        if creds.client_id == DEFAULT_OAUTH_CLIENT_ID {
            if let Some(id) = self.auth.oauth_client_id {
                creds.client_id = id;
            }
        }
        if creds.client_secret.is_none() {
            creds.client_secret = self.auth.oauth_client_secret;
        }
        if creds.initial_refresh_token.is_none() {
            creds.initial_refresh_token = self.auth.refresh_token;
        }

        client.custom_headers = self
            .headers
            .into_iter()
            .map(|h| (h.name, h.value))
            .collect();
        client
    }
}

/// Secret from `env_key` if set, else the trimmed contents of `file`.
/// An empty file yields `None`.
fn resolve_secret(env_key: &str, file: Option<&Path>) -> common::Result<Option<Secret<String>>> {
    if let Ok(value) = std::env::var(env_key) {
        if !value.is_empty() {
            return Ok(Some(Secret::new(value)));
        }
    }
    let Some(path) = file else {
        return Ok(None);
    };
    let contents = std::fs::read_to_string(path).map_err(|e| {
        common::Error::Config(format!("failed to read {}: {e}", path.display()))
    })?;
    let value = contents.trim().to_owned();
    Ok((!value.is_empty()).then(|| Secret::new(value)))
}
