//! Client configuration
//!
//! Built in code with the `with_*` setters, optionally completed from the
//! `BLEEMEO_*` environment variables. Values set explicitly always win over
//! the environment.

use std::time::Duration;

use bleemeo_auth::Credentials;
pub use bleemeo_auth::{DEFAULT_API_URL, DEFAULT_OAUTH_CLIENT_ID};
use common::Secret;

/// Default budget for sleeping through a 429 before retrying.
pub const DEFAULT_THROTTLE_MAX_AUTO_RETRY_DELAY: Duration = Duration::from_secs(60);

pub const DEFAULT_USER_AGENT: &str = "Bleemeo Rust Client";

pub const ENV_API_URL: &str = "BLEEMEO_API_URL";
pub const ENV_ACCOUNT_ID: &str = "BLEEMEO_ACCOUNT_ID";
pub const ENV_USER: &str = "BLEEMEO_USER";
pub const ENV_PASSWORD: &str = "BLEEMEO_PASSWORD";
pub const ENV_OAUTH_CLIENT_ID: &str = "BLEEMEO_OAUTH_CLIENT_ID";
pub const ENV_OAUTH_CLIENT_SECRET: &str = "BLEEMEO_OAUTH_CLIENT_SECRET";
pub const ENV_OAUTH_INITIAL_REFRESH_TOKEN: &str = "BLEEMEO_OAUTH_INITIAL_REFRESH_TOKEN";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL; `DEFAULT_API_URL` when unset.
    pub api_url: Option<String>,
    /// Sent as `X-Bleemeo-Account` to scope requests to one account.
    pub account_id: Option<String>,
    pub credentials: Credentials,
    /// Extra headers sent with every request, overriding the defaults.
    pub custom_headers: Vec<(String, String)>,
    /// `None` or zero disables the automatic retry of throttled requests.
    pub throttle_max_auto_retry_delay: Option<Duration>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            account_id: None,
            credentials: Credentials::default(),
            custom_headers: Vec::new(),
            throttle_max_auto_retry_delay: Some(DEFAULT_THROTTLE_MAX_AUTO_RETRY_DELAY),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration read entirely from the environment.
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_password(
        mut self,
        username: impl Into<String>,
        password: impl Into<Secret<String>>,
    ) -> Self {
        self.credentials.username = Some(username.into());
        self.credentials.password = Some(password.into());
        self
    }

    pub fn with_initial_refresh_token(mut self, token: impl Into<Secret<String>>) -> Self {
        self.credentials.initial_refresh_token = Some(token.into());
        self
    }

    pub fn with_oauth_client(
        mut self,
        client_id: impl Into<String>,
        client_secret: Option<Secret<String>>,
    ) -> Self {
        self.credentials.client_id = client_id.into();
        self.credentials.client_secret = client_secret;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    pub fn with_throttle_max_auto_retry_delay(mut self, delay: Option<Duration>) -> Self {
        self.throttle_max_auto_retry_delay = delay;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Fill unset values from the process environment.
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Fill unset values through `lookup`. Empty values count as unset.
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if self.api_url.is_none() {
            self.api_url = get(ENV_API_URL);
        }
        if self.account_id.is_none() {
            self.account_id = get(ENV_ACCOUNT_ID);
        }

        let creds = &mut self.credentials;
        if creds.username.is_none() {
            creds.username = get(ENV_USER);
        }
        if creds.password.is_none() {
            creds.password = get(ENV_PASSWORD).map(Secret::new);
        }
        if creds.client_id == DEFAULT_OAUTH_CLIENT_ID {
            if let Some(id) = get(ENV_OAUTH_CLIENT_ID) {
                creds.client_id = id;
            }
        }
        if creds.client_secret.is_none() {
            creds.client_secret = get(ENV_OAUTH_CLIENT_SECRET).map(Secret::new);
        }
        if creds.initial_refresh_token.is_none() {
            creds.initial_refresh_token = get(ENV_OAUTH_INITIAL_REFRESH_TOKEN).map(Secret::new);
        }
        self
    }

    /// API URL in effect.
    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = ClientConfig::new();
        assert_eq!(config.api_url(), DEFAULT_API_URL);
        assert_eq!(config.credentials.client_id, DEFAULT_OAUTH_CLIENT_ID);
        assert_eq!(
            config.throttle_max_auto_retry_delay,
            Some(DEFAULT_THROTTLE_MAX_AUTO_RETRY_DELAY)
        );
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn environment_fills_every_field() {
        let config = ClientConfig::new().with_env_from(env(&[
            (ENV_API_URL, "https://api.example.com"),
            (ENV_ACCOUNT_ID, "acct-1"),
            (ENV_USER, "alice@example.com"),
            (ENV_PASSWORD, "hunter2"),
            (ENV_OAUTH_CLIENT_ID, "my-app"),
            (ENV_OAUTH_CLIENT_SECRET, "s3cr3t"),
            (ENV_OAUTH_INITIAL_REFRESH_TOKEN, "rt_seed"),
        ]));

        assert_eq!(config.api_url(), "https://api.example.com");
        assert_eq!(config.account_id.as_deref(), Some("acct-1"));
        let creds = &config.credentials;
        assert_eq!(creds.username.as_deref(), Some("alice@example.com"));
        assert_eq!(creds.password.as_ref().unwrap().expose(), "hunter2");
        assert_eq!(creds.client_id, "my-app");
        assert_eq!(creds.client_secret.as_ref().unwrap().expose(), "s3cr3t");
        assert_eq!(creds.initial_refresh_token.as_ref().unwrap().expose(), "rt_seed");
    }

    #[test]
    fn explicit_values_win_over_environment() {
        let config = ClientConfig::new()
            .with_api_url("https://staging.example.com")
            .with_password("bob", "pw")
            .with_oauth_client("explicit-app", None)
            .with_env_from(env(&[
                (ENV_API_URL, "https://api.example.com"),
                (ENV_USER, "alice"),
                (ENV_OAUTH_CLIENT_ID, "env-app"),
            ]));

        assert_eq!(config.api_url(), "https://staging.example.com");
        assert_eq!(config.credentials.username.as_deref(), Some("bob"));
        assert_eq!(config.credentials.client_id, "explicit-app");
    }

    #[test]
    fn empty_environment_values_are_ignored() {
        let config = ClientConfig::new().with_env_from(env(&[(ENV_USER, ""), (ENV_API_URL, "")]));
        assert!(config.credentials.username.is_none());
        assert_eq!(config.api_url(), DEFAULT_API_URL);
    }
}
