//! OAuth credentials for one API client
//!
//! A client authenticates either with a username/password pair, with an
//! initial refresh token, or with both (the refresh token is tried first,
//! the password grant is the fallback). The OAuth client id is always sent;
//! the client secret only when configured.

use common::Secret;

use crate::constants::DEFAULT_OAUTH_CLIENT_ID;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: Option<Secret<String>>,
    pub username: Option<String>,
    pub password: Option<Secret<String>>,
    pub initial_refresh_token: Option<Secret<String>>,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_OAUTH_CLIENT_ID.to_string(),
            client_secret: None,
            username: None,
            password: None,
            initial_refresh_token: None,
        }
    }
}

impl Credentials {
    /// Username/password credentials for the default OAuth client.
    pub fn password(username: impl Into<String>, password: impl Into<Secret<String>>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// Refresh-token-only credentials for the default OAuth client.
    pub fn refresh_token(token: impl Into<Secret<String>>) -> Self {
        Self {
            initial_refresh_token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn with_client(mut self, id: impl Into<String>, secret: Option<Secret<String>>) -> Self {
        self.client_id = id.into();
        self.client_secret = secret;
        self
    }

    pub fn with_initial_refresh_token(mut self, token: impl Into<Secret<String>>) -> Self {
        self.initial_refresh_token = Some(token.into());
        self
    }

    /// Configured username, ignoring empty strings.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref().filter(|u| !u.is_empty())
    }

    /// Configured initial refresh token, ignoring empty strings.
    pub fn initial_refresh_token(&self) -> Option<&Secret<String>> {
        self.initial_refresh_token.as_ref().filter(|t| !t.is_empty())
    }

    /// Reject credentials that can never authenticate.
    pub fn validate(&self) -> Result<()> {
        if self.username().is_none() && self.initial_refresh_token().is_none() {
            return Err(Error::Configuration(
                "either a username or an initial OAuth refresh token must be provided".into(),
            ));
        }
        if self.client_id.is_empty() {
            return Err(Error::Configuration("OAuth client id must not be empty".into()));
        }
        Ok(())
    }

    /// Client identification fields shared by every OAuth form.
    pub(crate) fn client_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![("client_id", self.client_id.as_str())];
        if let Some(secret) = self.client_secret.as_ref().filter(|s| !s.is_empty()) {
            fields.push(("client_secret", secret.expose().as_str()));
        }
        fields
    }
}
