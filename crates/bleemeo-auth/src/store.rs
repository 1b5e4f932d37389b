//! In-memory OAuth token store
//!
//! Holds the single live access/refresh token pair of a client. A tokio
//! Mutex guards both halves together: the check-then-authenticate sequence
//! of `get_token`/`tokens` and the whole of `logout` run under it, so
//! concurrent callers never interleave an exchange or read a torn pair.

use common::Secret;
use reqwest::Url;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::constants::{REVOKE_PATH, TOKEN_PATH};
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::token::{self, GrantOutcome, TokenResponse};

/// A consistent access/refresh token snapshot.
#[derive(Clone, PartialEq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Default)]
struct TokenState {
    access: Option<Secret<String>>,
    refresh: Option<Secret<String>>,
}

pub struct TokenStore {
    http: reqwest::Client,
    token_url: Url,
    revoke_url: Url,
    credentials: Credentials,
    state: Mutex<TokenState>,
}

impl TokenStore {
    /// Build a store for the API at `api_url`.
    ///
    /// Fails with `Configuration` before any network activity when the
    /// credentials can never authenticate. The store is seeded with the
    /// initial refresh token, if one is configured.
    pub fn new(http: reqwest::Client, api_url: &Url, credentials: Credentials) -> Result<Self> {
        credentials.validate()?;

        let token_url = api_url
            .join(TOKEN_PATH)
            .map_err(|e| Error::InvalidUrl(format!("{api_url}{TOKEN_PATH}: {e}")))?;
        let revoke_url = api_url
            .join(REVOKE_PATH)
            .map_err(|e| Error::InvalidUrl(format!("{api_url}{REVOKE_PATH}: {e}")))?;

        let state = TokenState {
            access: None,
            refresh: credentials.initial_refresh_token().cloned(),
        };

        Ok(Self {
            http,
            token_url,
            revoke_url,
            credentials,
            state: Mutex::new(state),
        })
    }

    /// Current access token, authenticating first when none is held or
    /// when `force_refetch` is set.
    pub async fn get_token(&self, force_refetch: bool) -> Result<String> {
        let mut state = self.state.lock().await;
        if force_refetch || state.access.is_none() {
            self.authenticate(&mut state).await?;
        }
        current_access(&state)
    }

    /// Current token pair, authenticating first when no access token is held.
    pub async fn tokens(&self) -> Result<TokenPair> {
        let mut state = self.state.lock().await;
        if state.access.is_none() {
            self.authenticate(&mut state).await?;
        }
        Ok(TokenPair {
            access_token: current_access(&state)?,
            refresh_token: state
                .refresh
                .as_ref()
                .map(|r| r.expose().clone())
                .unwrap_or_default(),
        })
    }

    /// Revoke the refresh token and forget both tokens.
    ///
    /// No-op when no refresh token is held. On a non-200 revocation
    /// response the tokens are kept and the error is returned.
    pub async fn logout(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let Some(refresh) = state.refresh.as_ref() else {
            debug!("no refresh token held, nothing to revoke");
            return Ok(());
        };

        token::revoke(&self.http, &self.revoke_url, &self.credentials, refresh.expose()).await?;

        state.access = None;
        state.refresh = None;
        info!("OAuth refresh token revoked");
        Ok(())
    }

    /// Run the refresh-then-password sequence. Caller holds the lock.
    async fn authenticate(&self, state: &mut TokenState) -> Result<()> {
        if let Some(refresh) = state.refresh.as_ref() {
            let outcome =
                token::refresh_grant(&self.http, &self.token_url, &self.credentials, refresh.expose())
                    .await?;
            match outcome {
                GrantOutcome::Granted(tokens) => {
                    adopt(state, tokens);
                    info!(grant = "refresh_token", "obtained OAuth access token");
                    return Ok(());
                }
                GrantOutcome::Rejected(response) => {
                    if self.credentials.username().is_none() {
                        return Err(Error::Authentication {
                            message: "The provided initial refresh token is invalid.".into(),
                            response: Box::new(response),
                        });
                    }
                    warn!(
                        status = response.status().as_u16(),
                        "refresh token rejected, falling back to password grant"
                    );
                }
            }
        }

        match token::password_grant(&self.http, &self.token_url, &self.credentials).await? {
            GrantOutcome::Granted(tokens) => {
                adopt(state, tokens);
                info!(grant = "password", "obtained OAuth access token");
                Ok(())
            }
            GrantOutcome::Rejected(response) => Err(Error::Authentication {
                message: format!(
                    "Failed to retrieve OAuth, status={}",
                    response.status().as_u16()
                ),
                response: Box::new(response),
            }),
        }
    }
}

fn adopt(state: &mut TokenState, tokens: TokenResponse) {
    state.access = Some(Secret::new(tokens.access_token));
    state.refresh = Some(Secret::new(tokens.refresh_token));
}

fn current_access(state: &TokenState) -> Result<String> {
    state
        .access
        .as_ref()
        .map(|a| a.expose().clone())
        .ok_or_else(|| Error::Configuration("no access token after authentication".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer, credentials: Credentials) -> TokenStore {
        let api_url = Url::parse(&server.uri()).unwrap();
        TokenStore::new(reqwest::Client::new(), &api_url, credentials).unwrap()
    }

    fn granted(access: &str, refresh: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": access,
            "refresh_token": refresh,
            "expires_in": 36000,
        }))
    }

    #[tokio::test]
    async fn new_rejects_missing_credentials_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(granted("at", "rt"))
            .expect(0)
            .mount(&server)
            .await;

        let api_url = Url::parse(&server.uri()).unwrap();
        let result = TokenStore::new(reqwest::Client::new(), &api_url, Credentials::default());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn get_token_caches_until_forced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/o/token/"))
            .and(body_string_contains("grant_type=password"))
            .respond_with(granted("at_1", "rt_1"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/o/token/"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=rt_1"))
            .respond_with(granted("at_2", "rt_2"))
            .expect(1)
            .mount(&server)
            .await;

        let store = store(&server, Credentials::password("alice", "pw"));
        assert_eq!(store.get_token(false).await.unwrap(), "at_1");
        assert_eq!(store.get_token(false).await.unwrap(), "at_1");
        assert_eq!(store.get_token(true).await.unwrap(), "at_2");

        let pair = store.tokens().await.unwrap();
        assert_eq!(pair.access_token, "at_2");
        assert_eq!(pair.refresh_token, "rt_2");
    }

    #[tokio::test]
    async fn seeded_refresh_token_is_tried_first() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("refresh_token=rt_seed"))
            .respond_with(granted("at_seeded", "rt_rotated"))
            .expect(1)
            .mount(&server)
            .await;

        let store = store(&server, Credentials::refresh_token("rt_seed"));
        let pair = store.tokens().await.unwrap();
        assert_eq!(pair.access_token, "at_seeded");
        assert_eq!(pair.refresh_token, "rt_rotated");
    }

    #[tokio::test]
    async fn rejected_refresh_falls_back_to_password() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("grant_type=password"))
            .respond_with(granted("at_pw", "rt_pw"))
            .expect(1)
            .mount(&server)
            .await;

        let creds = Credentials::password("alice", "pw").with_initial_refresh_token("rt_expired");
        let store = store(&server, creds);
        assert_eq!(store.get_token(false).await.unwrap(), "at_pw");
    }

    #[tokio::test]
    async fn rejected_refresh_without_username_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("grant_type=password"))
            .respond_with(granted("at", "rt"))
            .expect(0)
            .mount(&server)
            .await;

        let store = store(&server, Credentials::refresh_token("rt_bogus"));
        let err = store.get_token(false).await.unwrap_err();
        assert_eq!(err.to_string(), "The provided initial refresh token is invalid.");
        assert_eq!(err.response().unwrap().status().as_u16(), 401);
    }

    #[tokio::test]
    async fn rejected_password_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let store = store(&server, Credentials::password("alice", "wrong"));
        let err = store.get_token(false).await.unwrap_err();
        assert!(matches!(err, Error::Authentication { .. }), "got: {err:?}");
        assert_eq!(err.to_string(), "Failed to retrieve OAuth, status=401");
        assert_eq!(err.response().unwrap().text(), "invalid_grant");
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/o/token/"))
            .respond_with(granted("at_shared", "rt_shared"))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(store(&server, Credentials::password("alice", "pw")));
        let mut handles = vec![];
        for _ in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.get_token(false).await }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap().unwrap(), "at_shared");
        }
    }

    #[tokio::test]
    async fn logout_revokes_and_clears() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/o/token/"))
            .respond_with(granted("at_1", "rt_1"))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/o/revoke_token/"))
            .and(body_string_contains("token=rt_1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = store(&server, Credentials::password("alice", "pw"));
        store.get_token(false).await.unwrap();
        store.logout().await.unwrap();

        // Nothing left to revoke
        store.logout().await.unwrap();

        // Next use authenticates from scratch with the password grant
        assert_eq!(store.get_token(false).await.unwrap(), "at_1");
    }

    #[tokio::test]
    async fn logout_without_refresh_token_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let store = store(&server, Credentials::password("alice", "pw"));
        store.logout().await.unwrap();
    }

    #[tokio::test]
    async fn failed_revocation_keeps_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/o/token/"))
            .respond_with(granted("at_1", "rt_1"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/o/revoke_token/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let store = store(&server, Credentials::password("alice", "pw"));
        store.get_token(false).await.unwrap();
        let err = store.logout().await.unwrap_err();
        assert!(matches!(err, Error::Revoke { .. }), "got: {err:?}");
        assert_eq!(store.get_token(false).await.unwrap(), "at_1");
    }
}
