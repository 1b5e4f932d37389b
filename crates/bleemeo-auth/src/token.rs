//! OAuth token exchanges
//!
//! Three endpoint interactions, all form-encoded POSTs with a 10 second
//! timeout:
//! 1. `refresh_token` grant against the token endpoint
//! 2. `password` grant against the token endpoint
//! 3. refresh token revocation
//!
//! Grants report a rejection as `GrantOutcome::Rejected` rather than an
//! error, because the store decides whether a rejected refresh token is
//! fatal or falls back to the password grant.

use common::ApiResponse;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::constants::OAUTH_TIMEOUT;
use crate::credentials::Credentials;
use crate::error::{Error, Result};

const X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");

/// Token endpoint response. Fields other than the pair are ignored.
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Result of a grant that reached the token endpoint.
#[derive(Debug)]
pub enum GrantOutcome {
    Granted(TokenResponse),
    /// The endpoint answered with a status other than 200.
    Rejected(ApiResponse),
}

/// Exchange a refresh token for a new token pair.
pub async fn refresh_grant(
    client: &reqwest::Client,
    token_url: &Url,
    credentials: &Credentials,
    refresh: &str,
) -> Result<GrantOutcome> {
    let mut form = vec![("grant_type", "refresh_token"), ("refresh_token", refresh)];
    form.extend(credentials.client_fields());

    let response = post_form(client, token_url, &form).await?;
    grant_outcome(response)
}

/// Exchange the configured username/password for a token pair.
pub async fn password_grant(
    client: &reqwest::Client,
    token_url: &Url,
    credentials: &Credentials,
) -> Result<GrantOutcome> {
    let password = credentials
        .password
        .as_ref()
        .map(|p| p.expose().as_str())
        .unwrap_or_default();
    let mut form = vec![
        ("grant_type", "password"),
        ("username", credentials.username().unwrap_or_default()),
        ("password", password),
    ];
    form.extend(credentials.client_fields());

    let response = post_form(client, token_url, &form).await?;
    grant_outcome(response)
}

/// Revoke a refresh token so it cannot be reused.
pub async fn revoke(
    client: &reqwest::Client,
    revoke_url: &Url,
    credentials: &Credentials,
    refresh: &str,
) -> Result<()> {
    let mut form = vec![("token", refresh), ("token_type_hint", "refresh_token")];
    form.extend(credentials.client_fields());

    let response = post_form(client, revoke_url, &form).await?;
    if response.status() != StatusCode::OK {
        return Err(Error::Revoke {
            message: format!("Failed to revoke token, status={}", response.status().as_u16()),
            response: Box::new(response),
        });
    }
    Ok(())
}

async fn post_form(client: &reqwest::Client, url: &Url, form: &[(&str, &str)]) -> Result<ApiResponse> {
    let grant = form
        .iter()
        .find(|(k, _)| *k == "grant_type")
        .map(|(_, v)| *v)
        .unwrap_or("revoke");
    debug!(url = %url, grant, "posting OAuth form");

    let response = client
        .post(url.clone())
        .header(X_REQUESTED_WITH, HeaderValue::from_static("XMLHttpRequest"))
        .form(form)
        .timeout(OAUTH_TIMEOUT)
        .send()
        .await
        .map_err(|e| Error::Http(format!("OAuth request to {url} failed: {e}")))?;

    ApiResponse::read(response)
        .await
        .map_err(|e| Error::Http(format!("reading OAuth response from {url} failed: {e}")))
}

fn grant_outcome(response: ApiResponse) -> Result<GrantOutcome> {
    if response.status() != StatusCode::OK {
        return Ok(GrantOutcome::Rejected(response));
    }
    match response.json::<TokenResponse>() {
        Ok(tokens) => Ok(GrantOutcome::Granted(tokens)),
        Err(e) => Err(Error::Authentication {
            message: format!("invalid token response: {e}"),
            response: Box::new(response),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token_url(server: &MockServer) -> Url {
        Url::parse(&server.uri()).unwrap().join("/o/token/").unwrap()
    }

    #[test]
    fn token_response_ignores_extra_fields() {
        let json = r#"{"access_token":"at_abc","refresh_token":"rt_def","expires_in":36000,"token_type":"Bearer"}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "at_abc");
        assert_eq!(token.refresh_token, "rt_def");
        assert!(!format!("{token:?}").contains("at_abc"));
    }

    #[tokio::test]
    async fn password_grant_posts_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/o/token/"))
            .and(header("x-requested-with", "XMLHttpRequest"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("username=alice"))
            .and(body_string_contains("password=hunter2"))
            .and(body_string_contains("client_id=my-app"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at_1",
                "refresh_token": "rt_1",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let creds = Credentials::password("alice", "hunter2").with_client("my-app", None);
        let outcome = password_grant(&reqwest::Client::new(), &token_url(&server), &creds)
            .await
            .unwrap();
        match outcome {
            GrantOutcome::Granted(tokens) => assert_eq!(tokens.access_token, "at_1"),
            GrantOutcome::Rejected(resp) => panic!("unexpected rejection: {}", resp.status()),
        }
    }

    #[tokio::test]
    async fn refresh_grant_reports_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/o/token/"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=rt_stale"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let creds = Credentials::refresh_token("rt_stale");
        let outcome = refresh_grant(&reqwest::Client::new(), &token_url(&server), &creds, "rt_stale")
            .await
            .unwrap();
        match outcome {
            GrantOutcome::Rejected(resp) => assert_eq!(resp.status(), StatusCode::BAD_REQUEST),
            GrantOutcome::Granted(_) => panic!("stale refresh token must be rejected"),
        }
    }

    #[tokio::test]
    async fn malformed_token_body_is_an_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"access_token":"at_only"}"#))
            .mount(&server)
            .await;

        let creds = Credentials::password("alice", "pw");
        let err = password_grant(&reqwest::Client::new(), &token_url(&server), &creds)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authentication { .. }), "got: {err:?}");
        assert_eq!(err.response().unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn revoke_sends_token_type_hint_and_secret() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/o/revoke_token/"))
            .and(body_string_contains("token=rt_live"))
            .and(body_string_contains("token_type_hint=refresh_token"))
            .and(body_string_contains("client_secret=s3cr3t"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let creds = Credentials::password("alice", "pw")
            .with_client("my-app", Some(common::Secret::from("s3cr3t")));
        let url = Url::parse(&server.uri()).unwrap().join("/o/revoke_token/").unwrap();
        revoke(&reqwest::Client::new(), &url, &creds, "rt_live")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn revoke_failure_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let creds = Credentials::refresh_token("rt_live");
        let url = Url::parse(&server.uri()).unwrap().join("/o/revoke_token/").unwrap();
        let err = revoke(&reqwest::Client::new(), &url, &creds, "rt_live")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to revoke token, status=503");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_http_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("http://{addr}/o/token/")).unwrap();
        let creds = Credentials::password("alice", "pw");
        let err = password_grant(&reqwest::Client::new(), &url, &creds)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(_)), "got: {err:?}");
    }
}
