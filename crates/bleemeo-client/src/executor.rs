//! Authenticated request execution
//!
//! Sends one logical request. Authenticated requests carry a bearer token
//! from the `TokenStore`; a 401 on the first attempt forces a token refetch
//! and a single resend. The response of the last attempt is returned as-is,
//! whatever its status, for the caller to classify.

use bleemeo_auth::TokenStore;
use common::ApiResponse;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::client::ACCOUNT_HEADER;
use crate::error::{Error, Result};
use crate::metrics;
use crate::request::RequestDescriptor;

pub struct Executor {
    http: reqwest::Client,
    tokens: TokenStore,
}

impl Executor {
    pub fn new(http: reqwest::Client, tokens: TokenStore) -> Self {
        Self { http, tokens }
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.tokens
    }

    pub async fn execute(&self, request: &RequestDescriptor) -> Result<ApiResponse> {
        let response = self.send(request, false).await?;
        if !(request.authenticated && response.status() == StatusCode::UNAUTHORIZED) {
            return Ok(response);
        }

        warn!(
            method = %request.method,
            url = %request.url,
            "access token rejected, re-authenticating"
        );
        metrics::record_reauthentication();
        self.send(request, true).await
    }

    async fn send(&self, request: &RequestDescriptor, force_refetch: bool) -> Result<ApiResponse> {
        let mut builder = self.http.request(request.method.clone(), request.url.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(account) = &request.account {
            builder = builder.header(ACCOUNT_HEADER, account.clone());
        }
        if request.authenticated {
            let token = self.tokens.get_token(force_refetch).await?;
            if token.is_empty() {
                return Err(Error::Authentication {
                    message: "token endpoint returned an empty access token".into(),
                    response: None,
                });
            }
            builder = builder.bearer_auth(token);
        }

        debug!(
            method = %request.method,
            url = %request.url,
            authenticated = request.authenticated,
            retry = force_refetch,
            "sending API request"
        );

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Http(format!("{} {} failed: {e}", request.method, request.url)))?;
        let response = ApiResponse::read(response).await.map_err(|e| {
            Error::Http(format!(
                "reading response of {} {} failed: {e}",
                request.method, request.url
            ))
        })?;

        debug!(
            method = %request.method,
            url = %request.url,
            status = response.status().as_u16(),
            "received API response"
        );
        metrics::record_request(request.method.as_str(), response.status().as_u16());
        Ok(response)
    }
}
