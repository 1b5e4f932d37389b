//! Bleemeo API client
//!
//! Every call goes through the same pipeline: throttle check, authenticated
//! execution, then status classification. A throttled request is retried
//! once after the server-announced delay when the retry policy allows it.

use bleemeo_auth::{TokenPair, TokenStore};
use common::ApiResponse;
use futures_util::stream::BoxStream;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::metrics;
use crate::pagination;
use crate::request::RequestDescriptor;
use crate::throttle::{RetryPolicy, ThrottleGuard};

/// Header scoping requests to one account.
pub const ACCOUNT_HEADER: &str = "X-Bleemeo-Account";

pub struct Client {
    api_url: Url,
    account: Option<(String, HeaderValue)>,
    executor: Executor,
    throttle: ThrottleGuard,
    retry: RetryPolicy,
}

impl Client {
    /// Build a client. Fails without touching the network when the
    /// configuration can never work.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.credentials.validate()?;

        let api_url = parse_api_url(config.api_url())?;
        let headers = default_headers(&config)?;
        let account = account_header(&config)?;
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;
        let tokens = TokenStore::new(http.clone(), &api_url, config.credentials)?;

        info!(
            api_url = %api_url,
            account_id = account.as_ref().map_or("default", |(id, _)| id.as_str()),
            "Bleemeo client configured"
        );

        Ok(Self {
            api_url,
            account,
            executor: Executor::new(http, tokens),
            throttle: ThrottleGuard::new(),
            retry: RetryPolicy::new(config.throttle_max_auto_retry_delay),
        })
    }

    /// Send a request to `url`, a route relative to the API URL or an
    /// absolute URL.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        authenticated: bool,
        params: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<ApiResponse> {
        let request = RequestDescriptor::new(method, self.build_url(url)?)
            .query(params)
            .body(body.cloned())
            .authenticated(authenticated)
            .account(self.account.as_ref().map(|(_, value)| value.clone()));

        self.check_throttle().await?;
        match self.send(&request).await {
            Err(Error::Throttle(throttle)) if self.retry.allows(throttle.delay) => {
                warn!(
                    method = %request.method,
                    url = %request.url,
                    delay_secs = throttle.delay.as_secs(),
                    "throttled, retrying after delay"
                );
                metrics::record_throttle_retry();
                tokio::time::sleep(throttle.delay).await;
                self.check_throttle().await?;
                self.send(&request).await
            }
            other => other,
        }
    }

    async fn check_throttle(&self) -> Result<()> {
        self.throttle.check().await.map_err(|err| {
            debug!(delay_secs = err.delay.as_secs(), "request prevented by throttle window");
            metrics::record_throttled(true);
            Error::Throttle(err)
        })
    }

    async fn send(&self, request: &RequestDescriptor) -> Result<ApiResponse> {
        let response = self.executor.execute(request).await?;
        classify(request, response, &self.throttle).await
    }

    /// Resolve `url` against the API URL, making sure the path ends with a
    /// slash. Absolute URLs are kept as they are apart from that slash.
    pub fn build_url(&self, url: &str) -> Result<Url> {
        let mut full = self
            .api_url
            .join(url)
            .map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        if !full.path().ends_with('/') {
            let path = format!("{}/", full.path());
            full.set_path(&path);
        }
        Ok(full)
    }

    /// Fetch one record.
    pub async fn get(
        &self,
        resource: impl AsRef<str>,
        id: &str,
        fields: &[&str],
    ) -> Result<ApiResponse> {
        let url = item_route(resource.as_ref(), id);
        self.request(Method::GET, &url, true, &fields_param(fields), None)
            .await
    }

    /// Fetch one page of a list. `page` and `page_size` replace any value
    /// present in `params`.
    pub async fn get_page(
        &self,
        resource: impl AsRef<str>,
        page: u32,
        page_size: u32,
        params: &[(String, String)],
    ) -> Result<ApiResponse> {
        let mut query: Vec<(String, String)> = params
            .iter()
            .filter(|(key, _)| key != "page" && key != "page_size")
            .cloned()
            .collect();
        query.push(("page".to_string(), page.to_string()));
        query.push(("page_size".to_string(), page_size.to_string()));

        self.request(Method::GET, resource.as_ref(), true, &query, None)
            .await
    }

    /// Number of records matching `params`, without fetching them.
    pub async fn count(
        &self,
        resource: impl AsRef<str>,
        params: &[(String, String)],
    ) -> Result<u64> {
        #[derive(Deserialize)]
        struct Count {
            count: u64,
        }

        let response = self.get_page(resource, 1, 0, params).await?;
        response
            .json::<Count>()
            .map(|c| c.count)
            .map_err(|e| Error::Decode(format!("invalid count from {}: {e}", response.url())))
    }

    /// Stream every record matching `params`, fetching pages on demand.
    pub fn iterate<'a>(
        &'a self,
        resource: impl AsRef<str>,
        params: &[(String, String)],
    ) -> BoxStream<'a, Result<Value>> {
        pagination::iterate(self, resource.as_ref().to_string(), params)
    }

    pub async fn create(
        &self,
        resource: impl AsRef<str>,
        body: &Value,
        fields: &[&str],
    ) -> Result<ApiResponse> {
        self.request(
            Method::POST,
            resource.as_ref(),
            true,
            &fields_param(fields),
            Some(body),
        )
        .await
    }

    /// Partially update one record.
    pub async fn update(
        &self,
        resource: impl AsRef<str>,
        id: &str,
        body: &Value,
        fields: &[&str],
    ) -> Result<ApiResponse> {
        let url = item_route(resource.as_ref(), id);
        self.request(Method::PATCH, &url, true, &fields_param(fields), Some(body))
            .await
    }

    pub async fn delete(&self, resource: impl AsRef<str>, id: &str) -> Result<ApiResponse> {
        let url = item_route(resource.as_ref(), id);
        self.request(Method::DELETE, &url, true, &[], None).await
    }

    /// Access and refresh tokens, authenticating first if needed.
    pub async fn tokens(&self) -> Result<TokenPair> {
        Ok(self.executor.token_store().tokens().await?)
    }

    /// Revoke the refresh token held by the client, if any.
    pub async fn logout(&self) -> Result<()> {
        Ok(self.executor.token_store().logout().await?)
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account.as_ref().map(|(id, _)| id.as_str())
    }

    /// Scope later requests to another account, or to the user's default
    /// account with `None`. Requests already in flight are unaffected.
    pub fn set_account_id(&mut self, account_id: Option<String>) -> Result<()> {
        self.account = match account_id.filter(|id| !id.is_empty()) {
            Some(id) => {
                let value = header_value(&id)?;
                Some((id, value))
            }
            None => None,
        };
        debug!(account_id = self.account_id().unwrap_or("default"), "account changed");
        Ok(())
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }
}

fn parse_api_url(raw: &str) -> Result<Url> {
    let mut url =
        Url::parse(raw).map_err(|e| Error::Configuration(format!("invalid API URL {raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Configuration(format!(
            "API URL must use http or https, got {raw:?}"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Headers sent on every request. The account header is left out: it is
/// attached per request so that it can change after construction.
fn default_headers(config: &ClientConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, header_value(&config.user_agent)?);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    for (name, value) in &config.custom_headers {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Configuration(format!("invalid header name {name:?}: {e}")))?;
        if header != ACCOUNT_HEADER {
            headers.insert(header, header_value(value)?);
        }
    }
    Ok(headers)
}

/// Account scoping requests: a custom `X-Bleemeo-Account` header wins over
/// the configured account id.
fn account_header(config: &ClientConfig) -> Result<Option<(String, HeaderValue)>> {
    let custom = config
        .custom_headers
        .iter()
        .rev()
        .find(|(name, _)| name.eq_ignore_ascii_case(ACCOUNT_HEADER))
        .map(|(_, value)| value.as_str());
    let Some(id) = custom.or(config.account_id.as_deref()).filter(|id| !id.is_empty()) else {
        return Ok(None);
    };
    Ok(Some((id.to_string(), header_value(id)?)))
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::Configuration(format!("invalid header value {value:?}: {e}")))
}

fn item_route(route: &str, id: &str) -> String {
    format!("{}/{id}", route.trim_end_matches('/'))
}

fn fields_param(fields: &[&str]) -> Vec<(String, String)> {
    if fields.is_empty() {
        Vec::new()
    } else {
        vec![("fields".to_string(), fields.join(","))]
    }
}
