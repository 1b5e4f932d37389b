//! Buffered HTTP response snapshot
//!
//! The client reads every response body eagerly so that the same response
//! can be classified, attached to an error, and handed back to the caller
//! without worrying about a consumed stream.

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

/// A fully read API response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    url: Url,
    body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, url: Url, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            url,
            body: body.into(),
        }
    }

    /// Drain a reqwest response into a snapshot.
    pub async fn read(response: reqwest::Response) -> reqwest::Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.bytes().await?;
        Ok(Self {
            status,
            headers,
            url,
            body,
        })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as a string, if present and valid ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// URL the response was served from.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, RETRY_AFTER};

    fn response(body: &'static str) -> ApiResponse {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        ApiResponse::new(
            StatusCode::OK,
            headers,
            Url::parse("https://api.bleemeo.com/v1/metric/").unwrap(),
            body,
        )
    }

    #[test]
    fn json_decodes_body() {
        let resp = response(r#"{"count":3,"results":[]}"#);
        let value: serde_json::Value = resp.json().unwrap();
        assert_eq!(value["count"], 3);
    }

    #[test]
    fn json_reports_invalid_body() {
        let resp = response("<html>gateway</html>");
        assert!(resp.json::<serde_json::Value>().is_err());
        assert_eq!(resp.text(), "<html>gateway</html>");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let resp = response("");
        assert_eq!(resp.header("retry-after"), Some("12"));
        assert_eq!(resp.header("Retry-After"), Some("12"));
        assert_eq!(resp.header("x-missing"), None);
    }
}
