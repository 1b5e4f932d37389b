//! Request descriptor

use reqwest::header::HeaderValue;
use reqwest::{Method, Url};
use serde_json::Value;

/// One logical API call. Built fresh for every call; the executor derives a
/// new HTTP request from it for each attempt.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub authenticated: bool,
    /// `X-Bleemeo-Account` value, if the call is scoped to an account.
    pub account: Option<HeaderValue>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            query: Vec::new(),
            body: None,
            authenticated: true,
            account: None,
        }
    }

    pub fn query(mut self, params: &[(String, String)]) -> Self {
        self.query.extend_from_slice(params);
        self
    }

    pub fn body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    pub fn authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }

    pub fn account(mut self, account: Option<HeaderValue>) -> Self {
        self.account = account;
        self
    }
}
