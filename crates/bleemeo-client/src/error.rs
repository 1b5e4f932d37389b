//! Error types for API requests
//!
//! Every error that originates from a server response keeps that response
//! attached (see `Error::response`) so callers can inspect status, headers
//! and body.

use std::time::Duration;

use common::ApiResponse;
use reqwest::{Method, StatusCode, Url};
use tokio::time::Instant;

use crate::throttle::MAX_THROTTLE_DELAY;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid client configuration, raised before any network activity.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// OAuth exchange failure, or a request still unauthorized after
    /// re-authenticating.
    #[error("{message}")]
    Authentication {
        message: String,
        response: Option<Box<ApiResponse>>,
    },

    /// 400 response. `errors` holds one `field: message` entry per
    /// validation message.
    #[error("{message}")]
    BadRequest {
        message: String,
        errors: Vec<String>,
        response: Box<ApiResponse>,
    },

    #[error("Resource not found: {url}")]
    ResourceNotFound {
        url: Url,
        response: Box<ApiResponse>,
    },

    #[error(transparent)]
    Throttle(#[from] ThrottleError),

    /// Any other non-success status.
    #[error("Request {method} on {url} failed with status {}", .status.as_u16())]
    Api {
        method: Method,
        url: Url,
        status: StatusCode,
        response: Box<ApiResponse>,
    },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl Error {
    /// The server response behind this error, if any.
    pub fn response(&self) -> Option<&ApiResponse> {
        match self {
            Error::Authentication { response, .. } => response.as_deref(),
            Error::BadRequest { response, .. }
            | Error::ResourceNotFound { response, .. }
            | Error::Api { response, .. } => Some(&**response),
            Error::Throttle(throttle) => throttle.response.as_deref(),
            _ => None,
        }
    }

    /// HTTP status of the response behind this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.response().map(ApiResponse::status)
    }
}

impl From<bleemeo_auth::Error> for Error {
    fn from(err: bleemeo_auth::Error) -> Self {
        match err {
            bleemeo_auth::Error::Configuration(msg) => Error::Configuration(msg),
            bleemeo_auth::Error::Http(msg) => Error::Http(msg),
            bleemeo_auth::Error::InvalidUrl(msg) => Error::InvalidUrl(msg),
            bleemeo_auth::Error::Authentication { message, response } => Error::Authentication {
                message,
                response: Some(response),
            },
            bleemeo_auth::Error::Revoke { response, .. } => Error::Api {
                method: Method::POST,
                url: response.url().clone(),
                status: response.status(),
                response,
            },
        }
    }
}

/// Rate-limit error, either returned by the server (429) or synthesized
/// locally because the client is still inside a previous throttle window.
#[derive(Debug, thiserror::Error)]
#[error("Throttle error: request must be retried after {}s.", .delay.as_secs())]
pub struct ThrottleError {
    /// How long to wait before retrying, in whole seconds.
    pub delay: Duration,
    /// Point in time before which requests are refused.
    pub deadline: Instant,
    /// The 429 response; `None` when the request was prevented locally.
    pub response: Option<Box<ApiResponse>>,
}

impl ThrottleError {
    /// A throttle error for a 429 response received at `now`.
    pub fn from_response(response: ApiResponse, delay: Duration, now: Instant) -> Self {
        let deadline = now
            .checked_add(delay)
            .unwrap_or_else(|| now + MAX_THROTTLE_DELAY);
        Self {
            delay,
            deadline,
            response: Some(Box::new(response)),
        }
    }

    /// A throttle error raised without contacting the server.
    pub fn prevented(delay: Duration, deadline: Instant) -> Self {
        Self {
            delay,
            deadline,
            response: None,
        }
    }

    pub fn is_prevented(&self) -> bool {
        self.response.is_none()
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
