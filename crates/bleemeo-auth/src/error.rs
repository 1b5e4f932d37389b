//! Error types for OAuth authentication operations

use common::ApiResponse;

/// Errors from OAuth authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The token endpoint refused every available grant.
    #[error("{message}")]
    Authentication {
        message: String,
        response: Box<ApiResponse>,
    },

    /// The revocation endpoint answered with a non-200 status.
    #[error("{message}")]
    Revoke {
        message: String,
        response: Box<ApiResponse>,
    },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl Error {
    /// The server response behind this error, if any.
    pub fn response(&self) -> Option<&ApiResponse> {
        match self {
            Error::Authentication { response, .. } | Error::Revoke { response, .. } => {
                Some(&**response)
            }
            _ => None,
        }
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
