//! Status-code classification
//!
//! Maps the executor's final response onto the typed error taxonomy. A 429
//! also pushes the shared throttle deadline forward so that later requests
//! fail fast.

use common::ApiResponse;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::time::Instant;
use tracing::warn;

use crate::error::{Error, Result, ThrottleError};
use crate::metrics;
use crate::request::RequestDescriptor;
use crate::throttle::{ThrottleGuard, retry_after};

/// Turn a response into success or a typed error.
pub async fn classify(
    request: &RequestDescriptor,
    response: ApiResponse,
    throttle: &ThrottleGuard,
) -> Result<ApiResponse> {
    let status = response.status();
    if status.as_u16() < 400 {
        throttle.clear_elapsed().await;
        return Ok(response);
    }

    match status {
        StatusCode::BAD_REQUEST => {
            let errors = validation_errors(&response);
            let message = if errors.is_empty() {
                format!("Bad request on {}", request.url)
            } else {
                format!("Bad request on {}: {}", request.url, errors.join("; "))
            };
            Err(Error::BadRequest {
                message,
                errors,
                response: Box::new(response),
            })
        }
        StatusCode::UNAUTHORIZED => Err(Error::Authentication {
            message: format!("Authentication failed on {}", request.url),
            response: Some(Box::new(response)),
        }),
        StatusCode::NOT_FOUND => Err(Error::ResourceNotFound {
            url: request.url.clone(),
            response: Box::new(response),
        }),
        StatusCode::TOO_MANY_REQUESTS => {
            let delay = retry_after(&response);
            let err = ThrottleError::from_response(response, delay, Instant::now());
            let deadline = throttle.extend(err.deadline).await;
            warn!(
                url = %request.url,
                delay_secs = delay.as_secs(),
                window_secs = deadline.saturating_duration_since(Instant::now()).as_secs(),
                "request throttled by server"
            );
            metrics::record_throttled(false);
            Err(Error::Throttle(err))
        }
        _ => Err(Error::Api {
            method: request.method.clone(),
            url: request.url.clone(),
            status,
            response: Box::new(response),
        }),
    }
}

/// Field-level validation messages of a 400 body, as `field: message`.
///
/// Nested objects produce dotted field names; `non_field_errors` entries
/// carry no field prefix of their own. A non-JSON body yields its text.
fn validation_errors(response: &ApiResponse) -> Vec<String> {
    let mut out = Vec::new();
    match response.json::<Value>() {
        Ok(body) => collect(None, &body, &mut out),
        Err(_) => {
            let text = response.text();
            let text = text.trim();
            if !text.is_empty() {
                out.push(text.to_string());
            }
        }
    }
    out
}

fn collect(field: Option<&str>, value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect(field, item, out);
            }
        }
        Value::Object(map) => {
            for (key, nested) in map {
                let path = match (field, key.as_str()) {
                    (parent, "non_field_errors") => parent.map(str::to_owned),
                    (Some(parent), key) => Some(format!("{parent}.{key}")),
                    (None, key) => Some(key.to_owned()),
                };
                collect(path.as_deref(), nested, out);
            }
        }
        Value::String(message) => out.push(with_field(field, message)),
        Value::Null => {}
        other => out.push(with_field(field, &other.to_string())),
    }
}

fn with_field(field: Option<&str>, message: &str) -> String {
    match field {
        Some(field) => format!("{field}: {message}"),
        None => message.to_owned(),
    }
}
