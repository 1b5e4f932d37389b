//! Client-side metrics
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! every call is a no-op.
//!
//! - `bleemeo_client_requests_total` (counter): labels `method`, `status`
//! - `bleemeo_client_reauthentications_total` (counter)
//! - `bleemeo_client_throttled_total` (counter): label `kind` (`server`, `prevented`)
//! - `bleemeo_client_throttle_retries_total` (counter)

/// Record one HTTP exchange with the API.
pub fn record_request(method: &str, status: u16) {
    metrics::counter!(
        "bleemeo_client_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a forced token refetch after a 401.
pub fn record_reauthentication() {
    metrics::counter!("bleemeo_client_reauthentications_total").increment(1);
}

/// Record a throttled request. `prevented` requests never reached the server.
pub fn record_throttled(prevented: bool) {
    let kind = if prevented { "prevented" } else { "server" };
    metrics::counter!("bleemeo_client_throttled_total", "kind" => kind).increment(1);
}

/// Record an automatic sleep-and-retry after a 429.
pub fn record_throttle_retry() {
    metrics::counter!("bleemeo_client_throttle_retries_total").increment(1);
}
