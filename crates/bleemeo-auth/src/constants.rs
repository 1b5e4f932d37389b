//! Bleemeo API and OAuth constants
//!
//! The default client id identifies the public Bleemeo OAuth application.
//! It is not a secret; deployments with their own application override it.

use std::time::Duration;

/// Base URL of the public Bleemeo API
pub const DEFAULT_API_URL: &str = "https://api.bleemeo.com";

/// Public OAuth client ID used when none is configured
pub const DEFAULT_OAUTH_CLIENT_ID: &str = "1fc6de3e-8750-472e-baea-3ba22bb4eb56";

/// Token endpoint, relative to the API URL
pub const TOKEN_PATH: &str = "/o/token/";

/// Token revocation endpoint, relative to the API URL
pub const REVOKE_PATH: &str = "/o/revoke_token/";

/// Timeout applied to every OAuth exchange
pub const OAUTH_TIMEOUT: Duration = Duration::from_secs(10);
