//! Client for the Bleemeo REST API
//!
//! `Client` wraps OAuth2 authentication, transparent re-authentication on
//! 401, rate-limit handling and pagination behind a small CRUD surface.
//!
//! ```no_run
//! use bleemeo_client::{Client, ClientConfig, Resource};
//! use futures_util::TryStreamExt;
//!
//! # async fn run() -> bleemeo_client::Result<()> {
//! let client = Client::new(ClientConfig::from_env())?;
//! let params = vec![("active".to_string(), "true".to_string())];
//! let mut metrics = client.iterate(Resource::Metric, &params);
//! while let Some(metric) = metrics.try_next().await? {
//!     println!("{}", metric["label"]);
//! }
//! client.logout().await?;
//! # Ok(())
//! # }
//! ```

mod classify;
mod client;
pub mod config;
pub mod error;
mod executor;
mod metrics;
mod pagination;
mod request;
pub mod resources;
pub mod throttle;

pub use bleemeo_auth::{Credentials, TokenPair};
pub use client::{ACCOUNT_HEADER, Client};
pub use common::{ApiResponse, Secret};
pub use config::ClientConfig;
pub use error::{Error, Result, ThrottleError};
pub use pagination::ITERATE_PAGE_SIZE;
pub use reqwest::{Method, StatusCode, Url};
pub use resources::{Resource, UnknownResource};
pub use throttle::{DEFAULT_THROTTLE_DELAY, MAX_THROTTLE_DELAY, RetryPolicy, ThrottleGuard};
