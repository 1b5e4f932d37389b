//! Bleemeo OAuth authentication library
//!
//! Owns the OAuth2 token lifecycle for one API client: password and
//! refresh-token grants against `/o/token/`, revocation against
//! `/o/revoke_token/`, and the `TokenStore` that serializes them.
//!
//! Token flow:
//! 1. `TokenStore::get_token(false)` finds no access token
//! 2. If a refresh token is known, `token::refresh_grant()` is tried first
//! 3. On rejection, `token::password_grant()` runs when a username exists
//! 4. The returned pair replaces the stored one under the store's mutex
//! 5. `TokenStore::logout()` revokes the refresh token and clears the pair

pub mod constants;
pub mod credentials;
pub mod error;
pub mod store;
pub mod token;

pub use constants::*;
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use store::{TokenPair, TokenStore};
pub use token::{GrantOutcome, TokenResponse, password_grant, refresh_grant, revoke};
