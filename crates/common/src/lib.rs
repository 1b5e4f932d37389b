//! Types shared by the Bleemeo client crates

mod error;
mod response;
mod secret;

pub use error::{Error, Result};
pub use response::ApiResponse;
pub use secret::Secret;
