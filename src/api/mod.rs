//! Telemetry REST api, used for the baseline the live data is merged over

mod client;
mod error;

pub use client::Client;
pub use error::Error;

/// Result type for api module
pub type Result<T> = std::result::Result<T, Error>;
