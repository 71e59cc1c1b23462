//! Error types for the deposit client

use thiserror::Error;

/// Errors raised while configuring a deposit client
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DepositError {
    /// The endpoint base URL could not be parsed
    #[error("Invalid endpoint URL {url:?}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// The endpoint uses a scheme other than http/https
    #[error("Unsupported endpoint scheme {0:?}, expected http or https")]
    UnsupportedScheme(String),
}
