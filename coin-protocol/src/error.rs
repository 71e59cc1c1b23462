//! Error types for line protocol parsing

use thiserror::Error;

/// Errors that can occur while classifying a device line
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The text after `COIN:` is not a finite decimal number
    #[error("Invalid coin amount: {0:?}")]
    InvalidAmount(String),
}

/// Result type alias for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;
