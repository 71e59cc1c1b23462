//! Error types for the serial link

use thiserror::Error;

/// Errors that can occur on the serial link
///
/// Every variant is treated as retryable by the connection manager.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SerialError {
    /// The device could not be opened
    #[error("Failed to open serial port {port}: {reason}")]
    Open { port: String, reason: String },

    /// Reading from an open device failed
    #[error("Serial read failed: {0}")]
    Read(String),

    /// Writing to an open device failed
    #[error("Serial write failed: {0}")]
    Write(String),

    /// The device stopped producing data (end of stream)
    #[error("Serial device disconnected")]
    Disconnected,

    /// An operation was attempted with no open connection
    #[error("No serial connection is open")]
    NotConnected,
}

/// Result type for serial link operations
pub type Result<T> = std::result::Result<T, SerialError>;
