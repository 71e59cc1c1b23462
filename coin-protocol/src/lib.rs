//! # coin-protocol
//!
//! Parser for the line-oriented serial protocol spoken by the ESP32 coin
//! acceptor.
//!
//! ## Wire format
//!
//! Device to host, one message per newline-terminated line:
//! - `COIN:<decimal>` - a coin was inserted
//! - `HEARTBEAT` - liveness signal
//! - `STATUS:<text>` - status report
//! - `ERROR:<text>` - device-side error report
//! - anything else - free-form diagnostic text
//!
//! Host to device: `ACK` after a coin event was delivered.
//!
//! ## Usage
//!
//! ```rust
//! use coin_protocol::{DeviceMessage, ParseError};
//!
//! match DeviceMessage::parse("COIN:10") {
//!     Some(Ok(DeviceMessage::Coin { amount })) => assert_eq!(amount, 10.0),
//!     other => panic!("unexpected: {:?}", other),
//! }
//!
//! assert!(matches!(
//!     DeviceMessage::parse("COIN:abc"),
//!     Some(Err(ParseError::InvalidAmount(_)))
//! ));
//! ```

pub mod error;
pub mod message;

pub use error::{ParseError, ParseResult};
pub use message::{DeviceMessage, ACK, COIN_PREFIX, ERROR_PREFIX, HEARTBEAT, STATUS_PREFIX};
