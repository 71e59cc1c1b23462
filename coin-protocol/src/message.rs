//! Device message classification
//!
//! Every line read from the coin acceptor is classified into exactly one
//! [`DeviceMessage`]. Classification is ordered: the coin prefix wins over
//! everything else, then the exact heartbeat keyword, then the diagnostic
//! prefixes, and finally any other non-empty text.

use crate::error::{ParseError, ParseResult};

/// Prefix of a coin insertion line, e.g. `COIN:5.00`
pub const COIN_PREFIX: &str = "COIN:";

/// Exact liveness line emitted periodically by the device
pub const HEARTBEAT: &str = "HEARTBEAT";

/// Prefix of a device status report, e.g. `STATUS:READY`
pub const STATUS_PREFIX: &str = "STATUS:";

/// Prefix of a device-side error report, e.g. `ERROR:coin jam`
pub const ERROR_PREFIX: &str = "ERROR:";

/// Acknowledgment written back to the device after a successful forward
pub const ACK: &str = "ACK";

/// A classified line received from the coin acceptor
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceMessage {
    /// A coin was inserted
    Coin { amount: f64 },
    /// The device is alive; carries no data
    Heartbeat,
    /// Device status report (`STATUS:<text>`)
    Status(String),
    /// Device-side error report (`ERROR:<text>`)
    DeviceError(String),
    /// Any other non-empty line, kept for diagnostic logging
    Unknown(String),
}

impl DeviceMessage {
    /// Classify a raw line.
    ///
    /// Returns `None` for a line that is empty after trimming. A `COIN:` line
    /// whose remainder is not a finite number yields [`ParseError::InvalidAmount`].
    ///
    /// # Examples
    ///
    /// ```
    /// use coin_protocol::DeviceMessage;
    ///
    /// let msg = DeviceMessage::parse("COIN:5.00\r\n").unwrap().unwrap();
    /// assert_eq!(msg, DeviceMessage::Coin { amount: 5.0 });
    ///
    /// assert!(DeviceMessage::parse("   ").is_none());
    /// ```
    pub fn parse(raw: &str) -> Option<ParseResult<Self>> {
        let line = raw.trim();
        if line.is_empty() {
            return None;
        }

        if line.starts_with(COIN_PREFIX) {
            return Some(parse_coin(line));
        }

        if line == HEARTBEAT {
            return Some(Ok(DeviceMessage::Heartbeat));
        }

        if let Some(status) = non_empty_payload(line, STATUS_PREFIX) {
            return Some(Ok(DeviceMessage::Status(status.to_string())));
        }

        if let Some(error) = non_empty_payload(line, ERROR_PREFIX) {
            return Some(Ok(DeviceMessage::DeviceError(error.to_string())));
        }

        Some(Ok(DeviceMessage::Unknown(line.to_string())))
    }
}

fn parse_coin(line: &str) -> ParseResult<DeviceMessage> {
    // Split once: everything after the first ':' is the amount.
    let remainder = line
        .split_once(':')
        .map(|(_, rest)| rest.trim())
        .unwrap_or_default();

    match remainder.parse::<f64>() {
        Ok(amount) if amount.is_finite() => Ok(DeviceMessage::Coin { amount }),
        _ => Err(ParseError::InvalidAmount(remainder.to_string())),
    }
}

fn non_empty_payload<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.strip_prefix(prefix)
        .map(str::trim)
        .filter(|payload| !payload.is_empty())
}
