//! Port abstraction
//!
//! The connection only needs a byte stream with a bounded read. Real devices
//! are opened through the `serialport` crate; anything else implementing
//! `Read + Write` (a test double, a pty) can stand in for it.

use std::io::{Read, Write};
use std::time::Duration;

use crate::error::{Result, SerialError};

/// A bidirectional byte stream whose reads are bounded by a timeout
///
/// A read that waits longer than the configured timeout must fail with
/// [`std::io::ErrorKind::TimedOut`] (or `WouldBlock`) instead of blocking.
pub trait LinePort: Read + Write + Send {}

impl<T: Read + Write + Send> LinePort for T {}

/// Opens ports by path
pub trait PortOpener {
    fn open(&self, path: &str, baud_rate: u32, read_timeout: Duration)
        -> Result<Box<dyn LinePort>>;
}

/// Opens real serial devices via the `serialport` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPortOpener;

impl PortOpener for SystemPortOpener {
    fn open(
        &self,
        path: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn LinePort>> {
        let port = serialport::new(path, baud_rate)
            .timeout(read_timeout)
            .open()
            .map_err(|e| SerialError::Open {
                port: path.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Box::new(port))
    }
}
