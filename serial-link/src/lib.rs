//! Serial link to the ESP32 coin acceptor
//!
//! This crate owns the physical connection: opening the device at a fixed
//! baud rate, reading newline-delimited lines with a bounded wait, writing
//! acknowledgments back, and the reopen-after-backoff failure policy.
//!
//! ```no_run
//! use serial_link::{ReadOutcome, SerialConnectionManager, ThreadSleeper};
//!
//! let mut link = SerialConnectionManager::new("/dev/ttyUSB0");
//! while let Err(e) = link.open() {
//!     link.recover(&e, &ThreadSleeper);
//! }
//!
//! match link.read_line() {
//!     Ok(ReadOutcome::Line(line)) => println!("{}", line),
//!     Ok(ReadOutcome::Timeout) => {}
//!     Err(e) => link.recover(&e, &ThreadSleeper),
//! }
//! ```

mod connection;
mod error;
mod manager;
mod port;

pub use connection::{Connection, ReadOutcome, MAX_LINE_LEN};
pub use error::{Result, SerialError};
pub use manager::{
    ConnectionState, SerialConnectionManager, Sleeper, ThreadSleeper, BAUD_RATE, READ_TIMEOUT,
    RECONNECT_BACKOFF,
};
pub use port::{LinePort, PortOpener, SystemPortOpener};
