//! Serial connection manager
//!
//! Owns at most one open [`Connection`] and implements the failure policy of
//! the link: on any open or read error the handle is closed, the condition is
//! logged, and the caller is made to wait one fixed backoff interval before it
//! may try again. Errors are never classified; all of them are retryable.

use std::time::Duration;

use crate::connection::{Connection, ReadOutcome};
use crate::error::{Result, SerialError};
use crate::port::{PortOpener, SystemPortOpener};

/// Fixed baud rate of the coin acceptor
pub const BAUD_RATE: u32 = 115_200;

/// Upper bound on a single blocking read
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Delay before reopening after a failure
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// State of the physical link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Something that can wait out a backoff interval
///
/// Implementations may return early, e.g. when shutdown was requested.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Plain `std::thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Owns the serial link to the device
pub struct SerialConnectionManager<O: PortOpener = SystemPortOpener> {
    opener: O,
    port_name: String,
    baud_rate: u32,
    backoff: Duration,
    state: ConnectionState,
    connection: Option<Connection>,
}

impl SerialConnectionManager<SystemPortOpener> {
    /// Manager for a real serial device at the fixed baud rate
    pub fn new(port_name: impl Into<String>) -> Self {
        Self::with_opener(SystemPortOpener, port_name)
    }
}

impl<O: PortOpener> SerialConnectionManager<O> {
    pub fn with_opener(opener: O, port_name: impl Into<String>) -> Self {
        Self {
            opener,
            port_name: port_name.into(),
            baud_rate: BAUD_RATE,
            backoff: RECONNECT_BACKOFF,
            state: ConnectionState::Disconnected,
            connection: None,
        }
    }

    /// Override the reconnect backoff
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Open the device, closing any connection that is still open first
    pub fn open(&mut self) -> Result<()> {
        self.close();
        self.state = ConnectionState::Connecting;

        tracing::info!(
            "Connecting to coin acceptor on {} at {} baud...",
            self.port_name,
            self.baud_rate
        );

        match self
            .opener
            .open(&self.port_name, self.baud_rate, READ_TIMEOUT)
        {
            Ok(port) => {
                self.connection = Some(Connection::new(self.port_name.clone(), port));
                self.state = ConnectionState::Connected;
                tracing::info!("Connected to {}", self.port_name);
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                Err(e)
            }
        }
    }

    /// Read one line, bounded by the read timeout
    pub fn read_line(&mut self) -> Result<ReadOutcome> {
        self.connection
            .as_mut()
            .ok_or(SerialError::NotConnected)?
            .read_line()
    }

    /// Write one newline-terminated line to the device
    pub fn write_line(&mut self, text: &str) -> Result<()> {
        self.connection
            .as_mut()
            .ok_or(SerialError::NotConnected)?
            .write_line(text)
    }

    /// Close the open connection, if any
    pub fn close(&mut self) {
        if let Some(conn) = self.connection.take() {
            tracing::debug!("Closing serial connection on {}", conn.port_name());
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Handle an open or read failure
    ///
    /// Closes whatever is open, logs the error and waits one backoff
    /// interval through `sleeper`. The caller may reopen once this returns.
    pub fn recover<S: Sleeper + ?Sized>(&mut self, error: &SerialError, sleeper: &S) {
        self.close();

        tracing::warn!(
            "Serial error: {}. Reconnecting in {}s...",
            error,
            self.backoff.as_secs_f32()
        );

        sleeper.sleep(self.backoff);
    }
}

impl<O: PortOpener> Drop for SerialConnectionManager<O> {
    fn drop(&mut self) {
        self.close();
    }
}
