//! The listener state machine
//!
//! ```text
//! Idle -> Connecting -> Listening
//!            ^   |          |
//!            |   v          | read error
//!        Reconnecting <-----+
//!
//! any state --(shutdown observed)--> Stopped
//! ```
//!
//! Each call to [`ListenerLoop::step`] performs at most one blocking
//! operation (open, read, forward + ack, or backoff), and the shutdown token
//! is checked before every step. A coin line is forwarded at most once and
//! acknowledged only when the forward succeeded.

use std::time::{Duration, Instant};

use coin_protocol::{DeviceMessage, ACK};
use deposit_client::{CoinEvent, CoinForwarder, ForwardOutcome};
use serial_link::{PortOpener, ReadOutcome, SerialConnectionManager, SerialError};

use crate::session::{DeviceHealth, SessionStats, DEFAULT_HEARTBEAT_TIMEOUT};
use crate::shutdown::ShutdownToken;

/// Listener lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    Connecting,
    Listening,
    Reconnecting,
    Stopped,
}

/// Reads device lines, forwards coins and acknowledges them
pub struct ListenerLoop<O: PortOpener, F: CoinForwarder> {
    link: SerialConnectionManager<O>,
    forwarder: F,
    machine_id: String,
    shutdown: ShutdownToken,
    health: DeviceHealth,
    stats: SessionStats,
    state: ListenerState,
    pending_error: Option<SerialError>,
}

impl<O: PortOpener, F: CoinForwarder> ListenerLoop<O, F> {
    pub fn new(
        link: SerialConnectionManager<O>,
        forwarder: F,
        machine_id: impl Into<String>,
        shutdown: ShutdownToken,
    ) -> Self {
        Self {
            link,
            forwarder,
            machine_id: machine_id.into(),
            shutdown,
            health: DeviceHealth::new(DEFAULT_HEARTBEAT_TIMEOUT, Instant::now()),
            stats: SessionStats::default(),
            state: ListenerState::Idle,
            pending_error: None,
        }
    }

    /// Override how long the device may stay silent before a warning is logged
    pub fn with_heartbeat_timeout(mut self, heartbeat_timeout: Duration) -> Self {
        self.health = DeviceHealth::new(heartbeat_timeout, Instant::now());
        self
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Run until shutdown is observed
    pub fn run(&mut self) -> SessionStats {
        tracing::info!(
            "Starting coin listener on {} at {} baud (machine {})",
            self.link.port_name(),
            self.link.baud_rate(),
            self.machine_id
        );

        while self.state != ListenerState::Stopped {
            self.step();
        }

        self.stats.clone()
    }

    /// Advance the state machine by one transition
    pub fn step(&mut self) -> ListenerState {
        let next = if self.shutdown.is_cancelled() {
            ListenerState::Stopped
        } else {
            match self.state {
                ListenerState::Idle => ListenerState::Connecting,
                ListenerState::Connecting => self.connect(),
                ListenerState::Listening => self.listen(),
                ListenerState::Reconnecting => self.back_off(),
                ListenerState::Stopped => ListenerState::Stopped,
            }
        };

        self.transition(next);
        next
    }

    fn transition(&mut self, next: ListenerState) {
        if next == self.state {
            return;
        }

        tracing::debug!("Listener state {:?} -> {:?}", self.state, next);

        if next == ListenerState::Stopped {
            self.link.close();
            tracing::info!("Listener stopped");
        }

        self.state = next;
    }

    fn connect(&mut self) -> ListenerState {
        match self.link.open() {
            Ok(()) => {
                self.stats.connections_opened += 1;
                self.health.reset(Instant::now());
                tracing::info!("Connected! Listening for coins...");
                ListenerState::Listening
            }
            Err(e) => self.fail(e),
        }
    }

    fn back_off(&mut self) -> ListenerState {
        if let Some(error) = self.pending_error.take() {
            self.link.recover(&error, &self.shutdown);
        }

        if self.shutdown.is_cancelled() {
            ListenerState::Stopped
        } else {
            ListenerState::Connecting
        }
    }

    fn fail(&mut self, error: SerialError) -> ListenerState {
        self.stats.serial_errors += 1;
        self.pending_error = Some(error);
        ListenerState::Reconnecting
    }

    fn listen(&mut self) -> ListenerState {
        match self.link.read_line() {
            Ok(ReadOutcome::Line(line)) => {
                self.handle_line(&line);
                ListenerState::Listening
            }
            Ok(ReadOutcome::Timeout) => {
                self.check_health();
                ListenerState::Listening
            }
            Err(e) => {
                self.link.close();
                self.fail(e)
            }
        }
    }

    fn check_health(&mut self) {
        let now = Instant::now();
        if self.health.check(now) {
            tracing::warn!(
                "No data from coin acceptor for {}s - no recent heartbeat",
                self.health.silence(now).as_secs()
            );
        }
    }

    /// Blank lines are ignored entirely and do not count as device activity.
    fn handle_line(&mut self, line: &str) {
        let Some(parsed) = DeviceMessage::parse(line) else {
            return;
        };

        self.stats.lines_received += 1;
        if self.health.record_activity(Instant::now()) {
            tracing::info!("Coin acceptor is responding again");
        }

        let message = match parsed {
            Ok(message) => message,
            Err(e) => {
                self.stats.parse_errors += 1;
                tracing::warn!("Discarding line {:?}: {}", line, e);
                return;
            }
        };

        match message {
            DeviceMessage::Coin { amount } => self.deposit(amount),
            DeviceMessage::Heartbeat => {
                self.stats.heartbeats += 1;
                tracing::trace!("Heartbeat");
            }
            DeviceMessage::Status(status) => tracing::info!("Coin acceptor status: {}", status),
            DeviceMessage::DeviceError(error) => {
                tracing::warn!("Coin acceptor reported an error: {}", error)
            }
            DeviceMessage::Unknown(text) => tracing::info!("ESP32: {}", text),
        }
    }

    fn deposit(&mut self, amount: f64) {
        if self.shutdown.is_cancelled() {
            tracing::warn!("Shutdown requested, not forwarding coin {:.2}", amount);
            return;
        }

        let event = CoinEvent::new(amount, self.machine_id.clone());
        match self.forwarder.forward(&event) {
            ForwardOutcome::Success => {
                self.stats.coins_forwarded += 1;
                tracing::info!("Coin {:.2} deposited", amount);

                if let Err(e) = self.link.write_line(ACK) {
                    self.stats.ack_failures += 1;
                    tracing::warn!("Failed to acknowledge coin {:.2}: {}", amount, e);
                }
            }
            outcome => {
                self.stats.forward_failures += 1;
                tracing::error!("Failed to deposit coin {:.2}: {}", amount, outcome);
            }
        }
    }
}
