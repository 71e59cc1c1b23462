//! Device liveness and per-session counters

use std::time::{Duration, Instant};

/// Default silence period after which the device is considered unhealthy
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(30);

/// Tracks when the device last said anything
///
/// Health is informational only: an unhealthy device is reported in the log
/// but never forces a reconnect.
#[derive(Debug, Clone)]
pub struct DeviceHealth {
    heartbeat_timeout: Duration,
    last_seen: Instant,
    silent: bool,
}

impl DeviceHealth {
    pub fn new(heartbeat_timeout: Duration, now: Instant) -> Self {
        Self {
            heartbeat_timeout,
            last_seen: now,
            silent: false,
        }
    }

    /// Restart the silence clock, e.g. right after connecting
    pub fn reset(&mut self, now: Instant) {
        self.last_seen = now;
        self.silent = false;
    }

    /// Record a line from the device
    ///
    /// Returns `true` if the device had been reported silent and is now back.
    pub fn record_activity(&mut self, now: Instant) -> bool {
        self.last_seen = now;
        std::mem::replace(&mut self.silent, false)
    }

    /// Returns `true` exactly once per silent period, when it begins
    pub fn check(&mut self, now: Instant) -> bool {
        if self.silent || !self.is_overdue(now) {
            return false;
        }
        self.silent = true;
        true
    }

    pub fn is_healthy(&self, now: Instant) -> bool {
        !self.is_overdue(now)
    }

    pub fn silence(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen)
    }

    fn is_overdue(&self, now: Instant) -> bool {
        self.silence(now) > self.heartbeat_timeout
    }
}

/// Counters for one run of the listener
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub lines_received: u64,
    pub heartbeats: u64,
    pub coins_forwarded: u64,
    pub forward_failures: u64,
    pub parse_errors: u64,
    pub ack_failures: u64,
    pub connections_opened: u64,
    pub serial_errors: u64,
}

impl SessionStats {
    pub fn log_summary(&self) {
        tracing::info!(
            "Session summary: {} line(s) received, {} heartbeat(s), {} coin(s) deposited, \
             {} failed deposit(s), {} malformed coin line(s), {} ACK write failure(s), \
             {} connection(s), {} serial error(s)",
            self.lines_received,
            self.heartbeats,
            self.coins_forwarded,
            self.forward_failures,
            self.parse_errors,
            self.ack_failures,
            self.connections_opened,
            self.serial_errors
        );
    }
}
