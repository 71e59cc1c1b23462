//! # Coin Listener
//!
//! Relays coin insertions from an ESP32 coin acceptor to the kiosk payment
//! endpoint.
//!
//! ## Data flow
//!
//! ```text
//! serial bytes -> coin_protocol::DeviceMessage -> (coins only) deposit_client
//!              -> HTTP 200 -> "ACK\n" written back to the device
//! ```
//!
//! The process is single threaded. Every blocking operation is bounded (1s
//! serial reads, 10s HTTP requests, 5s interruptible backoff), so a
//! termination signal is observed at the next loop boundary.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use coin_listener::{ListenerLoop, ShutdownController};
//! use deposit_client::DepositClient;
//! use serial_link::SerialConnectionManager;
//!
//! let shutdown = ShutdownController::install()?;
//! let forwarder = DepositClient::new("http://localhost")?;
//! let link = SerialConnectionManager::new("/dev/ttyUSB0");
//!
//! let stats = ListenerLoop::new(link, forwarder, "ESP32_COIN_001", shutdown.token()).run();
//! stats.log_summary();
//! ```

pub mod config;
pub mod listener;
pub mod session;
pub mod shutdown;

pub use config::{Args, Config};
pub use listener::{ListenerLoop, ListenerState};
pub use session::{DeviceHealth, SessionStats, DEFAULT_HEARTBEAT_TIMEOUT};
pub use shutdown::{ShutdownController, ShutdownToken};
