//! Command line and environment configuration
//!
//! Every setting can come from a command line flag or an environment
//! variable; the flag wins, then the variable, then the built-in default.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::session::DEFAULT_HEARTBEAT_TIMEOUT;

pub const ENV_SERIAL_PORT: &str = "ESP32_SERIAL_PORT";
pub const ENV_MACHINE_ID: &str = "ESP32_ID";
pub const ENV_ENDPOINT: &str = "LARAVEL_URL";
pub const ENV_HEARTBEAT_TIMEOUT: &str = "ESP32_HEARTBEAT_TIMEOUT";
pub const ENV_LOG_LEVEL: &str = "COIN_RELAY_LOG_LEVEL";

pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_MACHINE_ID: &str = "ESP32_COIN_001";
pub const DEFAULT_ENDPOINT: &str = "http://localhost";
pub const DEFAULT_LOG_LEVEL: &str = "info";

const ENV_HELP: &str = "\
Environment variables (overridden by the matching flag):
  ESP32_SERIAL_PORT         Serial port (default: /dev/ttyUSB0)
  ESP32_ID                  Machine identifier (default: ESP32_COIN_001)
  LARAVEL_URL               Endpoint base URL (default: http://localhost)
  ESP32_HEARTBEAT_TIMEOUT   Heartbeat timeout in seconds (default: 30)
  COIN_RELAY_LOG_LEVEL      Log level (default: info; RUST_LOG takes precedence)";

/// ESP32 Coin Listener
///
/// Reads coin insertions from the ESP32 coin acceptor over serial and posts
/// them to the kiosk /kiosk/coin-deposit endpoint.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "coin-listener")]
#[command(about = "Relay ESP32 coin acceptor events to the kiosk payment endpoint")]
#[command(version)]
#[command(after_help = ENV_HELP)]
pub struct Args {
    /// Serial port the coin acceptor is attached to
    #[arg(short, long)]
    pub port: Option<String>,

    /// Machine identifier included in every deposit
    #[arg(short, long)]
    pub machine_id: Option<String>,

    /// Base URL of the payment endpoint
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Seconds of device silence before a missing-heartbeat warning
    #[arg(long)]
    pub heartbeat_timeout: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Effective configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: String,
    pub machine_id: String,
    pub endpoint: String,
    pub heartbeat_timeout: Duration,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERIAL_PORT.to_string(),
            machine_id: DEFAULT_MACHINE_ID.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    /// Parse the process command line and environment
    pub fn from_env() -> Result<Self> {
        Self::resolve(Args::parse(), |key| std::env::var(key).ok())
    }

    /// Combine parsed flags with variables obtained from `env`
    pub fn resolve<E>(args: Args, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let heartbeat_timeout = match args.heartbeat_timeout {
            Some(secs) => Duration::from_secs(secs),
            None => match env(ENV_HEARTBEAT_TIMEOUT) {
                Some(raw) => Duration::from_secs(raw.trim().parse::<u64>().with_context(|| {
                    format!("Invalid {} environment variable: {:?}", ENV_HEARTBEAT_TIMEOUT, raw)
                })?),
                None => defaults.heartbeat_timeout,
            },
        };

        let config = Config {
            port: args
                .port
                .or_else(|| env(ENV_SERIAL_PORT))
                .unwrap_or(defaults.port),
            machine_id: args
                .machine_id
                .or_else(|| env(ENV_MACHINE_ID))
                .unwrap_or(defaults.machine_id),
            endpoint: args
                .endpoint
                .or_else(|| env(ENV_ENDPOINT))
                .unwrap_or(defaults.endpoint),
            heartbeat_timeout,
            log_level: args
                .log_level
                .or_else(|| env(ENV_LOG_LEVEL))
                .unwrap_or(defaults.log_level)
                .to_lowercase(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the listener cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(anyhow::anyhow!("Serial port must not be empty"));
        }

        if self.machine_id.trim().is_empty() {
            return Err(anyhow::anyhow!("Machine identifier must not be empty"));
        }

        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(anyhow::anyhow!(
                "Endpoint '{}' must start with http:// or https://",
                self.endpoint
            ));
        }

        if self.heartbeat_timeout.is_zero() {
            return Err(anyhow::anyhow!("Heartbeat timeout must be positive"));
        }

        match self.log_level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => {
                return Err(anyhow::anyhow!(
                    "Invalid log level '{}'. Valid levels: error, warn, info, debug, trace",
                    self.log_level
                ));
            }
        }

        Ok(())
    }

    /// Log the effective settings
    pub fn print_summary(&self) {
        info!("Configuration:");
        info!("  Serial port: {} @ {} baud", self.port, serial_link::BAUD_RATE);
        info!("  Machine ID: {}", self.machine_id);
        info!("  Endpoint: {}{}", self.endpoint, deposit_client::DEPOSIT_PATH);
        info!("  Heartbeat timeout: {}s", self.heartbeat_timeout.as_secs());
        info!("  Log level: {}", self.log_level);
    }
}
