//! HTTP client for the kiosk coin-deposit endpoint
//!
//! Each coin event is delivered with a single blocking `POST` to
//! `<endpoint>/kiosk/coin-deposit`. The client never retries: the outcome of
//! the one attempt is reported back to the caller, which decides whether to
//! acknowledge the coin to the device.

mod error;

pub use error::DepositError;

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Path appended to the endpoint base URL
pub const DEPOSIT_PATH: &str = "/kiosk/coin-deposit";

/// Request timeout for a single deposit attempt
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A coin insertion ready to be reported
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinEvent {
    pub amount: f64,
    pub machine_id: String,
}

impl CoinEvent {
    pub fn new(amount: f64, machine_id: impl Into<String>) -> Self {
        Self {
            amount,
            machine_id: machine_id.into(),
        }
    }
}

/// Result of a single forward attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardOutcome {
    /// The endpoint answered HTTP 200
    Success,
    /// The endpoint answered with any other status code
    ServerError(u16),
    /// The request never produced a response (timeout, refused, DNS...)
    NetworkError(String),
}

impl ForwardOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ForwardOutcome::Success)
    }
}

impl fmt::Display for ForwardOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardOutcome::Success => write!(f, "success"),
            ForwardOutcome::ServerError(code) => write!(f, "server error: HTTP {}", code),
            ForwardOutcome::NetworkError(msg) => write!(f, "network error: {}", msg),
        }
    }
}

/// Delivers coin events somewhere and reports how it went
pub trait CoinForwarder {
    fn forward(&self, event: &CoinEvent) -> ForwardOutcome;
}

/// Blocking JSON client for the coin-deposit endpoint
#[derive(Debug, Clone)]
pub struct DepositClient {
    agent: ureq::Agent,
    deposit_url: String,
}

impl DepositClient {
    /// Create a client for the given endpoint base URL, e.g. `http://localhost`
    pub fn new(endpoint: &str) -> Result<Self, DepositError> {
        Self::with_timeout(endpoint, REQUEST_TIMEOUT)
    }

    /// Create a client with a custom request timeout
    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self, DepositError> {
        let parsed = url::Url::parse(endpoint).map_err(|e| DepositError::InvalidEndpoint {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        match parsed.scheme() {
            "http" | "https" => {}
            other => return Err(DepositError::UnsupportedScheme(other.to_string())),
        }

        Ok(Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            deposit_url: format!("{}{}", endpoint.trim_end_matches('/'), DEPOSIT_PATH),
        })
    }

    /// Full URL deposits are posted to
    pub fn deposit_url(&self) -> &str {
        &self.deposit_url
    }
}

impl CoinForwarder for DepositClient {
    fn forward(&self, event: &CoinEvent) -> ForwardOutcome {
        tracing::debug!(
            "POST {} amount={} machine_id={}",
            self.deposit_url,
            event.amount,
            event.machine_id
        );

        let result = self
            .agent
            .post(&self.deposit_url)
            .set("Content-Type", "application/json")
            .send_json(event);

        match result {
            Ok(response) if response.status() == 200 => ForwardOutcome::Success,
            Ok(response) => ForwardOutcome::ServerError(response.status()),
            Err(ureq::Error::Status(code, _)) => ForwardOutcome::ServerError(code),
            Err(ureq::Error::Transport(transport)) => {
                ForwardOutcome::NetworkError(transport.to_string())
            }
        }
    }
}
