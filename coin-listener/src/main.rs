use anyhow::{Context, Result};
use tracing::{error, info};

use coin_listener::{Config, ListenerLoop, ShutdownController};
use deposit_client::DepositClient;
use serial_link::SerialConnectionManager;

/// Initialize tracing; `RUST_LOG` wins over the configured level
fn init_tracing(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();
}

fn run(config: Config) -> Result<()> {
    let shutdown =
        ShutdownController::install().context("Failed to install termination signal handler")?;

    let forwarder = DepositClient::new(&config.endpoint).context("Invalid endpoint URL")?;
    let link = SerialConnectionManager::new(config.port.as_str());

    let mut listener = ListenerLoop::new(link, forwarder, config.machine_id, shutdown.token())
        .with_heartbeat_timeout(config.heartbeat_timeout);

    let stats = listener.run();
    stats.log_summary();

    Ok(())
}

fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to parse configuration")?;

    init_tracing(&config.log_level);
    config.print_summary();

    if let Err(e) = run(config) {
        error!("Coin listener failed: {:#}", e);
        std::process::exit(1);
    }

    info!("Stopped.");
    Ok(())
}
