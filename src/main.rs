//! # Tracker Agent
//!
//! GPS and battery telemetry agent for a vehicle tracker.
//!
//! Reads the GPS receiver and power inputs and uploads status and location
//! reports to the tracking server with a device bearer token.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use tracker_agent::agent::{Agent, Collaborators};
use tracker_agent::config::{Config, LoggingConfig};
use tracker_agent::http::UreqTransport;
use tracker_agent::network::HostLink;
use tracker_agent::power::{SysfsAnalogInput, SysfsDigitalInput};
use tracker_agent::serial::open_gps_port;
use tracker_agent::storage::FileStore;

/// Configuration file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name prefix of the daily log files
const LOG_FILE_NAME: &str = "tracker-agent.log";

/// Set up console logging and, when configured, a daily rolling log file
///
/// The returned guard flushes the file writer on drop and must live until exit.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let (file_layer, guard) = if config.dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.dir, LOG_FILE_NAME);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (
            Some(fmt::layer().with_writer(writer).with_ansi(false)),
            Some(guard),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Main entry point for the tracker agent
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, default `config/default.toml`)
///    - Set up logging
///    - Open the GPS UART, token store and HTTP transport
///
/// 2. **Boot**
///    - Join WiFi, then confirm or obtain a device token
///
/// 3. **Main Loop**
///    - Tick the scheduler every `telemetry.tick_ms`
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if:
/// - The configuration cannot be loaded
/// - No GPS serial port can be opened
/// - The token store directory cannot be created
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let _log_guard = init_logging(&config.logging);

    info!("Tracker Agent v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "Device {} reporting to {}",
        config.device.device_id, config.server.base_url
    );

    let (gps_port, gps_path) = open_gps_port(&config.gps.port, config.gps.baud_rate)?;
    info!("GPS serial port opened at: {}", gps_path);

    let store = FileStore::open(&config.storage.dir, config.storage.read_only)
        .context("Failed to open token storage")?;
    info!("Token store at: {}", store.dir().display());

    let transport = UreqTransport::new(
        &config.server.base_url,
        Duration::from_millis(config.server.timeout_ms),
    );

    let parts = Collaborators {
        link: Box::new(HostLink::new(
            &config.server.base_url,
            &config.network.interface,
        )),
        transport: Arc::new(transport),
        store: Box::new(store),
        gps: Box::new(gps_port),
        adc: Box::new(SysfsAnalogInput::new(&config.power.adc_path)),
        power_pin: Box::new(SysfsDigitalInput::new(
            &config.power.power_pin_path,
            config.power.power_active_low,
        )),
    };

    let mut agent = Agent::new(&config, parts);
    agent.boot().await;

    let mut ticker = interval(Duration::from_millis(config.telemetry.tick_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Entering main loop ({}ms tick)", config.telemetry.tick_ms);
    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            now = ticker.tick() => {
                agent.tick(now).await;
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    agent.shutdown();
    Ok(())
}
