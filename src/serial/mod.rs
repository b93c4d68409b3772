//! # Serial Communication Module
//!
//! Handles the UART link to the GPS receiver.
//!
//! This module handles:
//! - Opening the GPS serial port (8N1, configurable baud rate)
//! - Falling back to common USB GPS device paths
//! - Exposing the port as a non-blocking [`SerialSource`]

pub mod port_trait;

pub use port_trait::{SerialSource, TokioSerialPort};

use crate::error::{Result, TrackerError};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Fallback GPS device paths tried after the configured one
const FALLBACK_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial GPS pucks
    "/dev/ttyACM0", // u-blox USB CDC
];

/// Open the GPS receiver's serial port
///
/// Tries `configured` first, then the fallback paths.
///
/// # Errors
///
/// Returns `SerialPortNotFound` if none of the paths can be opened
///
/// # Examples
///
/// ```no_run
/// use tracker_agent::serial::open_gps_port;
///
/// # async fn run() -> anyhow::Result<()> {
/// let (port, path) = open_gps_port("/dev/ttyS0", 9600)?;
/// println!("GPS on {}", path);
/// # Ok(())
/// # }
/// ```
pub fn open_gps_port(configured: &str, baud_rate: u32) -> Result<(TokioSerialPort, String)> {
    let mut paths = vec![configured];
    paths.extend(FALLBACK_DEVICE_PATHS.iter().copied().filter(|p| *p != configured));
    open_with_paths(&paths, baud_rate)
}

/// Open the first serial device that succeeds from `paths`
///
/// # Arguments
///
/// * `paths` - Device paths to try (e.g., &["/dev/ttyS0"])
/// * `baud_rate` - GPS receiver baud rate
pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<(TokioSerialPort, String)> {
    for path in paths {
        debug!("Trying to open GPS serial port: {}", path);

        match open_port(path, baud_rate) {
            Ok(port) => {
                info!("Opened GPS receiver at {} ({} baud)", path, baud_rate);
                return Ok((TokioSerialPort::new(port), path.to_string()));
            }
            Err(e) => {
                warn!("Failed to open {}: {}", path, e);
                continue;
            }
        }
    }

    Err(TrackerError::SerialPortNotFound(paths.join(", ")))
}

/// Open a specific serial port with 8N1 settings
fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
    tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| TrackerError::Serial(format!("Failed to open {}: {}", path, e)))
}
