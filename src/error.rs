//! # Error Types
//!
//! Custom error types for the tracker agent using `thiserror`.
//!
//! None of these are fatal once the agent is running: the main loop logs
//! them and carries on with the next cycle.

use thiserror::Error;

/// Main error type for the tracker agent
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Network join exceeded its attempt budget
    #[error("Connectivity failure: {0}")]
    Connectivity(String),

    /// Token handshake rejected and regeneration failed
    #[error("Authentication failure: {0}")]
    Auth(String),

    /// Malformed JSON or NMEA input
    #[error("Parse failure: {0}")]
    Parse(String),

    /// Non-2xx or negative response code from an HTTP call
    #[error("Transport failure (code {code}): {message}")]
    Transport { code: i32, message: String },

    /// Serial port I/O errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("Serial port not found (tried: {0})")]
    SerialPortNotFound(String),

    /// Persistent key-value storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// ADC or GPIO read errors
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// JSON encode/decode errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the tracker agent
pub type Result<T> = std::result::Result<T, TrackerError>;
