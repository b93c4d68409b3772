//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Result, TrackerError};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub network: NetworkConfig,
    pub server: ServerConfig,
    pub device: DeviceConfig,
    #[serde(default)]
    pub account: Option<AccountConfig>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub gps: GpsConfig,
    #[serde(default)]
    pub power: PowerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// WiFi join configuration
#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    pub ssid: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_interface")]
    pub interface: String,

    #[serde(default = "default_join_attempts")]
    pub join_attempts: u32,

    #[serde(default = "default_join_poll_ms")]
    pub join_poll_ms: u64,
}

/// API server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub base_url: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Build-time device identity
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    pub device_id: String,

    #[serde(default)]
    pub user_id: String,
}

/// Optional account credentials for the login endpoint
#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    pub email: String,
    pub password: String,
}

/// Token storage configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub dir: String,

    #[serde(default)]
    pub read_only: bool,
}

/// GPS receiver configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GpsConfig {
    #[serde(default = "default_gps_port")]
    pub port: String,

    #[serde(default = "default_gps_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_gps_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Battery ADC and car power input configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PowerConfig {
    #[serde(default = "default_adc_path")]
    pub adc_path: String,

    #[serde(default = "default_power_pin_path")]
    pub power_pin_path: String,

    #[serde(default)]
    pub power_active_low: bool,

    #[serde(default = "default_samples")]
    pub samples: u32,

    #[serde(default = "default_sample_delay_ms")]
    pub sample_delay_ms: u64,

    #[serde(default = "default_adc_max")]
    pub adc_max: u16,

    #[serde(default = "default_reference_voltage")]
    pub reference_voltage: f32,

    #[serde(default = "default_divider_ratio")]
    pub divider_ratio: f32,

    #[serde(default = "default_full_charge_voltage")]
    pub full_charge_voltage: f32,
}

/// Upload scheduling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    #[serde(default = "default_reauth_interval_ms")]
    pub reauth_interval_ms: u64,

    #[serde(default = "default_summary_every")]
    pub summary_every: u64,
}

/// Log output configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub dir: String,
}

// Default value functions
fn default_interface() -> String { "wlan0".to_string() }
fn default_join_attempts() -> u32 { 20 }
fn default_join_poll_ms() -> u64 { 500 }

fn default_timeout_ms() -> u64 { 10000 }

fn default_storage_dir() -> String { "./state".to_string() }

fn default_gps_port() -> String { "/dev/ttyS0".to_string() }
fn default_gps_baud_rate() -> u32 { 9600 }
fn default_gps_poll_interval_ms() -> u64 { 2000 }

fn default_adc_path() -> String { "/sys/bus/iio/devices/iio:device0/in_voltage0_raw".to_string() }
fn default_power_pin_path() -> String { "/sys/class/gpio/gpio17/value".to_string() }
fn default_samples() -> u32 { 10 }
fn default_sample_delay_ms() -> u64 { 10 }
fn default_adc_max() -> u16 { 4095 }
fn default_reference_voltage() -> f32 { 3.3 }
fn default_divider_ratio() -> f32 { 2.0 }
fn default_full_charge_voltage() -> f32 { 4.2 }

fn default_interval_ms() -> u64 { 1000 }
fn default_tick_ms() -> u64 { 50 }
fn default_reauth_interval_ms() -> u64 { 30000 }
fn default_summary_every() -> u64 { 60 }

impl Default for StorageConfig {
    fn default() -> Self {
        Self { dir: default_storage_dir(), read_only: false }
    }
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            port: default_gps_port(),
            baud_rate: default_gps_baud_rate(),
            poll_interval_ms: default_gps_poll_interval_ms(),
        }
    }
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            adc_path: default_adc_path(),
            power_pin_path: default_power_pin_path(),
            power_active_low: false,
            samples: default_samples(),
            sample_delay_ms: default_sample_delay_ms(),
            adc_max: default_adc_max(),
            reference_voltage: default_reference_voltage(),
            divider_ratio: default_divider_ratio(),
            full_charge_voltage: default_full_charge_voltage(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            tick_ms: default_tick_ms(),
            reauth_interval_ms: default_reauth_interval_ms(),
            summary_every: default_summary_every(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> TrackerError {
    TrackerError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tracker_agent::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.network.ssid.is_empty() {
            return Err(invalid("network ssid cannot be empty"));
        }

        if self.network.join_attempts == 0 || self.network.join_attempts > 1000 {
            return Err(invalid("join_attempts must be between 1 and 1000"));
        }

        if self.network.join_poll_ms == 0 || self.network.join_poll_ms > 60000 {
            return Err(invalid("join_poll_ms must be between 1 and 60000"));
        }

        if !(self.server.base_url.starts_with("http://")
            || self.server.base_url.starts_with("https://"))
        {
            return Err(invalid("server base_url must start with http:// or https://"));
        }

        if self.server.timeout_ms == 0 || self.server.timeout_ms > 120000 {
            return Err(invalid("timeout_ms must be between 1 and 120000"));
        }

        if self.device.device_id.is_empty() {
            return Err(invalid("device_id cannot be empty"));
        }

        if let Some(account) = &self.account {
            if account.email.is_empty() || account.password.is_empty() {
                return Err(invalid("account email and password must both be set"));
            }
        }

        if self.storage.dir.is_empty() {
            return Err(invalid("storage dir cannot be empty"));
        }

        if self.gps.port.is_empty() {
            return Err(invalid("gps port cannot be empty"));
        }

        if ![4800, 9600, 19200, 38400, 57600, 115200].contains(&self.gps.baud_rate) {
            return Err(invalid(
                "gps baud_rate must be one of: 4800, 9600, 19200, 38400, 57600, 115200",
            ));
        }

        if self.gps.poll_interval_ms == 0 || self.gps.poll_interval_ms > 60000 {
            return Err(invalid("gps poll_interval_ms must be between 1 and 60000"));
        }

        if self.power.samples == 0 || self.power.samples > 100 {
            return Err(invalid("power samples must be between 1 and 100"));
        }

        if self.power.sample_delay_ms > 100 {
            return Err(invalid("sample_delay_ms must be at most 100"));
        }

        if self.power.adc_max == 0 {
            return Err(invalid("adc_max must be greater than 0"));
        }

        for (name, value) in [
            ("reference_voltage", self.power.reference_voltage),
            ("divider_ratio", self.power.divider_ratio),
            ("full_charge_voltage", self.power.full_charge_voltage),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(invalid(format!("{} must be a positive number", name)));
            }
        }

        if self.telemetry.interval_ms == 0 || self.telemetry.interval_ms > 3_600_000 {
            return Err(invalid("telemetry interval_ms must be between 1 and 3600000"));
        }

        if self.telemetry.tick_ms == 0 || self.telemetry.tick_ms > self.telemetry.interval_ms {
            return Err(invalid("tick_ms must be between 1 and interval_ms"));
        }

        if self.telemetry.reauth_interval_ms == 0 {
            return Err(invalid("reauth_interval_ms must be greater than 0"));
        }

        if self.telemetry.summary_every == 0 {
            return Err(invalid("summary_every must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[network]
ssid = "garage"
password = "hunter2"

[server]
base_url = "https://tracker.example.com"

[device]
device_id = "TRK-0001"
user_id = "42"
"#;

    fn create_valid_config() -> Config {
        Config::from_toml_str(MINIMAL).unwrap()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = create_valid_config();
        assert_eq!(config.network.join_attempts, 20);
        assert_eq!(config.network.join_poll_ms, 500);
        assert_eq!(config.gps.poll_interval_ms, 2000);
        assert_eq!(config.telemetry.interval_ms, 1000);
        assert_eq!(config.power.samples, 10);
        assert!(config.account.is_none());
        assert!(config.logging.dir.is_empty());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(MINIMAL.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.device.device_id, "TRK-0001");
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/tracker.toml");
        assert!(matches!(result, Err(TrackerError::Io(_))));
    }

    #[test]
    fn test_missing_required_section() {
        let result = Config::from_toml_str("[network]\nssid = \"x\"\n");
        assert!(matches!(result, Err(TrackerError::Config(_))));
    }

    #[test]
    fn test_empty_ssid() {
        let mut config = create_valid_config();
        config.network.ssid = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_join_attempts_zero() {
        let mut config = create_valid_config();
        config.network.join_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_url_without_scheme() {
        let mut config = create_valid_config();
        config.server.base_url = "tracker.example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_device_id() {
        let mut config = create_valid_config();
        config.device.device_id = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_account_requires_both_fields() {
        let mut config = create_valid_config();
        config.account = Some(AccountConfig {
            email: "ops@example.com".to_string(),
            password: String::new(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_gps_baud_rate() {
        let mut config = create_valid_config();
        config.gps.baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_samples() {
        let mut config = create_valid_config();
        config.power.samples = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_full_charge_voltage() {
        let mut config = create_valid_config();
        config.power.full_charge_voltage = -4.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_longer_than_interval() {
        let mut config = create_valid_config();
        config.telemetry.tick_ms = 5000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_interface(), "wlan0");
        assert_eq!(default_timeout_ms(), 10000);
        assert_eq!(default_storage_dir(), "./state");
        assert_eq!(default_gps_baud_rate(), 9600);
        assert_eq!(default_sample_delay_ms(), 10);
        assert_eq!(default_adc_max(), 4095);
        assert_eq!(default_reference_voltage(), 3.3);
        assert_eq!(default_divider_ratio(), 2.0);
        assert_eq!(default_full_charge_voltage(), 4.2);
        assert_eq!(default_tick_ms(), 50);
        assert_eq!(default_reauth_interval_ms(), 30000);
    }
}
