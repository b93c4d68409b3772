//! Trait abstractions for the battery ADC channel and the car power input
//!
//! The host implementations read Linux sysfs attributes: an IIO raw ADC
//! value and a GPIO `value` file.

use std::fs;
use std::path::PathBuf;

use crate::error::{Result, TrackerError};

/// A single analog input channel
pub trait AnalogInput: Send {
    /// Read one raw ADC conversion
    fn read_raw(&mut self) -> Result<u16>;
}

/// A single digital input line
pub trait DigitalInput: Send {
    /// Read the logical level (after any active-low inversion)
    fn is_high(&mut self) -> Result<bool>;
}

/// IIO ADC channel exposed as `in_voltageN_raw`
pub struct SysfsAnalogInput {
    path: PathBuf,
}

impl SysfsAnalogInput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AnalogInput for SysfsAnalogInput {
    fn read_raw(&mut self) -> Result<u16> {
        let text = fs::read_to_string(&self.path).map_err(|e| {
            TrackerError::Sensor(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        text.trim().parse::<u16>().map_err(|e| {
            TrackerError::Sensor(format!(
                "Invalid ADC value {:?} in {}: {}",
                text.trim(),
                self.path.display(),
                e
            ))
        })
    }
}

/// GPIO line exposed as `/sys/class/gpio/gpioN/value`
pub struct SysfsDigitalInput {
    path: PathBuf,
    active_low: bool,
}

impl SysfsDigitalInput {
    pub fn new(path: impl Into<PathBuf>, active_low: bool) -> Self {
        Self {
            path: path.into(),
            active_low,
        }
    }
}

impl DigitalInput for SysfsDigitalInput {
    fn is_high(&mut self) -> Result<bool> {
        let text = fs::read_to_string(&self.path).map_err(|e| {
            TrackerError::Sensor(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        let level = match text.trim() {
            "0" => false,
            "1" => true,
            other => {
                return Err(TrackerError::Sensor(format!(
                    "Invalid GPIO value {:?} in {}",
                    other,
                    self.path.display()
                )))
            }
        };

        Ok(level != self.active_low)
    }
}
