//! # Power Module
//!
//! Battery voltage and car power state sampling.
//!
//! This module handles:
//! - Averaging several ADC conversions per reading
//! - Scaling through the voltage divider and ADC reference
//! - Converting voltage to a clamped 0-100% charge estimate
//! - Reading the car power (ignition) input

pub mod io;

pub use io::{AnalogInput, DigitalInput, SysfsAnalogInput, SysfsDigitalInput};

use std::time::Duration;
use tracing::debug;

use crate::config::PowerConfig;
use crate::error::Result;

/// Battery and power state at one status interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceStatus {
    /// Car power (ignition) input is active
    pub car_power_on: bool,

    /// Battery voltage in volts
    pub battery_voltage: f32,

    /// Battery charge estimate (0-100%)
    pub battery_percent: u8,
}

/// ADC scaling constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryScale {
    /// Full-scale raw ADC value
    pub adc_max: u16,
    /// ADC reference voltage
    pub reference_voltage: f32,
    /// Battery voltage / ADC pin voltage
    pub divider_ratio: f32,
    /// Voltage reported as 100%
    pub full_charge_voltage: f32,
}

impl BatteryScale {
    /// Convert an (averaged) raw ADC value to battery volts
    pub fn to_voltage(&self, raw: f32) -> f32 {
        raw / self.adc_max as f32 * self.reference_voltage * self.divider_ratio
    }

    /// Convert battery volts to a charge percentage
    pub fn percent(&self, voltage: f32) -> u8 {
        battery_percent(voltage, self.full_charge_voltage)
    }
}

impl From<&PowerConfig> for BatteryScale {
    fn from(config: &PowerConfig) -> Self {
        Self {
            adc_max: config.adc_max,
            reference_voltage: config.reference_voltage,
            divider_ratio: config.divider_ratio,
            full_charge_voltage: config.full_charge_voltage,
        }
    }
}

/// Charge percentage relative to `full_charge_voltage`, clamped to 0-100
///
/// # Examples
///
/// ```
/// use tracker_agent::power::battery_percent;
///
/// assert_eq!(battery_percent(2.1, 4.2), 50);
/// assert_eq!(battery_percent(5.0, 4.2), 100);
/// ```
pub fn battery_percent(voltage: f32, full_charge_voltage: f32) -> u8 {
    if !voltage.is_finite() || full_charge_voltage <= 0.0 {
        return 0;
    }
    let percent = (voltage / full_charge_voltage * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Reads battery voltage and car power state
pub struct StatusSampler {
    adc: Box<dyn AnalogInput>,
    power_pin: Box<dyn DigitalInput>,
    scale: BatteryScale,
    samples: u32,
    sample_delay: Duration,
}

impl StatusSampler {
    /// Create a sampler
    ///
    /// # Arguments
    ///
    /// * `adc` - Battery divider ADC channel
    /// * `power_pin` - Car power input
    /// * `config` - Scaling and averaging settings
    pub fn new(
        adc: Box<dyn AnalogInput>,
        power_pin: Box<dyn DigitalInput>,
        config: &PowerConfig,
    ) -> Self {
        Self {
            adc,
            power_pin,
            scale: BatteryScale::from(config),
            samples: config.samples.max(1),
            sample_delay: Duration::from_millis(config.sample_delay_ms),
        }
    }

    /// Averaged battery voltage
    ///
    /// Takes `samples` conversions with `sample_delay` between them, so the
    /// call is bounded at roughly `samples * sample_delay`.
    pub async fn read_battery(&mut self) -> Result<f32> {
        let mut total: u32 = 0;

        for i in 0..self.samples {
            if i > 0 && !self.sample_delay.is_zero() {
                tokio::time::sleep(self.sample_delay).await;
            }
            total += self.adc.read_raw()? as u32;
        }

        let average = total as f32 / self.samples as f32;
        let voltage = self.scale.to_voltage(average);
        debug!("Battery ADC avg {:.1} -> {:.2} V", average, voltage);
        Ok(voltage)
    }

    /// Battery reading combined with the car power input
    pub async fn read_status(&mut self) -> Result<DeviceStatus> {
        let battery_voltage = self.read_battery().await?;
        let car_power_on = self.power_pin.is_high()?;

        Ok(DeviceStatus {
            car_power_on,
            battery_voltage,
            battery_percent: self.scale.percent(battery_voltage),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::io::mocks::{MockAnalogInput, MockDigitalInput};
    use super::*;

    fn power_config() -> PowerConfig {
        PowerConfig {
            sample_delay_ms: 0,
            ..PowerConfig::default()
        }
    }

    fn sampler(adc: MockAnalogInput, pin: MockDigitalInput) -> StatusSampler {
        StatusSampler::new(Box::new(adc), Box::new(pin), &power_config())
    }

    #[test]
    fn test_percent_half_charge() {
        assert_eq!(battery_percent(2.1, 4.2), 50);
    }

    #[test]
    fn test_percent_clamps_above_full() {
        assert_eq!(battery_percent(5.0, 4.2), 100);
        assert_eq!(battery_percent(42.0, 4.2), 100);
    }

    #[test]
    fn test_percent_clamps_below_zero() {
        assert_eq!(battery_percent(-1.0, 4.2), 0);
        assert_eq!(battery_percent(0.0, 4.2), 0);
    }

    #[test]
    fn test_percent_non_finite() {
        assert_eq!(battery_percent(f32::NAN, 4.2), 0);
        assert_eq!(battery_percent(f32::INFINITY, 4.2), 0);
    }

    #[test]
    fn test_voltage_scaling() {
        let scale = BatteryScale::from(&PowerConfig::default());
        // Full-scale ADC through a 2:1 divider at 3.3V reference
        assert!((scale.to_voltage(4095.0) - 6.6).abs() < 0.001);
        assert!((scale.to_voltage(0.0)).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_read_battery_averages_samples() {
        let adc = MockAnalogInput::sequence(&[2000, 2100, 2000, 2100, 2000, 2100, 2000, 2100, 2000, 2100]);
        let mut status = sampler(adc.clone(), MockDigitalInput::new(false));

        let voltage = status.read_battery().await.unwrap();
        let expected = 2050.0 / 4095.0 * 3.3 * 2.0;
        assert!((voltage - expected).abs() < 0.001);
        assert_eq!(adc.read_count(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_battery_delays_between_samples() {
        let adc = MockAnalogInput::constant(2500);
        let mut status = StatusSampler::new(
            Box::new(adc),
            Box::new(MockDigitalInput::new(false)),
            &PowerConfig::default(),
        );

        let start = tokio::time::Instant::now();
        status.read_battery().await.unwrap();
        // Nine gaps between ten samples
        let elapsed = start.elapsed();
        assert!(elapsed >= std::time::Duration::from_millis(90));
        assert!(elapsed < std::time::Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_read_status_full_battery_clamped() {
        // 4095 raw -> 6.6V, well above the 4.2V reference
        let mut status = sampler(MockAnalogInput::constant(4095), MockDigitalInput::new(true));

        let reading = status.read_status().await.unwrap();
        assert!(reading.car_power_on);
        assert!(reading.battery_voltage > 4.2);
        assert_eq!(reading.battery_percent, 100);
    }

    #[tokio::test]
    async fn test_read_status_power_off() {
        let pin = MockDigitalInput::new(true);
        let mut status = sampler(MockAnalogInput::constant(2300), pin.clone());

        pin.set(false);
        let reading = status.read_status().await.unwrap();
        assert!(!reading.car_power_on);
        assert!(reading.battery_percent <= 100);
    }

    #[tokio::test]
    async fn test_read_status_adc_failure() {
        let adc = MockAnalogInput::constant(2000);
        adc.set_fail(true);
        let mut status = sampler(adc, MockDigitalInput::new(false));
        assert!(status.read_status().await.is_err());
    }
}
