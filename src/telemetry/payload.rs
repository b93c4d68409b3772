//! # Telemetry Payloads
//!
//! JSON shapes posted to the server. Coordinates follow the GeoJSON
//! convention: `[longitude, latitude]`.
//!
//! Live location:
//! ```json
//! {"deviceId":"TRK-0001","location":{"type":"Point","coordinates":[11.5167,48.1173]},
//!  "speed":41.48,"gpsFix":true,"battery":{"percent":88,"voltage":3.71,"charging":true},
//!  "signal":-61}
//! ```
//!
//! Heartbeat:
//! ```json
//! {"deviceId":"TRK-0001","status":"heartbeat","gpsFix":false,
//!  "battery":{"percent":88,"voltage":3.71,"charging":false},"signal":null}
//! ```

use serde::{Deserialize, Serialize};

use crate::gps::LocationFix;
use crate::power::DeviceStatus;

/// Value of the heartbeat `status` field
pub const HEARTBEAT_STATUS: &str = "heartbeat";

/// GeoJSON geometry type for a single position
pub const POINT_TYPE: &str = "Point";

/// Round to two decimal places
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to six decimal places (~0.1 m)
fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Battery block shared by both payloads
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryReport {
    pub percent: u8,
    pub voltage: f64,
    pub charging: bool,
}

impl From<&DeviceStatus> for BatteryReport {
    fn from(status: &DeviceStatus) -> Self {
        Self {
            percent: status.battery_percent.min(100),
            voltage: round2(status.battery_voltage as f64),
            charging: status.car_power_on,
        }
    }
}

/// GeoJSON point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            kind: POINT_TYPE.to_string(),
            coordinates: [round6(longitude), round6(latitude)],
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

/// Position update for `/api/locations/updateLocation`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveLocationPayload {
    pub device_id: String,
    pub location: GeoPoint,
    /// km/h
    pub speed: f64,
    pub gps_fix: bool,
    pub battery: BatteryReport,
    /// RSSI in dBm, null when unknown
    pub signal: Option<i32>,
}

impl LiveLocationPayload {
    pub fn new(device_id: &str, status: &DeviceStatus, fix: &LocationFix, signal: Option<i32>) -> Self {
        Self {
            device_id: device_id.to_string(),
            location: GeoPoint::new(fix.latitude, fix.longitude),
            speed: round2(fix.speed_kmph),
            gps_fix: fix.fix_valid,
            battery: BatteryReport::from(status),
            signal,
        }
    }
}

/// Liveness report without a position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatPayload {
    pub device_id: String,
    pub status: String,
    pub gps_fix: bool,
    pub battery: BatteryReport,
    pub signal: Option<i32>,
}

impl HeartbeatPayload {
    pub fn new(device_id: &str, status: &DeviceStatus, fix: &LocationFix, signal: Option<i32>) -> Self {
        Self {
            device_id: device_id.to_string(),
            status: HEARTBEAT_STATUS.to_string(),
            gps_fix: fix.fix_valid,
            battery: BatteryReport::from(status),
            signal,
        }
    }
}
