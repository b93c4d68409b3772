//! # Telemetry Module
//!
//! Builds and uploads the device's status and location reports.
//!
//! This module handles:
//! - Heartbeat and live-location JSON payloads
//! - Posting them with the bearer token
//! - Reporting delivery results back to the main loop

pub mod payload;
pub mod uplink;

pub use payload::{BatteryReport, GeoPoint, HeartbeatPayload, LiveLocationPayload};
pub use uplink::{SerializedPayload, TelemetryUplink};
