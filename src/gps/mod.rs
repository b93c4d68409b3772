//! # GPS Module
//!
//! Position fixes decoded from the GPS receiver's NMEA stream.
//!
//! This module handles:
//! - Draining the serial feed without waiting for complete sentences
//! - Merging GGA (position, altitude) and RMC/VTG (speed) sentences
//! - Keeping the last known fix (no history)

pub mod sampler;

pub use sampler::LocationSampler;

/// Last known GPS position
///
/// Overwritten in place on every decoded fix. Fields stay at their zero
/// defaults until the first fix arrives.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LocationFix {
    /// Latitude in degrees (-90 to +90)
    pub latitude: f64,

    /// Longitude in degrees (-180 to +180)
    pub longitude: f64,

    /// Altitude above mean sea level in meters
    pub altitude_meters: f64,

    /// Ground speed in km/h
    pub speed_kmph: f64,

    /// True once at least one fix has been decoded since the last reset
    pub fix_valid: bool,
}
