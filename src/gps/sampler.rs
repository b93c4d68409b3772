//! # Location Sampler
//!
//! Feeds buffered UART bytes through an NMEA parser and keeps the latest fix.
//!
//! ## Sentences
//!
//! | Sentence | Provides |
//! |----------|----------|
//! | GGA | latitude, longitude, altitude (marks the fix valid) |
//! | RMC | ground speed |
//! | VTG | ground speed (backup) |
//!
//! Sentences that report "no fix" (GGA quality 0, RMC status V) are
//! ignored and leave the previous fix untouched.

use nmea0183::{GPSQuality, Mode, ParseResult, Parser};
use tracing::{debug, warn};

use super::LocationFix;
use crate::serial::SerialSource;

/// Knots to km/h
const KNOTS_TO_KMPH: f64 = 1.852;

/// Read chunk size
const READ_CHUNK_SIZE: usize = 256;

/// Upper bound on bytes consumed by one `poll()`
///
/// Keeps a chattering receiver from starving the rest of the loop.
const MAX_DRAIN_BYTES: usize = 4096;

/// Streaming GPS decoder over a serial byte feed
pub struct LocationSampler {
    source: Box<dyn SerialSource>,
    parser: Parser,
    fix: LocationFix,
}

impl LocationSampler {
    /// Create a sampler reading from `source`
    pub fn new(source: Box<dyn SerialSource>) -> Self {
        Self {
            source,
            parser: Parser::new(),
            fix: LocationFix::default(),
        }
    }

    /// Drain buffered bytes and return the latest known fix
    ///
    /// Never waits for a sentence to complete: a partial sentence stays in
    /// the parser until the next call. If nothing new was decoded the
    /// previous fix is returned unchanged, including its `fix_valid` flag.
    /// Read errors are logged and the stale fix is returned.
    pub async fn poll(&mut self) -> LocationFix {
        let mut buf = [0u8; READ_CHUNK_SIZE];
        let mut drained = 0;

        while drained < MAX_DRAIN_BYTES {
            let n = match self.source.read_available(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    warn!("GPS serial read failed: {}", e);
                    break;
                }
            };

            drained += n;
            for &byte in &buf[..n] {
                self.feed(byte);
            }
        }

        if drained > 0 {
            debug!("Consumed {} GPS bytes", drained);
        }

        self.fix
    }

    /// Latest known fix without reading the port
    pub fn last_fix(&self) -> LocationFix {
        self.fix
    }

    /// Forget the current fix and any partial sentence
    pub fn reset(&mut self) {
        self.parser = Parser::new();
        self.fix = LocationFix::default();
    }

    fn feed(&mut self, byte: u8) {
        let Some(result) = self.parser.parse_from_byte(byte) else {
            return;
        };

        match result {
            Ok(ParseResult::GGA(Some(gga))) if gga.gps_quality == GPSQuality::NoFix => {
                debug!("GGA without a fix ({} satellites)", gga.sat_in_use);
            }
            Ok(ParseResult::GGA(Some(gga))) => {
                self.fix.latitude = gga.latitude.as_f64();
                self.fix.longitude = gga.longitude.as_f64();
                self.fix.altitude_meters = gga.altitude.meters as f64;
                if !self.fix.fix_valid {
                    debug!(
                        "First GPS fix: lat={:.6} lon={:.6} sats={}",
                        self.fix.latitude, self.fix.longitude, gga.sat_in_use
                    );
                }
                self.fix.fix_valid = true;
            }
            Ok(ParseResult::RMC(Some(rmc))) if rmc.mode != Mode::NotValid => {
                self.fix.speed_kmph = rmc.speed.as_knots() as f64 * KNOTS_TO_KMPH;
            }
            Ok(ParseResult::VTG(Some(vtg))) if vtg.mode != Mode::NotValid => {
                self.fix.speed_kmph = vtg.speed.as_knots() as f64 * KNOTS_TO_KMPH;
            }
            Ok(_) => {}
            Err(e) => debug!("Discarding NMEA sentence: {}", e),
        }
    }
}
