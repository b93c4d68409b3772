//! # Network Module
//!
//! WiFi association and link state.
//!
//! This module handles:
//! - Starting association with the configured SSID
//! - Polling link status with a bounded attempt budget
//! - Reporting the local address and signal strength

pub mod host;

pub use host::HostLink;

use std::net::IpAddr;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::NetworkConfig;
use crate::error::{Result, TrackerError};

/// Association state of the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Connected,
    Connecting,
    Disconnected,
}

/// WiFi station interface
pub trait WifiLink: Send {
    /// Start associating with `ssid`
    fn begin(&mut self, ssid: &str, password: &str) -> Result<()>;

    /// Current association state
    fn status(&mut self) -> LinkStatus;

    /// Address assigned to this station, if any
    fn local_address(&mut self) -> Option<IpAddr>;

    /// Received signal strength in dBm
    fn signal_dbm(&mut self) -> Option<i32>;
}

/// Join the configured network
///
/// Polls the link every `join_poll_ms` for at most `join_attempts` polls.
///
/// # Errors
///
/// Returns `Connectivity` when the attempt budget runs out or association
/// cannot be started. The caller is expected to continue offline.
pub async fn join_network(link: &mut dyn WifiLink, config: &NetworkConfig) -> Result<Option<IpAddr>> {
    info!("Connecting to WiFi network {}", config.ssid);
    link.begin(&config.ssid, &config.password)?;

    let poll = Duration::from_millis(config.join_poll_ms);
    let mut attempts = 0;

    let mut status = link.status();
    while status != LinkStatus::Connected && attempts < config.join_attempts {
        tokio::time::sleep(poll).await;
        attempts += 1;
        status = link.status();
    }

    if status != LinkStatus::Connected {
        warn!(
            "Failed to connect to {} after {} attempts",
            config.ssid, config.join_attempts
        );
        return Err(TrackerError::Connectivity(format!(
            "{} not joined after {} attempts",
            config.ssid, config.join_attempts
        )));
    }

    let address = link.local_address();
    match address {
        Some(ip) => info!("WiFi connected, IP address: {}", ip),
        None => info!("WiFi connected"),
    }
    Ok(address)
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Link that becomes connected after a set number of status polls
    #[derive(Clone)]
    pub struct MockLink {
        pub polls_until_up: Arc<Mutex<Option<u32>>>,
        pub polls: Arc<Mutex<u32>>,
        pub joined: Arc<Mutex<Option<String>>>,
        pub signal: Option<i32>,
    }

    impl MockLink {
        /// `None` never connects
        pub fn new(polls_until_up: Option<u32>) -> Self {
            Self {
                polls_until_up: Arc::new(Mutex::new(polls_until_up)),
                polls: Arc::new(Mutex::new(0)),
                joined: Arc::new(Mutex::new(None)),
                signal: Some(-58),
            }
        }

        pub fn poll_count(&self) -> u32 {
            *self.polls.lock().unwrap()
        }
    }

    impl WifiLink for MockLink {
        fn begin(&mut self, ssid: &str, _password: &str) -> Result<()> {
            *self.joined.lock().unwrap() = Some(ssid.to_string());
            Ok(())
        }

        fn status(&mut self) -> LinkStatus {
            let mut polls = self.polls.lock().unwrap();
            *polls += 1;
            match *self.polls_until_up.lock().unwrap() {
                Some(n) if *polls > n => LinkStatus::Connected,
                _ => LinkStatus::Connecting,
            }
        }

        fn local_address(&mut self) -> Option<IpAddr> {
            Some(IpAddr::from([192, 168, 4, 20]))
        }

        fn signal_dbm(&mut self) -> Option<i32> {
            self.signal
        }
    }
}
