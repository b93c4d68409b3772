//! Link implementation for a host whose WiFi association is managed by the OS
//!
//! The station is considered connected once the kernel has a route to the
//! API server. Signal strength is read from `/proc/net/wireless`.

use std::fs;
use std::net::{IpAddr, ToSocketAddrs, UdpSocket};
use tracing::{debug, info};

use super::{LinkStatus, WifiLink};
use crate::error::Result;

const WIRELESS_STATS_PATH: &str = "/proc/net/wireless";

/// Host and port of `base_url`, defaulting the port from the scheme
pub fn host_port(base_url: &str) -> Option<(String, u16)> {
    let (default_port, rest) = if let Some(rest) = base_url.strip_prefix("https://") {
        (443, rest)
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        (80, rest)
    } else {
        return None;
    };

    let authority = rest.split('/').next().unwrap_or_default();
    if authority.is_empty() {
        return None;
    }

    let (host, port) = match authority.strip_prefix('[') {
        // IPv6 literal: [addr] or [addr]:port
        Some(bracketed) => {
            let (host, after) = bracketed.split_once(']')?;
            let port = match after {
                "" => default_port,
                _ => after.strip_prefix(':')?.parse().ok()?,
            };
            (host, port)
        }
        None => match authority.rsplit_once(':') {
            Some((host, port)) => (host, port.parse().ok()?),
            None => (authority, default_port),
        },
    };

    if host.is_empty() {
        return None;
    }
    Some((host.to_string(), port))
}

/// Signal level in dBm for `interface` from `/proc/net/wireless` contents
///
/// ```text
/// Inter-| sta-|   Quality        |   Discarded packets
///  face | tus | link level noise |  nwid  crypt   frag
///  wlan0: 0000   70.  -40.  -256        0      0      0
/// ```
pub fn parse_wireless(text: &str, interface: &str) -> Option<i32> {
    text.lines().skip(2).find_map(|line| {
        let (name, stats) = line.split_once(':')?;
        if name.trim() != interface {
            return None;
        }
        let level = stats.split_whitespace().nth(2)?;
        let level: f32 = level.trim_end_matches('.').parse().ok()?;
        Some(level.round() as i32)
    })
}

/// [`WifiLink`] backed by the host network stack
pub struct HostLink {
    interface: String,
    target: Option<(String, u16)>,
}

impl HostLink {
    pub fn new(base_url: &str, interface: &str) -> Self {
        Self {
            interface: interface.to_string(),
            target: host_port(base_url),
        }
    }

    /// Local address the kernel would use to reach the API host
    fn probe(&self) -> Option<IpAddr> {
        let (host, port) = self.target.as_ref()?;
        let remote = (host.as_str(), *port).to_socket_addrs().ok()?.next()?;
        let bind = if remote.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };

        let socket = UdpSocket::bind(bind).ok()?;
        socket.connect(remote).ok()?;
        let local = socket.local_addr().ok()?.ip();
        if local.is_unspecified() {
            None
        } else {
            Some(local)
        }
    }
}

impl WifiLink for HostLink {
    fn begin(&mut self, ssid: &str, _password: &str) -> Result<()> {
        info!(
            "Association with {} on {} is managed by the system",
            ssid, self.interface
        );
        Ok(())
    }

    fn status(&mut self) -> LinkStatus {
        match (&self.target, self.probe()) {
            (None, _) => LinkStatus::Disconnected,
            (Some(_), Some(_)) => LinkStatus::Connected,
            (Some(_), None) => LinkStatus::Connecting,
        }
    }

    fn local_address(&mut self) -> Option<IpAddr> {
        self.probe()
    }

    fn signal_dbm(&mut self) -> Option<i32> {
        match fs::read_to_string(WIRELESS_STATS_PATH) {
            Ok(text) => parse_wireless(&text, &self.interface),
            Err(e) => {
                debug!("Cannot read {}: {}", WIRELESS_STATS_PATH, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIRELESS: &str = "Inter-| sta-|   Quality        |   Discarded packets               | Missed | WE\n \
face | tus | link level noise |  nwid  crypt   frag  retry   misc | beacon | 22\n \
wlan0: 0000   70.  -40.  -256        0      0      0      0      0        0\n \
wlan1: 0000   31.  -79.  -256        0      0      0      0      0        0\n";

    #[test]
    fn test_host_port_defaults() {
        assert_eq!(
            host_port("https://api.example.com"),
            Some(("api.example.com".to_string(), 443))
        );
        assert_eq!(
            host_port("http://10.0.0.5/base"),
            Some(("10.0.0.5".to_string(), 80))
        );
    }

    #[test]
    fn test_host_port_explicit() {
        assert_eq!(
            host_port("http://tracker.local:8080/api"),
            Some(("tracker.local".to_string(), 8080))
        );
    }

    #[test]
    fn test_host_port_ipv6_literal() {
        assert_eq!(
            host_port("http://[::1]:8080/api"),
            Some(("::1".to_string(), 8080))
        );
        assert_eq!(
            host_port("https://[fe80::1]"),
            Some(("fe80::1".to_string(), 443))
        );
        assert_eq!(host_port("http://[::1"), None);
        assert_eq!(host_port("http://[::1]8080"), None);
        assert_eq!(host_port("http://[]:80"), None);
    }

    #[test]
    fn test_host_port_invalid() {
        assert_eq!(host_port("ftp://example.com"), None);
        assert_eq!(host_port("http://"), None);
        assert_eq!(host_port("http://host:notaport"), None);
    }

    #[test]
    fn test_parse_wireless_level() {
        assert_eq!(parse_wireless(WIRELESS, "wlan0"), Some(-40));
        assert_eq!(parse_wireless(WIRELESS, "wlan1"), Some(-79));
    }

    #[test]
    fn test_parse_wireless_missing_interface() {
        assert_eq!(parse_wireless(WIRELESS, "eth0"), None);
        assert_eq!(parse_wireless("", "wlan0"), None);
    }

    #[test]
    fn test_unroutable_base_url_is_disconnected() {
        let mut link = HostLink::new("not a url", "wlan0");
        assert_eq!(link.status(), LinkStatus::Disconnected);
        assert_eq!(link.local_address(), None);
    }

    #[test]
    fn test_loopback_target_connects() {
        let mut link = HostLink::new("http://127.0.0.1:9", "lo");
        assert_eq!(link.status(), LinkStatus::Connected);
        assert!(link.local_address().is_some_and(|ip| ip.is_loopback()));
    }
}
