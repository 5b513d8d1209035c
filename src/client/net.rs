//! Outbound IP discovery.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, UdpSocket};

/// Local address the OS would use to reach `probe_addr`.
///
/// Connecting a UDP socket only selects a route; nothing is sent. Returns
/// `None` when there is no route or `probe_addr` does not resolve.
pub fn outbound_ip(probe_addr: &str) -> Option<IpAddr> {
    let unspecified = if probe_addr.starts_with('[') {
        IpAddr::V6(Ipv6Addr::UNSPECIFIED)
    } else {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    };

    let socket = UdpSocket::bind((unspecified, 0)).ok()?;
    if let Err(e) = socket.connect(probe_addr) {
        tracing::debug!(probe_addr, error = %e, "no route for outbound IP discovery");
        return None;
    }

    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}

/// String form of [`outbound_ip`], empty when unavailable.
pub fn outbound_ip_string(probe_addr: &str) -> String {
    outbound_ip(probe_addr)
        .map(|ip| ip.to_string())
        .unwrap_or_default()
}
