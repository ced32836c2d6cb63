//! Resolve the network range a scan covers.

use crate::error::ScanError;
use ipnetwork::{IpNetwork, Ipv4Network};
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

/// Any routable address works; no datagram is ever sent to it.
const ROUTE_PROBE_TARGET: &str = "8.8.8.8:80";

/// Prefix assumed for the auto-detected local network.
const LOCAL_PREFIX: u8 = 24;

/// Turns an optional range string into a concrete IPv4 network.
#[derive(Debug, Clone)]
pub struct RangeResolver {
    fallback: Ipv4Network,
}

impl RangeResolver {
    pub fn new(fallback: Ipv4Network) -> Self {
        Self { fallback }
    }

    /// Use `range` when given, otherwise detect the local /24.
    ///
    /// Only a malformed explicit range is an error; detection problems fall
    /// back to the configured default.
    pub fn resolve(&self, range: Option<&str>) -> Result<Ipv4Network, ScanError> {
        match range.map(str::trim).filter(|r| !r.is_empty()) {
            Some(range) => parse_range(range),
            None => Ok(self.detect_local_network()),
        }
    }

    /// The /24 around the outbound interface address, or the fallback range.
    pub fn detect_local_network(&self) -> Ipv4Network {
        let local = match local_outbound_address() {
            Ok(addr) => Some(addr),
            Err(e) => {
                tracing::warn!("Could not determine local network address: {}", e);
                None
            }
        };
        local_network_or(local, self.fallback)
    }
}

/// Parse a CIDR range leniently: host bits may be set and are masked off.
/// A bare address is treated as a single-host range.
pub fn parse_range(range: &str) -> Result<Ipv4Network, ScanError> {
    let parsed: IpNetwork = range
        .trim()
        .parse()
        .map_err(|e| ScanError::invalid_range(range, format!("{}", e)))?;

    match parsed {
        IpNetwork::V4(network) => Ipv4Network::new(network.network(), network.prefix())
            .map_err(|e| ScanError::invalid_range(range, format!("{}", e))),
        IpNetwork::V6(_) => Err(ScanError::invalid_range(
            range,
            "only IPv4 ranges are supported",
        )),
    }
}

/// Read back the local endpoint of a connected (but unused) UDP socket.
fn local_outbound_address() -> std::io::Result<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect(ROUTE_PROBE_TARGET)?;
    match socket.local_addr()? {
        SocketAddr::V4(addr) if !addr.ip().is_unspecified() => Ok(*addr.ip()),
        other => Err(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            format!("no usable IPv4 local address ({})", other.ip()),
        )),
    }
}

fn local_network_or(local: Option<Ipv4Addr>, fallback: Ipv4Network) -> Ipv4Network {
    local
        .filter(|addr| !addr.is_loopback() && !addr.is_unspecified())
        .and_then(|addr| {
            let network = Ipv4Network::new(addr, LOCAL_PREFIX).ok()?;
            Ipv4Network::new(network.network(), LOCAL_PREFIX).ok()
        })
        .unwrap_or_else(|| {
            tracing::warn!("Falling back to default network range {}", fallback);
            fallback
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_fallback_range;

    #[test]
    fn test_parse_range_normalizes_host_bits() {
        let network = parse_range("10.0.0.77/24").unwrap();
        assert_eq!(network.to_string(), "10.0.0.0/24");
        assert_eq!(parse_range(" 10.0.0.0/30 ").unwrap().prefix(), 30);
    }

    #[test]
    fn test_parse_range_bare_address_is_single_host() {
        let network = parse_range("192.168.4.20").unwrap();
        assert_eq!(network.prefix(), 32);
        assert_eq!(network.network(), Ipv4Addr::new(192, 168, 4, 20));
    }

    #[test]
    fn test_parse_range_rejects_garbage() {
        assert!(matches!(
            parse_range("10.0.0.0/33"),
            Err(ScanError::InvalidRange { .. })
        ));
        assert!(matches!(
            parse_range("not-a-network"),
            Err(ScanError::InvalidRange { .. })
        ));
        assert!(matches!(
            parse_range("fe80::/64"),
            Err(ScanError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_explicit_range_wins() {
        let resolver = RangeResolver::new(default_fallback_range());
        let network = resolver.resolve(Some("172.20.1.9/16")).unwrap();
        assert_eq!(network.to_string(), "172.20.0.0/16");
    }

    #[test]
    fn test_blank_range_auto_detects() {
        let resolver = RangeResolver::new(default_fallback_range());
        let network = resolver.resolve(Some("  ")).unwrap();
        assert_eq!(network.prefix(), 24);
    }

    #[test]
    fn test_local_network_is_slash_24() {
        let network =
            local_network_or(Some(Ipv4Addr::new(10, 20, 30, 40)), default_fallback_range());
        assert_eq!(network.to_string(), "10.20.30.0/24");
    }

    #[test]
    fn test_missing_or_loopback_address_falls_back() {
        let fallback = default_fallback_range();
        assert_eq!(local_network_or(None, fallback), fallback);
        assert_eq!(
            local_network_or(Some(Ipv4Addr::LOCALHOST), fallback),
            fallback
        );
        assert_eq!(
            local_network_or(Some(Ipv4Addr::UNSPECIFIED), fallback),
            fallback
        );
    }
}
