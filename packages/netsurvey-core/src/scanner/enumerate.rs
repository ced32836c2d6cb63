//! Expand a network into the host addresses a scan will probe.

use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;

/// Host addresses selected for a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumeration {
    /// Addresses to probe, in ascending order.
    pub hosts: Vec<Ipv4Addr>,
    /// Number of assignable hosts in the full range.
    pub available: u64,
    /// Whether `hosts` was cut down to the scan limit.
    pub truncated: bool,
}

/// Assignable host addresses of `network`, capped at `limit`.
///
/// The network and broadcast addresses are excluded for prefixes up to /30.
/// A /31 contributes both of its addresses and a /32 its single address.
pub fn enumerate_hosts(network: Ipv4Network, limit: usize) -> Enumeration {
    let base = u32::from(network.network());
    let size: u64 = 1u64 << (32 - u32::from(network.prefix()));

    let (first, available) = match network.prefix() {
        31 | 32 => (base as u64, size),
        _ => (base as u64 + 1, size - 2),
    };

    let take = available.min(limit as u64);
    let hosts = (first..first + take)
        .map(|addr| Ipv4Addr::from(addr as u32))
        .collect();

    let truncated = available > take;
    if truncated {
        tracing::warn!(
            "Network range {} too large ({} hosts). Limiting to first {}.",
            network,
            available,
            take
        );
    }

    Enumeration {
        hosts,
        available,
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_SCAN_HOSTS;

    fn net(s: &str) -> Ipv4Network {
        s.parse().unwrap()
    }

    #[test]
    fn test_slash_30_excludes_network_and_broadcast() {
        let e = enumerate_hosts(net("10.0.0.0/30"), MAX_SCAN_HOSTS);
        assert_eq!(
            e.hosts,
            vec![Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2)]
        );
        assert_eq!(e.available, 2);
        assert!(!e.truncated);
    }

    #[test]
    fn test_slash_24_yields_254_hosts() {
        let e = enumerate_hosts(net("192.168.1.0/24"), MAX_SCAN_HOSTS);
        assert_eq!(e.hosts.len(), 254);
        assert_eq!(e.hosts.first(), Some(&Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(e.hosts.last(), Some(&Ipv4Addr::new(192, 168, 1, 254)));
        assert!(!e.truncated);
    }

    #[test]
    fn test_large_range_is_capped_to_first_hosts() {
        let e = enumerate_hosts(net("10.0.0.0/16"), MAX_SCAN_HOSTS);
        assert_eq!(e.available, 65_534);
        assert_eq!(e.hosts.len(), MAX_SCAN_HOSTS);
        assert!(e.truncated);
        let expected: Vec<Ipv4Addr> = (1..=254).map(|i| Ipv4Addr::new(10, 0, 0, i)).collect();
        assert_eq!(e.hosts, expected);
    }

    #[test]
    fn test_slash_23_cap_crosses_octet_boundary() {
        let e = enumerate_hosts(net("10.0.0.0/23"), 300);
        assert_eq!(e.hosts.len(), 300);
        assert_eq!(e.hosts[255], Ipv4Addr::new(10, 0, 1, 0));
    }

    #[test]
    fn test_whole_address_space_does_not_overflow() {
        let e = enumerate_hosts(net("0.0.0.0/0"), MAX_SCAN_HOSTS);
        assert_eq!(e.available, (1u64 << 32) - 2);
        assert_eq!(e.hosts.len(), MAX_SCAN_HOSTS);
        assert_eq!(e.hosts[0], Ipv4Addr::new(0, 0, 0, 1));
    }

    #[test]
    fn test_point_to_point_and_single_host() {
        let pair = enumerate_hosts(net("10.0.0.4/31"), MAX_SCAN_HOSTS);
        assert_eq!(
            pair.hosts,
            vec![Ipv4Addr::new(10, 0, 0, 4), Ipv4Addr::new(10, 0, 0, 5)]
        );
        let single = enumerate_hosts(net("10.0.0.9/32"), MAX_SCAN_HOSTS);
        assert_eq!(single.hosts, vec![Ipv4Addr::new(10, 0, 0, 9)]);
    }
}
