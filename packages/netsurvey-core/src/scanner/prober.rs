//! The probing capability the host pipeline is written against.

use super::mac::MacAddress;
use super::{arp, hostname, ping};
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Result of a reachability check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reachability {
    Reachable { elapsed_ms: f64 },
    Unreachable,
}

/// Low-level host queries used by each host pipeline.
///
/// Implementations report failure through their return values and should
/// honour `timeout`, though the pipeline bounds every call regardless.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn check_reachability(&self, address: Ipv4Addr, timeout: Duration) -> Reachability;

    async fn resolve_hostname(&self, address: Ipv4Addr, timeout: Duration) -> Option<String>;

    async fn lookup_neighbor(&self, address: Ipv4Addr, timeout: Duration) -> Option<MacAddress>;
}

/// Prober backed by the platform's `ping`, resolver and `arp` utilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProber;

#[async_trait]
impl Prober for SystemProber {
    async fn check_reachability(&self, address: Ipv4Addr, timeout: Duration) -> Reachability {
        ping::ping_host(address, timeout).await
    }

    async fn resolve_hostname(&self, address: Ipv4Addr, timeout: Duration) -> Option<String> {
        hostname::resolve_hostname(address, timeout).await
    }

    async fn lookup_neighbor(&self, address: Ipv4Addr, timeout: Duration) -> Option<MacAddress> {
        arp::lookup_neighbor(address, timeout).await
    }
}
