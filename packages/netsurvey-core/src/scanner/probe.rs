//! Per-host pipeline: reachability, then hostname, then hardware address.

use super::prober::{Prober, Reachability};
use crate::config::{HOSTNAME_TIMEOUT, NEIGHBOR_TIMEOUT, REACHABILITY_GRACE};
use crate::report::HostProbeResult;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::time::timeout;

/// Time limits for each pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTimeouts {
    /// Nominal reachability timeout handed to the prober
    pub reachability: Duration,
    /// Extra time the reachability call may take before it is abandoned
    pub grace: Duration,
    pub hostname: Duration,
    pub neighbor: Duration,
}

impl ProbeTimeouts {
    pub fn new(per_host_timeout: Duration) -> Self {
        Self {
            reachability: per_host_timeout,
            grace: REACHABILITY_GRACE,
            hostname: HOSTNAME_TIMEOUT,
            neighbor: NEIGHBOR_TIMEOUT,
        }
    }

    /// Hard limit on the reachability stage.
    pub fn reachability_limit(&self) -> Duration {
        self.reachability + self.grace
    }
}

/// Terminal state of one host pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Unreachable,
    Resolved(HostProbeResult),
}

impl ProbeOutcome {
    pub fn into_result(self) -> Option<HostProbeResult> {
        match self {
            ProbeOutcome::Resolved(result) => Some(result),
            ProbeOutcome::Unreachable => None,
        }
    }
}

/// Run the pipeline for one address.
///
/// Only the reachability stage can end the pipeline early; hostname and
/// hardware-address failures leave the corresponding field empty.
pub async fn probe_host(
    prober: &dyn Prober,
    address: Ipv4Addr,
    timeouts: &ProbeTimeouts,
) -> ProbeOutcome {
    let reachability = match timeout(
        timeouts.reachability_limit(),
        prober.check_reachability(address, timeouts.reachability),
    )
    .await
    {
        Ok(reachability) => reachability,
        Err(_) => {
            tracing::debug!(
                "Ping timeout for {} after {:?}",
                address,
                timeouts.reachability_limit()
            );
            return ProbeOutcome::Unreachable;
        }
    };

    let elapsed_ms = match reachability {
        Reachability::Reachable { elapsed_ms } => elapsed_ms,
        Reachability::Unreachable => return ProbeOutcome::Unreachable,
    };

    let hostname = match timeout(
        timeouts.hostname,
        prober.resolve_hostname(address, timeouts.hostname),
    )
    .await
    {
        Ok(hostname) => hostname,
        Err(_) => {
            tracing::debug!("Hostname lookup timed out for {}", address);
            None
        }
    };

    let mac_address = match timeout(
        timeouts.neighbor,
        prober.lookup_neighbor(address, timeouts.neighbor),
    )
    .await
    {
        Ok(mac) => mac,
        Err(_) => {
            tracing::debug!("MAC address lookup timed out for {}", address);
            None
        }
    };

    ProbeOutcome::Resolved(HostProbeResult::reachable(
        address,
        round_ms(elapsed_ms),
        hostname,
        mac_address,
    ))
}

fn round_ms(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}
