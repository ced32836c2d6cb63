//! Scan results and their assembly into a report.

use crate::scanner::MacAddress;
use crate::scanner::enumerate::Enumeration;
use chrono::{DateTime, Utc};
use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use uuid::Uuid;

/// A live host found by the scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostProbeResult {
    pub address: Ipv4Addr,
    pub reachable: bool,
    /// Round-trip time of the reachability probe, rounded to 0.01 ms
    pub response_time_ms: Option<f64>,
    pub hostname: Option<String>,
    pub mac_address: Option<MacAddress>,
    pub discovered_at: DateTime<Utc>,
}

impl HostProbeResult {
    pub fn reachable(
        address: Ipv4Addr,
        response_time_ms: f64,
        hostname: Option<String>,
        mac_address: Option<MacAddress>,
    ) -> Self {
        Self {
            address,
            reachable: true,
            response_time_ms: Some(response_time_ms),
            hostname,
            mac_address,
            discovered_at: Utc::now(),
        }
    }
}

/// Outcome of one discovery scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryReport {
    pub scan_id: Uuid,
    /// The resolved range, e.g. `192.168.1.0/24`
    pub range: String,
    /// Addresses actually probed (at most 254)
    pub hosts_scanned: usize,
    /// Set when the range held more hosts than a scan may probe
    pub truncated: bool,
    pub device_count: usize,
    /// Live hosts in the order their probes completed
    pub devices: Vec<HostProbeResult>,
    pub scan_duration_seconds: f64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl DiscoveryReport {
    /// Build the report for a finished scan. A wall clock that stepped
    /// backwards during the scan is clamped so the report never ends before
    /// it starts.
    pub fn assemble(
        scan_id: Uuid,
        range: Ipv4Network,
        enumeration: &Enumeration,
        mut devices: Vec<HostProbeResult>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        devices.retain(|d| d.reachable);

        let completed_at = completed_at.max(started_at);
        let scan_duration_seconds = (completed_at - started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        Self {
            scan_id,
            range: range.to_string(),
            hosts_scanned: enumeration.hosts.len(),
            truncated: enumeration.truncated,
            device_count: devices.len(),
            devices,
            scan_duration_seconds,
            started_at,
            completed_at,
        }
    }
}
