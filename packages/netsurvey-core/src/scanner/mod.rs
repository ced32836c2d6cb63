//! Network discovery.
//!
//! A scan resolves the range, expands it into at most 254 host addresses and
//! runs a pipeline per host under a fixed concurrency ceiling:
//! - ICMP ping (system `ping`)
//! - reverse hostname lookup (`getent`/`host`, `Resolve-DnsName` on Windows)
//! - neighbor table lookup (system `arp`)
//!
//! Hosts that do not answer the ping are left out of the report. Hostname and
//! MAC lookups are best effort.

mod arp;
mod command;
pub mod enumerate;
mod hostname;
mod mac;
mod ping;
pub mod pool;
pub mod probe;
pub mod prober;
pub mod range;

pub use enumerate::{enumerate_hosts, Enumeration};
pub use mac::{find_mac_address, MacAddress, ParseMacError};
pub use pool::ConcurrentProber;
pub use probe::{probe_host, ProbeOutcome, ProbeTimeouts};
pub use prober::{Prober, Reachability, SystemProber};
pub use range::{parse_range, RangeResolver};

use crate::config::{ScanConfig, MAX_SCAN_HOSTS};
use crate::error::ScanError;
use crate::report::DiscoveryReport;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Accepted per-host timeouts, in seconds.
pub const PER_HOST_TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=30;

/// Parameters of a single scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    range: Option<String>,
    per_host_timeout_secs: u64,
}

impl ScanRequest {
    pub fn new(range: Option<String>, per_host_timeout_secs: u64) -> Result<Self, ScanError> {
        if !PER_HOST_TIMEOUT_RANGE.contains(&per_host_timeout_secs) {
            return Err(ScanError::InvalidTimeout(per_host_timeout_secs));
        }
        Ok(Self {
            range,
            per_host_timeout_secs,
        })
    }

    /// Request built from the configured range and timeout.
    pub fn from_config(config: &ScanConfig) -> Result<Self, ScanError> {
        Self::new(config.default_range.clone(), config.per_host_timeout_secs)
    }

    pub fn range(&self) -> Option<&str> {
        self.range.as_deref()
    }

    pub fn per_host_timeout(&self) -> Duration {
        Duration::from_secs(self.per_host_timeout_secs)
    }
}

/// Progress updates during network scanning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgress {
    pub stage: ScanStage,
    pub message: String,
    pub hosts_done: usize,
    pub hosts_total: usize,
    pub devices_found: usize,
    pub elapsed_secs: f64,
}

/// Stages of the network scan process
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanStage {
    ResolvingRange,
    Probing,
    Complete,
}

/// Callback type for scan progress updates
pub type ProgressCallback = Box<dyn Fn(ScanProgress) + Send + Sync>;

/// Discovers live hosts on a network.
pub struct NetworkScanner {
    config: ScanConfig,
    prober: Arc<dyn Prober>,
}

impl NetworkScanner {
    pub fn new(config: ScanConfig, prober: Arc<dyn Prober>) -> Self {
        Self { config, prober }
    }

    /// Scanner that shells out to the platform's network utilities.
    pub fn system(config: ScanConfig) -> Self {
        Self::new(config, Arc::new(SystemProber))
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan the requested range and report the live hosts.
    pub async fn scan(&self, request: ScanRequest) -> Result<DiscoveryReport, ScanError> {
        self.scan_with_progress(request, None).await
    }

    /// Scan with progress callbacks.
    ///
    /// Fails only when the range is malformed, before any host is probed.
    pub async fn scan_with_progress(
        &self,
        request: ScanRequest,
        on_progress: Option<ProgressCallback>,
    ) -> Result<DiscoveryReport, ScanError> {
        let scan_id = Uuid::new_v4();
        let started_at = Utc::now();
        let scan_start = Instant::now();

        let emit_progress = |stage: ScanStage, message: &str, done: usize, total: usize, found: usize| {
            if let Some(ref callback) = on_progress {
                callback(ScanProgress {
                    stage,
                    message: message.to_string(),
                    hosts_done: done,
                    hosts_total: total,
                    devices_found: found,
                    elapsed_secs: scan_start.elapsed().as_secs_f64(),
                });
            }
        };

        emit_progress(ScanStage::ResolvingRange, "Resolving network range...", 0, 0, 0);

        let requested = request.range().or(self.config.default_range.as_deref());
        let network = RangeResolver::new(self.config.fallback_range).resolve(requested)?;
        let enumeration = enumerate_hosts(network, MAX_SCAN_HOSTS);
        let total = enumeration.hosts.len();

        tracing::info!(
            "Starting network scan {} for range: {} ({} hosts, timeout {}s)",
            scan_id,
            network,
            total,
            request.per_host_timeout().as_secs()
        );
        emit_progress(
            ScanStage::Probing,
            &format!("Probing {} hosts in {}", total, network),
            0,
            total,
            0,
        );

        let pool = ConcurrentProber::new(
            self.prober.clone(),
            ProbeTimeouts::new(request.per_host_timeout()),
        );
        let mut found = 0;
        let devices = pool
            .probe_all_with(&enumeration.hosts, |done, result| {
                let message = match result {
                    Some(result) => {
                        found += 1;
                        format!("{} is up", result.address)
                    }
                    None => "No reply".to_string(),
                };
                emit_progress(ScanStage::Probing, &message, done, total, found);
                if done == total {
                    emit_progress(ScanStage::Probing, "All hosts probed", done, total, found);
                }
            })
            .await;

        let report = DiscoveryReport::assemble(
            scan_id,
            network,
            &enumeration,
            devices,
            started_at,
            Utc::now(),
        );

        tracing::info!(
            "Network scan completed in {:.2}s. Found {} devices.",
            report.scan_duration_seconds,
            report.device_count
        );
        emit_progress(
            ScanStage::Complete,
            &format!(
                "Scan complete: {} devices found in {:.1}s",
                report.device_count, report.scan_duration_seconds
            ),
            total,
            total,
            report.device_count,
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_timeout_bounds() {
        assert!(ScanRequest::new(None, 1).is_ok());
        assert!(ScanRequest::new(None, 30).is_ok());
        assert_eq!(
            ScanRequest::new(None, 0),
            Err(ScanError::InvalidTimeout(0))
        );
        assert_eq!(
            ScanRequest::new(Some("10.0.0.0/24".into()), 31),
            Err(ScanError::InvalidTimeout(31))
        );
    }

    #[test]
    fn test_request_from_config() {
        let config = ScanConfig {
            default_range: Some("10.4.0.0/24".to_string()),
            per_host_timeout_secs: 9,
            ..ScanConfig::default()
        };
        let request = ScanRequest::from_config(&config).unwrap();
        assert_eq!(request.range(), Some("10.4.0.0/24"));
        assert_eq!(request.per_host_timeout(), Duration::from_secs(9));
    }
}
