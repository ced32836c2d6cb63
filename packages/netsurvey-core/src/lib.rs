//! Netsurvey Core Library
//!
//! Finds the live hosts on a network:
//! - Range resolution (explicit CIDR, or the local /24 with a fallback)
//! - Bounded concurrent ping sweep (at most 20 hosts in flight, 254 per scan)
//! - Best-effort hostname and MAC address resolution for each live host
//! - A JSON file device store for keeping results between scans
//!
//! # Example
//!
//! ```no_run
//! use netsurvey_core::{NetworkScanner, ScanConfig, ScanRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ScanConfig::load();
//!     let scanner = NetworkScanner::system(config);
//!
//!     let request = ScanRequest::new(Some("192.168.1.0/24".to_string()), 2)?;
//!     let report = scanner.scan(request).await?;
//!     println!("Found {} devices", report.device_count);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod report;
pub mod scanner;
pub mod store;

// Re-export commonly used types
pub use config::{ConfigSource, ScanConfig};
pub use error::ScanError;
pub use report::{DiscoveryReport, HostProbeResult};
pub use scanner::{
    MacAddress, NetworkScanner, Prober, ProgressCallback, Reachability, ScanProgress, ScanRequest,
    ScanStage, SystemProber,
};
pub use store::{DeviceStatus, DeviceStore, JsonDeviceStore, StoredDevice};
