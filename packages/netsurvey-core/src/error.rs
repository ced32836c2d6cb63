//! Errors that can abort a scan before any host is probed.
//!
//! Per-host failures never surface as errors. They show up as missing devices
//! or `None` fields in the report.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("invalid network range '{range}': {reason}")]
    InvalidRange { range: String, reason: String },

    #[error("per-host timeout must be between 1 and 30 seconds, got {0}")]
    InvalidTimeout(u64),
}

impl ScanError {
    pub(crate) fn invalid_range(range: &str, reason: impl Into<String>) -> Self {
        ScanError::InvalidRange {
            range: range.to_string(),
            reason: reason.into(),
        }
    }
}
