//! Background daemon mode for continuous network scanning
//!
//! Scans the configured range on a fixed interval, keeps the device store
//! up to date, and stops cleanly on Ctrl+C or SIGTERM.

use crate::save_report;
use anyhow::{bail, Result};
use netsurvey_core::config::ScanConfig;
use netsurvey_core::{JsonDeviceStore, NetworkScanner, ScanRequest};
use std::future::Future;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Run the background scanning daemon
pub async fn run_daemon(config: ScanConfig, interval_minutes: u64) -> Result<()> {
    if interval_minutes == 0 {
        bail!("Scan interval must be at least 1 minute");
    }

    // Validate once up front; a bad timeout would fail every cycle
    let request = ScanRequest::from_config(&config)?;
    let store = JsonDeviceStore::new(&config.store_path);

    tracing::info!(
        "Starting daemon: scanning {} every {} minutes, saving to {}",
        config.default_range.as_deref().unwrap_or("the local network"),
        interval_minutes,
        store.path().display()
    );

    let scanner = NetworkScanner::system(config);

    let cycles = run_cycles(
        Duration::from_secs(interval_minutes * 60),
        || run_scan_and_save(&scanner, &store, request.clone()),
        shutdown_signal(),
    )
    .await;

    tracing::debug!("Daemon ran {} scan cycles", cycles);
    tracing::info!("Daemon stopped");
    Ok(())
}

/// Run `cycle` now and then once per `period` until `shutdown` resolves,
/// abandoning a cycle that is still running at that point. Returns the
/// number of cycles started.
async fn run_cycles<F, Fut>(
    period: Duration,
    mut cycle: F,
    shutdown: impl Future<Output = ()>,
) -> usize
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut scan_interval = interval(period);
    // A long scan should not trigger a burst of catch-up scans
    scan_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::pin!(shutdown);
    let mut started = 0;

    // The first tick completes immediately, giving the initial scan
    loop {
        tokio::select! {
            _ = scan_interval.tick() => {
                started += 1;
                tokio::select! {
                    _ = cycle() => {}
                    _ = &mut shutdown => {
                        tracing::info!("Abandoning scan in progress");
                        break;
                    }
                }
            }
            _ = &mut shutdown => break,
        }
    }

    started
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Run one scan and save its devices. Errors are logged, never fatal.
async fn run_scan_and_save(scanner: &NetworkScanner, store: &JsonDeviceStore, request: ScanRequest) {
    tracing::info!("Starting network scan...");

    let report = match scanner.scan(request).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Scan failed: {}", e);
            return;
        }
    };

    tracing::info!(
        "Scan {} complete: {} devices found in {:.1}s",
        report.scan_id,
        report.device_count,
        report.scan_duration_seconds
    );

    if save_report(store, &report) {
        tracing::debug!("Device store updated");
    }
}
