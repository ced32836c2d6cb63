//! Netsurvey CLI - find the live hosts on a network
//!
//! This binary can:
//! - Scan a network range (or the local /24) for reachable hosts
//! - Keep discovered devices in a local device store
//! - Run as a background daemon that rescans periodically

mod daemon;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use netsurvey_core::config::{self, ScanConfig};
use netsurvey_core::{
    DeviceStore, DiscoveryReport, JsonDeviceStore, NetworkScanner, ProgressCallback,
    ScanProgress, ScanRequest,
};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "netsurvey")]
#[command(version)]
#[command(about = "Discover the live hosts on a network")]
#[command(long_about = "
Netsurvey pings every host in a network range (at most 254 per scan,
20 at a time) and reports the ones that answer, with their hostname
and MAC address when those can be resolved.

Quick start:
  1. Scan the local network:   netsurvey scan
  2. Scan a specific range:    netsurvey scan --range 10.0.0.0/24
  3. Show known devices:       netsurvey devices
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Read configuration from this file instead of the default location
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a network scan
    Scan {
        /// Network range in CIDR form (default: configured range or local /24)
        #[arg(short, long)]
        range: Option<String>,

        /// Per-host ping timeout in seconds (1-30)
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Do not save discovered devices to the device store
        #[arg(long)]
        no_save: bool,
    },

    /// List devices in the device store
    Devices {
        /// Show only the device at this address
        #[arg(short, long, conflicts_with = "id")]
        address: Option<Ipv4Addr>,

        /// Show only the device with this id
        #[arg(long)]
        id: Option<Uuid>,
    },

    /// Run as a background scanning daemon
    Daemon {
        /// Scan interval in minutes
        #[arg(short, long, default_value = "5")]
        interval: u64,
    },

    /// Show configuration paths and settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("netsurvey={},netsurvey_core={}", log_level, log_level).into()
            }),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => ScanConfig::load_from(path)?,
        None => ScanConfig::load(),
    };

    match cli.command {
        Commands::Scan {
            ref range,
            timeout,
            no_save,
        } => cmd_scan(&cli, config, range.clone(), timeout, !no_save).await,
        Commands::Devices { address, id } => cmd_devices(&cli, &config, address, id),
        Commands::Daemon { interval } => daemon::run_daemon(config, interval).await,
        Commands::Config => cmd_config(&cli, &config),
    }
}

async fn cmd_scan(
    cli: &Cli,
    config: ScanConfig,
    range: Option<String>,
    timeout: Option<u64>,
    save: bool,
) -> Result<()> {
    let request = ScanRequest::new(
        range.or_else(|| config.default_range.clone()),
        timeout.unwrap_or(config.per_host_timeout_secs),
    )?;
    let store = JsonDeviceStore::new(&config.store_path);
    let scanner = NetworkScanner::system(config);

    // Create progress callback for text mode
    let progress_callback: Option<ProgressCallback> = match cli.format {
        OutputFormat::Text => Some(Box::new(|progress: ScanProgress| {
            if progress.hosts_total > 0 {
                eprintln!(
                    "  [{:>3}/{:>3}] {}",
                    progress.hosts_done, progress.hosts_total, progress.message
                );
            } else {
                eprintln!("  {}", progress.message);
            }
        })),
        OutputFormat::Json => None,
    };

    let report = scanner
        .scan_with_progress(request, progress_callback)
        .await
        .context("Network scan failed")?;

    let saved = save && save_report(&store, &report);

    match cli.format {
        OutputFormat::Text => print_report(&report),
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "report": report,
                    "saved": saved,
                })
            );
        }
    }

    Ok(())
}

/// Persist a report; failures are logged and never fail the scan.
///
/// Returns `true` only when the devices were saved and every unseen device
/// was marked offline.
pub(crate) fn save_report(store: &dyn DeviceStore, report: &DiscoveryReport) -> bool {
    if let Err(e) = store.save_discovered(&report.devices) {
        tracing::error!("Failed to save devices to device store: {:#}", e);
        return false;
    }

    let seen: Vec<_> = report.devices.iter().map(|d| d.address).collect();
    match store.mark_offline_except(&seen) {
        Ok(_) => true,
        Err(e) => {
            tracing::error!("Failed to mark unseen devices offline: {:#}", e);
            false
        }
    }
}

fn print_report(report: &DiscoveryReport) {
    println!();
    println!(
        "Found {} devices in {} ({:.1}s):",
        report.device_count, report.range, report.scan_duration_seconds
    );
    if report.truncated {
        println!("  (range truncated to the first {} hosts)", report.hosts_scanned);
    }
    println!();
    for device in &report.devices {
        let hostname = device.hostname.as_deref().unwrap_or("-");
        let mac = device
            .mac_address
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".to_string());
        let time_str = device
            .response_time_ms
            .map(|t| format!("{:.1}ms", t))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "  {:15} {:>8}  {:17}  {}",
            device.address, time_str, mac, hostname
        );
    }
}

fn cmd_devices(
    cli: &Cli,
    config: &ScanConfig,
    address: Option<Ipv4Addr>,
    id: Option<Uuid>,
) -> Result<()> {
    let store = JsonDeviceStore::new(&config.store_path);

    if address.is_some() || id.is_some() {
        let device = match (address, id) {
            (Some(address), _) => store.get(address)?,
            (None, Some(id)) => store.get_by_id(id)?,
            (None, None) => None,
        };
        let Some(device) = device else {
            let wanted = address
                .map(|a| a.to_string())
                .or_else(|| id.map(|i| i.to_string()))
                .unwrap_or_default();
            bail!("No stored device matches {}", wanted);
        };

        match cli.format {
            OutputFormat::Text => {
                println!("Device {}", device.id);
                println!("  Address:        {}", device.address);
                println!("  Hostname:       {}", device.hostname.as_deref().unwrap_or("-"));
                println!(
                    "  MAC address:    {}",
                    device
                        .mac_address
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
                println!("  Status:         {}", device.status);
                println!(
                    "  Response time:  {}",
                    device
                        .last_response_time_ms
                        .map(|t| format!("{:.1}ms", t))
                        .unwrap_or_else(|| "-".to_string())
                );
                println!(
                    "  First seen:     {}",
                    device.first_discovered.format("%Y-%m-%d %H:%M:%S UTC")
                );
                println!(
                    "  Last seen:      {}",
                    device.last_seen.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
            OutputFormat::Json => {
                println!("{}", serde_json::json!({ "device": device }));
            }
        }
        return Ok(());
    }

    let devices = store.list()?;

    match cli.format {
        OutputFormat::Text => {
            if devices.is_empty() {
                println!("No devices stored yet. Run 'netsurvey scan' first.");
                return Ok(());
            }
            println!("{} devices in {}:", devices.len(), store.path().display());
            println!();
            for device in &devices {
                println!(
                    "  {:15} {:8} {:17}  {:24} last seen {}",
                    device.address,
                    device.status.to_string(),
                    device
                        .mac_address
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    device.hostname.as_deref().unwrap_or("-"),
                    device.last_seen.format("%Y-%m-%d %H:%M:%S UTC"),
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "devices": devices }));
        }
    }

    Ok(())
}

fn cmd_config(cli: &Cli, config: &ScanConfig) -> Result<()> {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(config::get_config_file_path_string);

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration");
            println!("=============");
            println!();
            println!("Config file:      {}", config_path);
            println!("Settings from:    {}", config.source);
            println!(
                "Scan range:       {}",
                config.default_range.as_deref().unwrap_or("auto-detect (local /24)")
            );
            println!("Fallback range:   {}", config.fallback_range);
            println!("Per-host timeout: {}s", config.per_host_timeout_secs);
            println!("Device store:     {}", config.store_path.display());
            println!();
            println!("Environment variables:");
            println!("  NETSURVEY_RANGE   - Override scan range");
            println!("  NETSURVEY_TIMEOUT - Override per-host timeout");
            println!("  NETSURVEY_STORE   - Override device store path");
            println!();
            println!("Example config.toml:");
            println!();
            println!("{}", config::generate_example_config());
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "config_file": config_path,
                    "source": config.source.to_string(),
                    "range": config.default_range,
                    "fallback_range": config.fallback_range.to_string(),
                    "timeout": config.per_host_timeout_secs,
                    "store_path": config.store_path.display().to_string(),
                })
            );
        }
    }

    Ok(())
}
