//! Reachability check using the system ping command

use super::command::{hidden_command, run_bounded};
use super::prober::Reachability;
use crate::config::REACHABILITY_GRACE;
use std::net::Ipv4Addr;
use std::process::Output;
use std::time::{Duration, Instant};

/// Send a single echo request to `target` and wait up to `timeout` for the reply.
pub(crate) async fn ping_host(target: Ipv4Addr, timeout: Duration) -> Reachability {
    let mut cmd = hidden_command("ping");
    cmd.args(ping_args(target, timeout));

    let start = Instant::now();
    match run_bounded(cmd, timeout + REACHABILITY_GRACE).await {
        Ok(output) => {
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            if reply_received(&output) {
                Reachability::Reachable { elapsed_ms }
            } else {
                Reachability::Unreachable
            }
        }
        Err(e) => {
            tracing::debug!("Ping failed for {}: {}", target, e);
            Reachability::Unreachable
        }
    }
}

/// One packet, with the timeout in the unit the platform's ping expects.
pub(crate) fn ping_args(target: Ipv4Addr, timeout: Duration) -> Vec<String> {
    let secs = timeout.as_secs().max(1);

    #[cfg(target_os = "windows")]
    let args = vec![
        "-n".to_string(),
        "1".to_string(),
        "-w".to_string(),
        (secs * 1000).to_string(),
        target.to_string(),
    ];

    // BSD ping takes -W in milliseconds; -t bounds the whole run in seconds.
    #[cfg(target_os = "macos")]
    let args = vec![
        "-c".to_string(),
        "1".to_string(),
        "-t".to_string(),
        secs.to_string(),
        target.to_string(),
    ];

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let args = vec![
        "-c".to_string(),
        "1".to_string(),
        "-W".to_string(),
        secs.to_string(),
        target.to_string(),
    ];

    args
}

fn reply_received(output: &Output) -> bool {
    if !output.status.success() {
        return false;
    }

    // Windows ping exits 0 when a router answers "destination host unreachable".
    #[cfg(target_os = "windows")]
    {
        let output_lower = String::from_utf8_lossy(&output.stdout).to_lowercase();
        if output_lower.contains("request timed out")
            || output_lower.contains("destination host unreachable")
            || output_lower.contains("transmit failed")
            || output_lower.contains("general failure")
        {
            return false;
        }
        if !output_lower.contains("reply from") {
            return false;
        }
    }

    true
}
