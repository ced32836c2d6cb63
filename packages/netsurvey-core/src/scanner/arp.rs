//! Neighbor (ARP) table lookup using system commands

use super::command::{hidden_command, run_bounded};
use super::mac::{find_mac_address, MacAddress};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Query the local neighbor table for the hardware address of `target`.
pub(crate) async fn lookup_neighbor(target: Ipv4Addr, timeout: Duration) -> Option<MacAddress> {
    let mut cmd = hidden_command("arp");
    cmd.args(arp_args(target));

    let output = match run_bounded(cmd, timeout).await {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!("MAC address lookup failed for {}: {}", target, e);
            return None;
        }
    };

    if !output.status.success() {
        tracing::debug!("arp exited with {} for {}", output.status, target);
        return None;
    }

    find_mac_address(&String::from_utf8_lossy(&output.stdout))
}

pub(crate) fn arp_args(target: Ipv4Addr) -> Vec<String> {
    #[cfg(target_os = "windows")]
    let flag = "-a";

    #[cfg(not(target_os = "windows"))]
    let flag = "-n";

    vec![flag.to_string(), target.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arp_args_name_target() {
        let args = arp_args(Ipv4Addr::new(192, 168, 1, 7));
        assert_eq!(args.len(), 2);
        assert_eq!(args[1], "192.168.1.7");
        #[cfg(target_os = "windows")]
        assert_eq!(args[0], "-a");
        #[cfg(not(target_os = "windows"))]
        assert_eq!(args[0], "-n");
    }
}
