//! Reverse hostname resolution through the system resolver tools.

use super::command::{hidden_command, run_bounded};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Best-effort reverse lookup of `target`. Each helper gets the full
/// `timeout`; the probe pipeline bounds the total.
pub(crate) async fn resolve_hostname(target: Ipv4Addr, timeout: Duration) -> Option<String> {
    let ip = target.to_string();

    #[cfg(not(target_os = "windows"))]
    {
        // Method 1: getent hosts (honours /etc/hosts and NSS)
        if let Some(out) = run_lookup("getent", &["hosts", ip.as_str()], timeout).await {
            if let Some(hostname) = parse_getent_output(&out, &ip) {
                return Some(hostname);
            }
        }

        // Method 2: host command (PTR query)
        if let Some(out) = run_lookup("host", &[ip.as_str()], timeout).await {
            if let Some(hostname) = parse_host_output(&out) {
                return Some(hostname);
            }
        }
    }

    #[cfg(target_os = "windows")]
    {
        let script = format!(
            "try {{ (Resolve-DnsName -Name '{}' -Type PTR -ErrorAction Stop).NameHost }} catch {{ }}",
            ip
        );
        if let Some(out) = run_lookup(
            "powershell",
            &["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command", script.as_str()],
            timeout,
        )
        .await
        {
            let name = out.lines().next().unwrap_or("").trim();
            if !name.is_empty() && !name.contains("error") && name != ip {
                return Some(name.trim_end_matches('.').to_string());
            }
        }
    }

    None
}

async fn run_lookup(program: &str, args: &[&str], timeout: Duration) -> Option<String> {
    let mut cmd = hidden_command(program);
    cmd.args(args);

    match run_bounded(cmd, timeout).await {
        Ok(output) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Hostname lookup via {} failed: {}", program, e);
            None
        }
    }
}

/// `getent hosts` prints `<address> <canonical name> [aliases...]`.
#[cfg_attr(target_os = "windows", allow(dead_code))]
fn parse_getent_output(output: &str, ip: &str) -> Option<String> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let addr = fields.next()?;
            let name = fields.next()?;
            (addr == ip).then_some(name)
        })
        .map(|name| name.trim_end_matches('.'))
        .find(|name| !name.is_empty() && *name != ip)
        .map(str::to_string)
}

/// `host` prints `<reversed>.in-addr.arpa domain name pointer <name>.`
#[cfg_attr(target_os = "windows", allow(dead_code))]
fn parse_host_output(output: &str) -> Option<String> {
    output
        .lines()
        .filter_map(|line| line.split("pointer").nth(1))
        .map(|name| name.trim().trim_end_matches('.'))
        .find(|name| !name.is_empty())
        .map(str::to_string)
}
