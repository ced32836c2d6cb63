//! Scanner configuration.
//!
//! Built once at process start and handed to [`crate::scanner::NetworkScanner`].
//! Values come from, in priority order:
//! 1. Environment variables (`NETSURVEY_RANGE`, `NETSURVEY_TIMEOUT`, `NETSURVEY_STORE`)
//! 2. Config file (`~/.config/netsurvey/config.toml`)
//! 3. Default values

use anyhow::{Context, Result};
use ipnetwork::Ipv4Network;
use serde::Deserialize;
use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Maximum number of host pipelines executing at once.
pub const MAX_CONCURRENT_PROBES: usize = 20;

/// Upper bound on the number of addresses probed by a single scan.
pub const MAX_SCAN_HOSTS: usize = 254;

/// Extra time allowed for the ping subprocess beyond the nominal timeout.
pub const REACHABILITY_GRACE: Duration = Duration::from_secs(2);

pub const HOSTNAME_TIMEOUT: Duration = Duration::from_secs(2);

pub const NEIGHBOR_TIMEOUT: Duration = Duration::from_secs(3);

pub const DEFAULT_PER_HOST_TIMEOUT_SECS: u64 = 5;

const FALLBACK_NETWORK: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 0);
const FALLBACK_PREFIX: u8 = 24;

/// Range scanned when neither the caller nor the local interface provides one.
pub fn default_fallback_range() -> Ipv4Network {
    Ipv4Network::new(FALLBACK_NETWORK, FALLBACK_PREFIX)
        .unwrap_or_else(|_| Ipv4Network::from(FALLBACK_NETWORK))
}

const ENV_RANGE: &str = "NETSURVEY_RANGE";
const ENV_TIMEOUT: &str = "NETSURVEY_TIMEOUT";
const ENV_STORE: &str = "NETSURVEY_STORE";

const STORE_FILE: &str = "devices.json";

/// Configuration file structure
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    scan: Option<ScanSection>,
    store: Option<StoreSection>,
}

#[derive(Debug, Deserialize, Default)]
struct ScanSection {
    /// CIDR range scanned when a request does not name one
    range: Option<String>,
    /// Per-host reachability timeout in seconds
    timeout: Option<u64>,
    /// Range used when the local network cannot be detected
    fallback_range: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct StoreSection {
    path: Option<PathBuf>,
}

/// Where the configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// Using default hardcoded values
    Default,
    /// At least one value came from an environment variable
    Environment,
    /// Loaded from config file
    ConfigFile,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::ConfigFile => write!(f, "config file"),
        }
    }
}

/// Runtime scan configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Range used when a request leaves it out; `None` means auto-detect
    pub default_range: Option<String>,
    pub fallback_range: Ipv4Network,
    pub per_host_timeout_secs: u64,
    pub store_path: PathBuf,
    pub source: ConfigSource,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            default_range: None,
            fallback_range: default_fallback_range(),
            per_host_timeout_secs: DEFAULT_PER_HOST_TIMEOUT_SECS,
            store_path: default_store_path(),
            source: ConfigSource::Default,
        }
    }
}

impl ScanConfig {
    /// Load configuration from the environment and the config file.
    pub fn load() -> Self {
        let file = get_config_file_path().and_then(|path| load_config_file(&path));
        Self::from_sources(|key| std::env::var(key).ok(), file)
    }

    /// Load configuration from an explicit config file, still honouring the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let file: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(Self::from_sources(|key| std::env::var(key).ok(), Some(file)))
    }

    fn from_sources(env: impl Fn(&str) -> Option<String>, file: Option<ConfigFile>) -> Self {
        let mut config = ScanConfig::default();

        if let Some(file) = file {
            if let Some(scan) = file.scan {
                if let Some(range) = non_empty(scan.range) {
                    config.default_range = Some(range);
                    config.source = ConfigSource::ConfigFile;
                }
                if let Some(timeout) = scan.timeout {
                    config.per_host_timeout_secs = timeout;
                    config.source = ConfigSource::ConfigFile;
                }
                if let Some(fallback) = non_empty(scan.fallback_range) {
                    match fallback.parse::<Ipv4Network>() {
                        Ok(network) => {
                            config.fallback_range =
                                Ipv4Network::new(network.network(), network.prefix())
                                    .unwrap_or(network);
                            config.source = ConfigSource::ConfigFile;
                        }
                        Err(e) => {
                            tracing::warn!("Ignoring invalid fallback_range '{}': {}", fallback, e)
                        }
                    }
                }
            }
            if let Some(path) = file.store.and_then(|s| s.path) {
                config.store_path = path;
                config.source = ConfigSource::ConfigFile;
            }
        }

        if let Some(range) = non_empty(env(ENV_RANGE)) {
            tracing::info!("Using scan range from environment variable: {}", range);
            config.default_range = Some(range);
            config.source = ConfigSource::Environment;
        }

        if let Some(raw) = non_empty(env(ENV_TIMEOUT)) {
            match raw.parse::<u64>() {
                Ok(timeout) => {
                    config.per_host_timeout_secs = timeout;
                    config.source = ConfigSource::Environment;
                }
                Err(_) => tracing::warn!("Ignoring non-numeric {}: '{}'", ENV_TIMEOUT, raw),
            }
        }

        if let Some(path) = non_empty(env(ENV_STORE)) {
            config.store_path = PathBuf::from(path);
            config.source = ConfigSource::Environment;
        }

        config
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Get the path to the configuration file
fn get_config_file_path() -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|p| p.join("netsurvey").join("config.toml"))
}

/// Load configuration from the config file
fn load_config_file(path: &Path) -> Option<ConfigFile> {
    if !path.exists() {
        return None;
    }

    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::debug!("Loaded config from {:?}", path);
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Failed to parse config file {:?}: {}", path, e);
                None
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read config file {:?}: {}", path, e);
            None
        }
    }
}

fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("netsurvey")
        .join(STORE_FILE)
}

/// Get the path to the config file for documentation purposes
pub fn get_config_file_path_string() -> String {
    get_config_file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "~/.config/netsurvey/config.toml".to_string())
}

/// Generate example config file content
pub fn generate_example_config() -> String {
    r#"# Netsurvey Configuration
# Place this file at: ~/.config/netsurvey/config.toml

[scan]
# Range scanned when none is given on the command line.
# Default: detected from the outbound interface, assuming a /24
# range = "192.168.1.0/24"

# Per-host ping timeout in seconds (1-30)
# timeout = 5

# Range used when the local network cannot be detected
# fallback_range = "192.168.1.0/24"

[store]
# Where discovered devices are kept
# path = "/var/lib/netsurvey/devices.json"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn parse_file(content: &str) -> ConfigFile {
        toml::from_str(content).unwrap()
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = ScanConfig::from_sources(env_from(&[]), None);
        assert_eq!(config.source, ConfigSource::Default);
        assert_eq!(config.default_range, None);
        assert_eq!(config.per_host_timeout_secs, DEFAULT_PER_HOST_TIMEOUT_SECS);
        assert_eq!(config.fallback_range.to_string(), "192.168.1.0/24");
    }

    #[test]
    fn test_config_file_values() {
        let file = parse_file(
            r#"
            [scan]
            range = "10.1.2.0/24"
            timeout = 3
            fallback_range = "172.16.5.9/24"

            [store]
            path = "/tmp/netsurvey-test/devices.json"
            "#,
        );
        let config = ScanConfig::from_sources(env_from(&[]), Some(file));
        assert_eq!(config.source, ConfigSource::ConfigFile);
        assert_eq!(config.default_range.as_deref(), Some("10.1.2.0/24"));
        assert_eq!(config.per_host_timeout_secs, 3);
        assert_eq!(config.fallback_range.to_string(), "172.16.5.0/24");
        assert_eq!(
            config.store_path,
            PathBuf::from("/tmp/netsurvey-test/devices.json")
        );
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = parse_file("[scan]\nrange = \"10.1.2.0/24\"\ntimeout = 3\n");
        let env = env_from(&[(ENV_RANGE, " 10.9.9.0/28 "), (ENV_TIMEOUT, "7")]);
        let config = ScanConfig::from_sources(env, Some(file));
        assert_eq!(config.source, ConfigSource::Environment);
        assert_eq!(config.default_range.as_deref(), Some("10.9.9.0/28"));
        assert_eq!(config.per_host_timeout_secs, 7);
    }

    #[test]
    fn test_bad_values_are_ignored() {
        let file = parse_file("[scan]\nfallback_range = \"not-a-range\"\n");
        let env = env_from(&[(ENV_TIMEOUT, "soon"), (ENV_RANGE, "   ")]);
        let config = ScanConfig::from_sources(env, Some(file));
        assert_eq!(config.source, ConfigSource::Default);
        assert_eq!(config.fallback_range, default_fallback_range());
        assert_eq!(config.per_host_timeout_secs, DEFAULT_PER_HOST_TIMEOUT_SECS);
        assert_eq!(config.default_range, None);
    }

    #[test]
    fn test_example_config_parses() {
        let file: ConfigFile = toml::from_str(&generate_example_config()).unwrap();
        assert!(file.scan.is_some());
        assert!(file.store.is_some());
    }
}
