//! Device store for saving discovered hosts between scans.
//!
//! Devices are keyed by address. A scan refreshes the devices it saw and can
//! mark the rest offline.

use crate::report::HostProbeResult;
use crate::scanner::MacAddress;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Online,
    Offline,
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceStatus::Online => write!(f, "online"),
            DeviceStatus::Offline => write!(f, "offline"),
        }
    }
}

/// A device as remembered across scans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDevice {
    pub id: Uuid,
    pub address: Ipv4Addr,
    pub hostname: Option<String>,
    pub mac_address: Option<MacAddress>,
    pub status: DeviceStatus,
    pub last_response_time_ms: Option<f64>,
    pub first_discovered: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredDevice {
    fn from_discovery(device: &HostProbeResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            address: device.address,
            hostname: device.hostname.clone(),
            mac_address: device.mac_address,
            status: DeviceStatus::Online,
            last_response_time_ms: device.response_time_ms,
            first_discovered: device.discovered_at,
            last_seen: device.discovered_at,
            updated_at: Utc::now(),
        }
    }

    fn refresh(&mut self, device: &HostProbeResult) {
        self.hostname = device.hostname.clone();
        self.mac_address = device.mac_address;
        self.last_response_time_ms = device.response_time_ms;
        self.status = DeviceStatus::Online;
        self.last_seen = device.discovered_at;
        self.updated_at = Utc::now();
    }
}

/// Where scan results end up.
pub trait DeviceStore: Send + Sync {
    /// Insert or refresh each device; returns how many were written.
    fn save_discovered(&self, devices: &[HostProbeResult]) -> Result<usize>;

    /// Mark every online device not in `seen` as offline; returns how many changed.
    fn mark_offline_except(&self, seen: &[Ipv4Addr]) -> Result<usize>;

    /// All devices, ordered by address.
    fn list(&self) -> Result<Vec<StoredDevice>>;

    /// The device last seen at `address`, if any.
    fn get(&self, address: Ipv4Addr) -> Result<Option<StoredDevice>>;

    fn get_by_id(&self, id: Uuid) -> Result<Option<StoredDevice>>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    devices: Vec<StoredDevice>,
}

/// Device store kept in a single JSON file.
#[derive(Debug)]
pub struct JsonDeviceStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonDeviceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<StoreFile> {
        if !self.path.exists() {
            tracing::debug!("No device store at {:?}, starting empty", self.path);
            return Ok(StoreFile::default());
        }

        let content = std::fs::read_to_string(&self.path).context("Failed to read device store")?;
        serde_json::from_str(&content).context("Failed to parse device store")
    }

    fn save(&self, file: &StoreFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create device store directory")?;
        }

        let content = serde_json::to_string_pretty(file).context("Failed to serialize devices")?;
        std::fs::write(&self.path, content).context("Failed to write device store")?;

        tracing::debug!("Saved {} devices to {:?}", file.devices.len(), self.path);
        Ok(())
    }

    fn update<T>(&self, apply: impl FnOnce(&mut StoreFile) -> T) -> Result<T> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Device store lock poisoned"))?;
        let mut file = self.load()?;
        let out = apply(&mut file);
        self.save(&file)?;
        Ok(out)
    }
}

impl DeviceStore for JsonDeviceStore {
    fn save_discovered(&self, devices: &[HostProbeResult]) -> Result<usize> {
        let saved = self.update(|file| {
            for device in devices {
                match file.devices.iter_mut().find(|d| d.address == device.address) {
                    Some(existing) => existing.refresh(device),
                    None => file.devices.push(StoredDevice::from_discovery(device)),
                }
            }
            devices.len()
        })?;

        tracing::info!("Saved {} devices to device store", saved);
        Ok(saved)
    }

    fn mark_offline_except(&self, seen: &[Ipv4Addr]) -> Result<usize> {
        let changed = self.update(|file| {
            let now = Utc::now();
            let mut changed = 0;
            for device in file
                .devices
                .iter_mut()
                .filter(|d| d.status == DeviceStatus::Online && !seen.contains(&d.address))
            {
                device.status = DeviceStatus::Offline;
                device.last_response_time_ms = None;
                device.updated_at = now;
                changed += 1;
            }
            changed
        })?;

        if changed > 0 {
            tracing::info!("Marked {} devices as offline", changed);
        }
        Ok(changed)
    }

    fn list(&self) -> Result<Vec<StoredDevice>> {
        let mut devices = self.load()?.devices;
        devices.sort_by_key(|d| d.address);
        Ok(devices)
    }

    fn get(&self, address: Ipv4Addr) -> Result<Option<StoredDevice>> {
        Ok(self
            .load()?
            .devices
            .into_iter()
            .find(|d| d.address == address))
    }

    fn get_by_id(&self, id: Uuid) -> Result<Option<StoredDevice>> {
        Ok(self.load()?.devices.into_iter().find(|d| d.id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Store in a fresh temp directory, removed on drop.
    struct TempStore {
        dir: PathBuf,
        store: JsonDeviceStore,
    }

    impl std::ops::Deref for TempStore {
        type Target = JsonDeviceStore;

        fn deref(&self) -> &JsonDeviceStore {
            &self.store
        }
    }

    impl Drop for TempStore {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    fn temp_store() -> TempStore {
        let dir = std::env::temp_dir().join(format!("netsurvey-store-{}", Uuid::new_v4()));
        let store = JsonDeviceStore::new(dir.join("nested").join("devices.json"));
        TempStore { dir, store }
    }

    fn live(last_octet: u8, hostname: Option<&str>) -> HostProbeResult {
        HostProbeResult::reachable(
            Ipv4Addr::new(192, 168, 1, last_octet),
            2.0,
            hostname.map(str::to_string),
            None,
        )
    }

    #[test]
    fn test_missing_file_lists_empty() {
        let store = temp_store();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_save_creates_file_and_orders_by_address() {
        let store = temp_store();
        let saved = store
            .save_discovered(&[live(20, None), live(3, Some("nas"))])
            .unwrap();
        assert_eq!(saved, 2);
        assert!(store.path().exists());

        let devices = store.list().unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].address, Ipv4Addr::new(192, 168, 1, 3));
        assert_eq!(devices[0].hostname.as_deref(), Some("nas"));
        assert_eq!(devices[0].status, DeviceStatus::Online);
    }

    #[test]
    fn test_resave_updates_in_place() {
        let store = temp_store();
        store.save_discovered(&[live(5, Some("old"))]).unwrap();
        let first = store.list().unwrap()[0].clone();

        let mut again = live(5, Some("new"));
        again.mac_address = Some(MacAddress::new([0xde, 0xad, 0xbe, 0xef, 0, 1]));
        again.response_time_ms = Some(9.25);
        store.save_discovered(&[again]).unwrap();

        let devices = store.list().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, first.id);
        assert_eq!(devices[0].first_discovered, first.first_discovered);
        assert_eq!(devices[0].hostname.as_deref(), Some("new"));
        assert_eq!(devices[0].last_response_time_ms, Some(9.25));
        assert!(devices[0].mac_address.is_some());
    }

    #[test]
    fn test_mark_offline_except_seen() {
        let store = temp_store();
        store
            .save_discovered(&[live(1, None), live(2, None), live(3, None)])
            .unwrap();

        let changed = store
            .mark_offline_except(&[Ipv4Addr::new(192, 168, 1, 2)])
            .unwrap();
        assert_eq!(changed, 2);

        let devices = store.list().unwrap();
        assert_eq!(devices[0].status, DeviceStatus::Offline);
        assert_eq!(devices[0].last_response_time_ms, None);
        assert_eq!(devices[1].status, DeviceStatus::Online);

        // already offline devices are not counted twice
        assert_eq!(
            store
                .mark_offline_except(&[Ipv4Addr::new(192, 168, 1, 2)])
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_get_by_address_and_id() {
        let store = temp_store();
        store
            .save_discovered(&[live(4, Some("printer")), live(9, None)])
            .unwrap();

        let printer = store
            .get(Ipv4Addr::new(192, 168, 1, 4))
            .unwrap()
            .unwrap();
        assert_eq!(printer.hostname.as_deref(), Some("printer"));

        let same = store.get_by_id(printer.id).unwrap().unwrap();
        assert_eq!(same, printer);

        assert!(store.get(Ipv4Addr::new(192, 168, 1, 200)).unwrap().is_none());
        assert!(store.get_by_id(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_get_on_missing_file_is_none() {
        let store = temp_store();
        assert!(store.get(Ipv4Addr::new(10, 0, 0, 1)).unwrap().is_none());
    }

    #[test]
    fn test_temp_dir_removed_on_drop() {
        let store = temp_store();
        store.save_discovered(&[live(1, None)]).unwrap();
        let dir = store.dir.clone();
        assert!(dir.exists());
        drop(store);
        assert!(!dir.exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let store = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{ not json").unwrap();
        assert!(store.list().is_err());
        assert!(store.save_discovered(&[live(1, None)]).is_err());
    }
}
