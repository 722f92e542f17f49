//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] (the postcard-encoded [`BridgeConfig`] blob)
//! and [`StoragePort`] (small records such as the last reboot reason).
//!
//! - Configs are validated before they are written and again after they
//!   are read back, so a blob written by an older firmware with laxer
//!   ranges never reaches the control loop.
//! - On the device every operation opens the namespace through
//!   `EspNvs`, which commits on each write.
//! - On the host a `HashMap` keyed `namespace::key` stands in for flash.

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::{validate_config, BridgeConfig, STORAGE_NAMESPACE};

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{EspError, ESP_ERR_NVS_NOT_ENOUGH_SPACE};

#[cfg(not(target_os = "espidf"))]
use std::{cell::RefCell, collections::HashMap};

pub const CONFIG_KEY: &str = "bridgecfg";

/// Largest config blob accepted (URLs dominate the size).
pub const MAX_BLOB_SIZE: usize = 2048;

pub struct NvsAdapter {
    #[cfg(target_os = "espidf")]
    partition: EspDefaultNvsPartition,
    #[cfg(not(target_os = "espidf"))]
    store: RefCell<HashMap<String, Vec<u8>>>,
}

/// Decode a stored blob and check it against the current ranges.
pub fn decode_config(bytes: &[u8]) -> Result<BridgeConfig, ConfigError> {
    let cfg: BridgeConfig = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Validate and encode a config for storage.
pub fn encode_config(cfg: &BridgeConfig) -> Result<Vec<u8>, ConfigError> {
    validate_config(cfg)?;
    let bytes = postcard::to_allocvec(cfg).map_err(|_| ConfigError::IoError)?;
    if bytes.len() > MAX_BLOB_SIZE {
        return Err(ConfigError::ValidationFailed("config too large to store"));
    }
    Ok(bytes)
}

#[cfg(target_os = "espidf")]
impl NvsAdapter {
    pub fn new(partition: EspDefaultNvsPartition) -> Self {
        info!("NvsAdapter: ESP-IDF NVS");
        Self { partition }
    }

    fn open(&self, namespace: &str) -> Result<EspNvs<NvsDefault>, EspError> {
        EspNvs::new(self.partition.clone(), namespace, true)
    }

    fn storage_error(e: EspError) -> StorageError {
        if e.code() == ESP_ERR_NVS_NOT_ENOUGH_SPACE as i32 {
            StorageError::Full
        } else {
            warn!("NvsAdapter: NVS error {}", e);
            StorageError::IoError
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl NvsAdapter {
    pub fn new() -> Self {
        info!("NvsAdapter: simulation backend");
        Self {
            store: RefCell::new(HashMap::new()),
        }
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for NvsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<BridgeConfig, ConfigError> {
        let mut buf = vec![0u8; MAX_BLOB_SIZE];
        match self.read(STORAGE_NAMESPACE, CONFIG_KEY, &mut buf) {
            Ok(len) => {
                let cfg = decode_config(&buf[..len])?;
                info!("NvsAdapter: loaded config ({} bytes)", len);
                Ok(cfg)
            }
            Err(StorageError::NotFound) => {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(BridgeConfig::default())
            }
            Err(_) => Err(ConfigError::IoError),
        }
    }

    fn save(&self, config: &BridgeConfig) -> Result<(), ConfigError> {
        let bytes = encode_config(config)?;
        let result = {
            #[cfg(target_os = "espidf")]
            {
                self.open(STORAGE_NAMESPACE)
                    .and_then(|mut nvs| nvs.set_blob(CONFIG_KEY, &bytes))
                    .map_err(Self::storage_error)
            }
            #[cfg(not(target_os = "espidf"))]
            {
                self.store
                    .borrow_mut()
                    .insert(Self::composite_key(STORAGE_NAMESPACE, CONFIG_KEY), bytes.clone());
                Ok::<(), StorageError>(())
            }
        };
        match result {
            Ok(()) => {
                info!("NvsAdapter: config saved ({} bytes)", bytes.len());
                Ok(())
            }
            Err(StorageError::Full) => Err(ConfigError::StorageFull),
            Err(_) => Err(ConfigError::IoError),
        }
    }
}

#[cfg(target_os = "espidf")]
impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let nvs = self.open(namespace).map_err(Self::storage_error)?;
        match nvs.get_blob(key, buf) {
            Ok(Some(data)) => Ok(data.len()),
            Ok(None) => Err(StorageError::NotFound),
            Err(e) => Err(Self::storage_error(e)),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let mut nvs = self.open(namespace).map_err(Self::storage_error)?;
        nvs.set_blob(key, data).map_err(Self::storage_error)
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let mut nvs = self.open(namespace).map_err(Self::storage_error)?;
        nvs.remove(key).map(|_| ()).map_err(Self::storage_error)
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.open(namespace)
            .and_then(|nvs| nvs.contains(key))
            .unwrap_or(false)
    }
}

#[cfg(not(target_os = "espidf"))]
impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let store = self.store.borrow();
        let data = store
            .get(&Self::composite_key(namespace, key))
            .ok_or(StorageError::NotFound)?;
        if data.len() > buf.len() {
            return Err(StorageError::IoError);
        }
        buf[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.store
            .borrow_mut()
            .insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store.borrow_mut().remove(&Self::composite_key(namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.store
            .borrow()
            .contains_key(&Self::composite_key(namespace, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_loads_defaults() {
        let nvs = NvsAdapter::new();
        assert_eq!(nvs.load(), Ok(BridgeConfig::default()));
    }

    #[test]
    fn saved_config_survives_reload() {
        let nvs = NvsAdapter::new();
        let mut cfg = BridgeConfig::default();
        cfg.relays[0].on_url = "http://10.0.0.9/on".into();
        cfg.debounce_ms = 120;
        nvs.save(&cfg).unwrap();
        assert_eq!(nvs.load(), Ok(cfg));
    }

    #[test]
    fn invalid_config_not_persisted() {
        let nvs = NvsAdapter::new();
        let mut cfg = BridgeConfig::default();
        cfg.bell_honk_ms = 1;
        assert!(matches!(nvs.save(&cfg), Err(ConfigError::ValidationFailed(_))));
        assert!(!nvs.exists(STORAGE_NAMESPACE, CONFIG_KEY));
    }

    #[test]
    fn garbage_blob_reported_corrupted() {
        let mut nvs = NvsAdapter::new();
        nvs.write(STORAGE_NAMESPACE, CONFIG_KEY, &[0xFF; 7]).unwrap();
        assert_eq!(nvs.load(), Err(ConfigError::Corrupted));
    }

    #[test]
    fn out_of_range_blob_rejected_on_load() {
        let mut nvs = NvsAdapter::new();
        let mut cfg = BridgeConfig::default();
        cfg.http_timeout_ms = 10;
        let bytes = postcard::to_allocvec(&cfg).unwrap();
        nvs.write(STORAGE_NAMESPACE, CONFIG_KEY, &bytes).unwrap();
        assert!(matches!(nvs.load(), Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn storage_records_round_trip_and_delete() {
        let mut nvs = NvsAdapter::new();
        nvs.write("ns", "k", &[1, 2, 3]).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(nvs.read("ns", "k", &mut buf), Ok(3));
        assert_eq!(&buf[..3], &[1, 2, 3]);
        nvs.delete("ns", "k").unwrap();
        assert_eq!(nvs.read("ns", "k", &mut buf), Err(StorageError::NotFound));
        assert!(nvs.delete("ns", "k").is_ok());
    }
}
