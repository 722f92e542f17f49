//! Mock port adapters for integration tests.
//!
//! Every adapter records what the service asked of it so tests can assert
//! on the full history without GPIO, sockets or flash.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use dooropener::app::events::AppEvent;
use dooropener::app::ports::{
    ConfigError, ConfigPort, EventSink, HttpClientPort, HttpError, Indicator, IndicatorPort,
    RelayInputPort, StorageError, StoragePort, SystemPort,
};
use dooropener::config::BridgeConfig;
use dooropener::relay::RelayId;

// ── MockHardware ──────────────────────────────────────────────

/// Relay inputs the test can "press", plus LED/bell state.
#[derive(Default)]
pub struct MockHardware {
    pending: [bool; 2],
    lit: HashMap<String, bool>,
    pub bell_output: bool,
    /// Every rising edge on the bell output line.
    pub bell_pulses: u32,
    pub all_off_calls: u32,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one debounced press for the next poll.
    pub fn press(&mut self, relay: RelayId) {
        self.pending[relay.index()] = true;
    }

    pub fn is_lit(&self, indicator: Indicator) -> bool {
        self.lit.get(&format!("{indicator:?}")).copied().unwrap_or(false)
    }
}

impl RelayInputPort for MockHardware {
    fn poll_press(&mut self, relay: RelayId, _now_ms: u64) -> bool {
        core::mem::take(&mut self.pending[relay.index()])
    }
}

impl IndicatorPort for MockHardware {
    fn set_indicator(&mut self, indicator: Indicator, on: bool) {
        self.lit.insert(format!("{indicator:?}"), on);
    }

    fn set_bell_output(&mut self, on: bool) {
        if on && !self.bell_output {
            self.bell_pulses += 1;
        }
        self.bell_output = on;
    }

    fn all_off(&mut self) {
        self.all_off_calls += 1;
        self.lit.clear();
        self.bell_output = false;
    }
}

// ── MockHttp ──────────────────────────────────────────────────

/// Answers from a URL → status table; unknown URLs get `200`.
#[derive(Default)]
pub struct MockHttp {
    responses: HashMap<String, Result<u16, HttpError>>,
    pub requests: Vec<String>,
}

#[allow(dead_code)]
impl MockHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&mut self, url: &str, response: Result<u16, HttpError>) {
        self.responses.insert(url.into(), response);
    }

    pub fn count(&self, url: &str) -> usize {
        self.requests.iter().filter(|u| *u == url).count()
    }
}

impl HttpClientPort for MockHttp {
    fn get(&mut self, url: &str) -> Result<u16, HttpError> {
        self.requests.push(url.into());
        self.responses.get(url).copied().unwrap_or(Ok(200))
    }
}

// ── MockNvs ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockNvs {
    store: HashMap<String, Vec<u8>>,
    saved: RefCell<Option<BridgeConfig>>,
    pub save_count: Cell<u32>,
    pub fail_saves: Cell<bool>,
}

#[allow(dead_code)]
impl MockNvs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved_config(&self) -> Option<BridgeConfig> {
        self.saved.borrow().clone()
    }
}

impl StoragePort for MockNvs {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.store.get(&format!("{namespace}::{key}")) {
            Some(v) => {
                let n = v.len().min(buf.len());
                buf[..n].copy_from_slice(&v[..n]);
                Ok(n)
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.store.insert(format!("{namespace}::{key}"), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store.remove(&format!("{namespace}::{key}"));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.store.contains_key(&format!("{namespace}::{key}"))
    }
}

impl ConfigPort for MockNvs {
    fn load(&self) -> Result<BridgeConfig, ConfigError> {
        Ok(self.saved.borrow().clone().unwrap_or_default())
    }

    fn save(&self, config: &BridgeConfig) -> Result<(), ConfigError> {
        if self.fail_saves.get() {
            return Err(ConfigError::IoError);
        }
        self.save_count.set(self.save_count.get() + 1);
        *self.saved.borrow_mut() = Some(config.clone());
        Ok(())
    }
}

// ── MockSystem ────────────────────────────────────────────────

#[derive(Default)]
pub struct MockSystem {
    pub restarts: u32,
}

impl SystemPort for MockSystem {
    fn restart(&mut self) {
        self.restarts += 1;
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
