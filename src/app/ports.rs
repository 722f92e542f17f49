//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (relay inputs, indicators, HTTP client, storage, reboot)
//! implement these traits.  The [`AppService`](super::service::AppService)
//! consumes them via generics, so the domain core never touches hardware
//! or the network directly.

use crate::config::BridgeConfig;
use crate::relay::RelayId;

// ───────────────────────────────────────────────────────────────
// Relay input port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain asks whether a relay input was pressed.
pub trait RelayInputPort {
    /// Returns `true` once per debounced press since the previous poll.
    fn poll_press(&mut self, relay: RelayId, now_ms: u64) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Indicator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Local status LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// Application is running (life check heartbeat).
    Run,
    /// Last connectivity probe succeeded.
    Wlan,
    /// The relay's actor switch is being held on.
    Relay(RelayId),
    /// The bell is sounding.
    Bell,
}

/// Write-side port: the domain drives LEDs and the bell output through this.
pub trait IndicatorPort {
    fn set_indicator(&mut self, indicator: Indicator, on: bool);

    /// Drive the bell (gong) output line.
    fn set_bell_output(&mut self, on: bool);

    /// Switch every LED and the bell output off.
    fn all_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// HTTP client port (driven adapter: domain → network)
// ───────────────────────────────────────────────────────────────

/// Plain HTTP GET used for actor switch calls and connectivity probes.
pub trait HttpClientPort {
    /// Fetch `url` and return the response status code.
    fn get(&mut self, url: &str) -> Result<u16, HttpError>;
}

// ───────────────────────────────────────────────────────────────
// System port (driven adapter: domain → SoC)
// ───────────────────────────────────────────────────────────────

pub trait SystemPort {
    /// Restart the device.  On hardware this does not return.
    fn restart(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the bridge configuration.
///
/// Implementations MUST validate before persisting and reject invalid
/// ranges with [`ConfigError::ValidationFailed`] instead of clamping.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`BridgeConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<BridgeConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &BridgeConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for small records (e.g. the last reboot reason).
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations and the key-value config view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// The key is not part of the configuration.
    UnknownKey(String),
    /// The value could not be parsed for the given key.
    InvalidValue(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

/// Errors from [`HttpClientPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    /// The URL is empty or not http/https.
    InvalidUrl,
    /// DNS, TCP or TLS setup failed.
    Connect,
    /// No response within the configured timeout.
    Timeout,
    /// The connection broke while sending or receiving.
    Io,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::UnknownKey(key) => write!(f, "unknown key: {}", key),
            Self::InvalidValue(key) => write!(f, "invalid value for {}", key),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for HttpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidUrl => write!(f, "invalid URL"),
            Self::Connect => write!(f, "connection failed"),
            Self::Timeout => write!(f, "request timed out"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}
