//! Unified error type for the bridge.
//!
//! Every port has its own typed error; this enum is what they funnel into
//! when a caller (start-up code, the web server) only needs to report the
//! failure.  It implements `std::error::Error`, so `?` lifts it into
//! `anyhow::Result` at the binary's top level.

use core::fmt;

use crate::adapters::wifi::ConnectivityError;
use crate::app::ports::{ConfigError, HttpError, StorageError};
use crate::drivers::hw_init::HwInitError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Config(ConfigError),
    Storage(StorageError),
    Http(HttpError),
    Connectivity(ConnectivityError),
    Init(HwInitError),
    /// An ESP-IDF service failed to start (error code).
    Platform(i32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Http(e) => write!(f, "http: {e}"),
            Self::Connectivity(e) => write!(f, "wifi: {e}"),
            Self::Init(e) => write!(f, "init: {e}"),
            Self::Platform(rc) => write!(f, "platform error {rc}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<HttpError> for Error {
    fn from(e: HttpError) -> Self {
        Self::Http(e)
    }
}

impl From<ConnectivityError> for Error {
    fn from(e: ConnectivityError) -> Self {
        Self::Connectivity(e)
    }
}

impl From<HwInitError> for Error {
    fn from(e: HwInitError) -> Self {
        Self::Init(e)
    }
}

#[cfg(target_os = "espidf")]
impl From<esp_idf_svc::sys::EspError> for Error {
    fn from(e: esp_idf_svc::sys::EspError) -> Self {
        Self::Platform(e.code())
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
