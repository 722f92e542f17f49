//! Status snapshot published by the control loop and served by the web API.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why the device restarted (or is about to).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RebootReason {
    /// `POST /api/reboot`.
    Requested,
    /// No successful connectivity probe for too long.
    ConnectivityLost,
}

impl fmt::Display for RebootReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => write!(f, "requested via API"),
            Self::ConnectivityLost => write!(f, "connectivity lost"),
        }
    }
}

/// Static identity of this bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub device_id: String,
    pub hostname: String,
    pub firmware_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayStatus {
    pub number: u8,
    pub name: String,
    pub enabled: bool,
    /// Actor is held on (cool-down running).
    pub active: bool,
    pub remaining_ms: Option<u64>,
    pub trigger_count: u32,
    pub failed_calls: u32,
    /// Seconds since the last accepted press.
    pub last_trigger_secs_ago: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub device: DeviceInfo,
    pub uptime_secs: u64,
    pub wifi_connected: bool,
    /// Result of the latest probe (`None` before the first one or when disabled).
    pub online: Option<bool>,
    pub offline_secs: u64,
    /// Seconds left before the connectivity watchdog restarts the device.
    pub reboot_in_secs: Option<u64>,
    pub reboot_pending: Option<RebootReason>,
    pub last_reboot_reason: Option<RebootReason>,
    pub bell_sounding: bool,
    pub honk_count: u32,
    pub probe_count: u32,
    pub config_dirty: bool,
    pub relays: Vec<RelayStatus>,
}

impl StatusSnapshot {
    /// Placeholder published before the control loop's first iteration.
    pub fn booting(device: DeviceInfo) -> Self {
        Self {
            device,
            uptime_secs: 0,
            wifi_connected: false,
            online: None,
            offline_secs: 0,
            reboot_in_secs: None,
            reboot_pending: None,
            last_reboot_reason: None,
            bell_sounding: false,
            honk_count: 0,
            probe_count: 0,
            config_dirty: false,
            relays: Vec::new(),
        }
    }
}
