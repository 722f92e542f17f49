//! Device identity derived from the factory MAC address.
//!
//! `DO-XXYYZZ` (last three MAC bytes, uppercase) identifies the bridge on
//! the status page and in the boot log; `dooropener-xxyyzz` is the network
//! hostname.

use core::fmt::Write;

use crate::status::DeviceInfo;

pub type DeviceIdString = heapless::String<16>;
pub type HostnameString = heapless::String<24>;
pub type MacAddress = [u8; 6];

#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: writes exactly six bytes into `mac`.
    let ret = unsafe { esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr()) };
    if ret != esp_idf_svc::sys::ESP_OK as i32 {
        log::warn!("device_id: eFuse MAC read failed ({})", ret);
    }
    mac
}

/// Simulation MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0x02, 0x00, 0x00, 0xD0, 0x0B, 0x1E]
}

pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    let mut id = DeviceIdString::new();
    let _ = write!(id, "DO-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}

pub fn hostname(mac: &MacAddress) -> HostnameString {
    let mut name = HostnameString::new();
    let _ = write!(name, "dooropener-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    name
}

/// Identity block for the status snapshot.
pub fn device_info(mac: &MacAddress) -> DeviceInfo {
    DeviceInfo {
        device_id: device_id(mac).as_str().into(),
        hostname: hostname(mac).as_str().into(),
        firmware_version: env!("CARGO_PKG_VERSION").into(),
    }
}
