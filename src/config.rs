//! Bridge configuration and its flat key-value view.
//!
//! [`BridgeConfig`] is the typed, serde-derived configuration.  The HTTP
//! API and the status page never touch its fields directly; they go
//! through [`BridgeConfig::get`] / [`BridgeConfig::set`] using the dotted
//! keys listed in [`CONFIG_KEYS`].
//!
//! Values are validated by [`validate_config`] before they are persisted
//! or queued for the control loop.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::relay::RelayId;

/// Actor switch settings for one relay input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Display name used in logs and on the status page.
    pub name: String,
    /// URL fetched to switch the actor on (empty = no call).
    pub on_url: String,
    /// URL fetched to switch the actor off (empty = no call).
    pub off_url: String,
    /// Time between the on call and the off call.
    pub cool_down_secs: u16,
    /// Whether presses on this input are acted upon.
    pub enabled: bool,
}

/// Core bridge configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    // --- Relays ---
    pub relays: [RelayConfig; 2],

    // --- Bell ---
    /// How long the bell output stays on per honk (milliseconds)
    pub bell_honk_ms: u32,
    /// Honk once after boot as an audible self-test
    pub bell_startup_honk: bool,

    // --- Life check ---
    /// URL probed to decide whether the bridge is online (empty = skip)
    pub online_check_url: String,
    /// Seconds between connectivity probes
    pub online_check_interval_secs: u32,
    /// Reboot after this long without a successful probe (0 = never)
    pub offline_reboot_secs: u32,

    // --- Inputs ---
    /// Main loop poll interval (milliseconds)
    pub poll_interval_ms: u32,
    /// Minimum gap between two accepted relay edges (milliseconds)
    pub debounce_ms: u32,

    // --- HTTP client ---
    /// Request timeout for actor calls and probes (milliseconds)
    pub http_timeout_ms: u32,

    // --- WiFi ---
    pub wifi_ssid: String,
    pub wifi_password: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            relays: [
                RelayConfig {
                    name: "Relay 1".into(),
                    on_url: String::new(),
                    off_url: String::new(),
                    cool_down_secs: 3,
                    enabled: true,
                },
                RelayConfig {
                    name: "Relay 2".into(),
                    on_url: String::new(),
                    off_url: String::new(),
                    cool_down_secs: 60,
                    enabled: true,
                },
            ],

            bell_honk_ms: 200,
            bell_startup_honk: true,

            online_check_url: "https://google.de".into(),
            online_check_interval_secs: 60,
            offline_reboot_secs: 30 * 60,

            poll_interval_ms: 50,
            debounce_ms: 50,

            http_timeout_ms: 5_000,

            wifi_ssid: option_env!("DOOROPENER_WIFI_SSID").unwrap_or("").into(),
            wifi_password: option_env!("DOOROPENER_WIFI_PASS").unwrap_or("").into(),
        }
    }
}

/// Every key understood by [`BridgeConfig::get`] and [`BridgeConfig::set`],
/// in display order.
pub const CONFIG_KEYS: &[&str] = &[
    "relay1.name",
    "relay1.on_url",
    "relay1.off_url",
    "relay1.cool_down_secs",
    "relay1.enabled",
    "relay2.name",
    "relay2.on_url",
    "relay2.off_url",
    "relay2.cool_down_secs",
    "relay2.enabled",
    "bell.honk_ms",
    "bell.startup_honk",
    "life_check.url",
    "life_check.interval_secs",
    "life_check.offline_reboot_secs",
    "input.poll_interval_ms",
    "input.debounce_ms",
    "http.timeout_ms",
    "wifi.ssid",
    "wifi.password",
];

/// Keys whose values are never echoed back over the API.
pub const SECRET_KEYS: &[&str] = &["wifi.password"];

/// NVS namespace shared by the config blob and the reboot-reason record.
pub const STORAGE_NAMESPACE: &str = "dooropener";

impl BridgeConfig {
    pub fn relay(&self, id: RelayId) -> &RelayConfig {
        &self.relays[id.index()]
    }

    pub fn relay_mut(&mut self, id: RelayId) -> &mut RelayConfig {
        &mut self.relays[id.index()]
    }

    /// Read a single value rendered as a string.
    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        if let Some((relay, field)) = split_relay_key(key) {
            let r = self.relay(relay);
            return match field {
                "name" => Ok(r.name.clone()),
                "on_url" => Ok(r.on_url.clone()),
                "off_url" => Ok(r.off_url.clone()),
                "cool_down_secs" => Ok(r.cool_down_secs.to_string()),
                "enabled" => Ok(r.enabled.to_string()),
                _ => Err(ConfigError::UnknownKey(key.into())),
            };
        }
        match key {
            "bell.honk_ms" => Ok(self.bell_honk_ms.to_string()),
            "bell.startup_honk" => Ok(self.bell_startup_honk.to_string()),
            "life_check.url" => Ok(self.online_check_url.clone()),
            "life_check.interval_secs" => Ok(self.online_check_interval_secs.to_string()),
            "life_check.offline_reboot_secs" => Ok(self.offline_reboot_secs.to_string()),
            "input.poll_interval_ms" => Ok(self.poll_interval_ms.to_string()),
            "input.debounce_ms" => Ok(self.debounce_ms.to_string()),
            "http.timeout_ms" => Ok(self.http_timeout_ms.to_string()),
            "wifi.ssid" => Ok(self.wifi_ssid.clone()),
            "wifi.password" => Ok(self.wifi_password.clone()),
            _ => Err(ConfigError::UnknownKey(key.into())),
        }
    }

    /// Parse `value` and store it under `key`.
    ///
    /// Only the syntax of the value is checked here; range checks happen in
    /// [`validate_config`] once every change of a batch has been applied.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let canonical = canonical_key(key)?;
        let raw = value;
        let value = raw.trim();

        if let Some((relay, field)) = split_relay_key(canonical) {
            let r = self.relay_mut(relay);
            match field {
                "name" => r.name = value.into(),
                "on_url" => r.on_url = value.into(),
                "off_url" => r.off_url = value.into(),
                "cool_down_secs" => r.cool_down_secs = parse_num(canonical, value)?,
                "enabled" => r.enabled = parse_bool(canonical, value)?,
                _ => return Err(ConfigError::UnknownKey(key.into())),
            }
            return Ok(());
        }

        match canonical {
            "bell.honk_ms" => self.bell_honk_ms = parse_num(canonical, value)?,
            "bell.startup_honk" => self.bell_startup_honk = parse_bool(canonical, value)?,
            "life_check.url" => self.online_check_url = value.into(),
            "life_check.interval_secs" => {
                self.online_check_interval_secs = parse_num(canonical, value)?;
            }
            "life_check.offline_reboot_secs" => {
                self.offline_reboot_secs = parse_num(canonical, value)?;
            }
            "input.poll_interval_ms" => self.poll_interval_ms = parse_num(canonical, value)?,
            "input.debounce_ms" => self.debounce_ms = parse_num(canonical, value)?,
            "http.timeout_ms" => self.http_timeout_ms = parse_num(canonical, value)?,
            "wifi.ssid" => self.wifi_ssid = value.into(),
            // Passwords may legitimately start or end with spaces.
            "wifi.password" => self.wifi_password = raw.into(),
            _ => return Err(ConfigError::UnknownKey(key.into())),
        }
        Ok(())
    }

    /// All key/value pairs in [`CONFIG_KEYS`] order, secrets masked.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        CONFIG_KEYS
            .iter()
            .map(|&key| {
                let value = self.get(key).unwrap_or_default();
                if SECRET_KEYS.contains(&key) {
                    (key, mask_secret(&value))
                } else {
                    (key, value)
                }
            })
            .collect()
    }
}

fn canonical_key(key: &str) -> Result<&'static str, ConfigError> {
    CONFIG_KEYS
        .iter()
        .copied()
        .find(|k| *k == key)
        .ok_or_else(|| ConfigError::UnknownKey(key.into()))
}

fn split_relay_key(key: &str) -> Option<(RelayId, &str)> {
    let (prefix, field) = key.split_once('.')?;
    RelayId::ALL
        .into_iter()
        .find(|id| id.key_prefix() == prefix)
        .map(|id| (id, field))
}

fn parse_num<T: core::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue(key))
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue(key)),
    }
}

/// Replace a secret with asterisks (at most 8, so the length is not leaked).
pub fn mask_secret(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        "*".repeat(value.len().min(8))
    }
}

fn is_http_url(url: &str) -> bool {
    url.is_empty() || url.starts_with("http://") || url.starts_with("https://")
}

/// Range-check every field.  Invalid values are rejected, never clamped.
pub fn validate_config(cfg: &BridgeConfig) -> Result<(), ConfigError> {
    for relay in &cfg.relays {
        if relay.name.is_empty() || relay.name.chars().count() > 32 {
            return Err(ConfigError::ValidationFailed(
                "relay name must be 1–32 characters",
            ));
        }
        if !is_http_url(&relay.on_url) || !is_http_url(&relay.off_url) {
            return Err(ConfigError::ValidationFailed(
                "relay URLs must be empty or start with http:// or https://",
            ));
        }
        if !(1..=3600).contains(&relay.cool_down_secs) {
            return Err(ConfigError::ValidationFailed(
                "relay cool_down_secs must be 1–3600",
            ));
        }
    }
    if !(20..=5000).contains(&cfg.bell_honk_ms) {
        return Err(ConfigError::ValidationFailed("bell.honk_ms must be 20–5000"));
    }
    if !is_http_url(&cfg.online_check_url) {
        return Err(ConfigError::ValidationFailed(
            "life_check.url must be empty or start with http:// or https://",
        ));
    }
    if !(10..=3600).contains(&cfg.online_check_interval_secs) {
        return Err(ConfigError::ValidationFailed(
            "life_check.interval_secs must be 10–3600",
        ));
    }
    if cfg.offline_reboot_secs != 0
        && cfg.offline_reboot_secs < cfg.online_check_interval_secs.saturating_mul(2)
    {
        return Err(ConfigError::ValidationFailed(
            "life_check.offline_reboot_secs must be 0 or at least twice the interval",
        ));
    }
    if !(10..=1000).contains(&cfg.poll_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "input.poll_interval_ms must be 10–1000",
        ));
    }
    if cfg.debounce_ms > 2000 {
        return Err(ConfigError::ValidationFailed("input.debounce_ms must be 0–2000"));
    }
    if !(500..=30_000).contains(&cfg.http_timeout_ms) {
        return Err(ConfigError::ValidationFailed(
            "http.timeout_ms must be 500–30000",
        ));
    }
    if cfg.wifi_ssid.len() > 32 || !cfg.wifi_ssid.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
        return Err(ConfigError::ValidationFailed(
            "wifi.ssid must be at most 32 printable ASCII characters",
        ));
    }
    if !cfg.wifi_password.is_empty() && !(8..=64).contains(&cfg.wifi_password.len()) {
        return Err(ConfigError::ValidationFailed(
            "wifi.password must be empty or 8–64 bytes",
        ));
    }
    Ok(())
}
