//! WiFi station-mode adapter.
//!
//! Implements [`ConnectivityPort`] on top of `esp_idf_svc::wifi::BlockingWifi`
//! on the device, and a scripted link on the host.
//!
//! ## Reconnection policy
//!
//! A failed attempt or a lost link schedules the next attempt after a
//! backoff of 2 s, doubling per failure and capped at 60 s.  The control
//! loop drives retries by calling [`ConnectivityPort::poll`] with the
//! current uptime, so nothing here sleeps.

use core::fmt;

use log::{error, info, warn};

#[cfg(target_os = "espidf")]
use esp_idf_hal::modem::Modem;
#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    nvs::EspDefaultNvsPartition,
    sys::EspError,
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};

pub const INITIAL_BACKOFF_MS: u64 = 2_000;
pub const MAX_BACKOFF_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (8-64 bytes, or empty for open networks)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

pub trait ConnectivityPort {
    /// Replace the station credentials.  Takes effect on the next connect.
    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError>;
    /// Try to join the network now.
    fn connect(&mut self, now_ms: u64) -> Result<(), ConnectivityError>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    /// Detect link loss and run due reconnect attempts.
    fn poll(&mut self, now_ms: u64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Idle,
    Connected,
    Backoff { attempt: u32, retry_at_ms: u64 },
}

pub fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    let printable = ssid.bytes().all(|b| (0x20..=0x7E).contains(&b));
    if ssid.is_empty() || ssid.len() > 32 || !printable {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if !password.is_empty() && !(8..=64).contains(&password.len()) {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    backoff_ms: u64,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimLink,
}

/// Host stand-in for the radio.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
struct SimLink {
    up: bool,
    failures_left: u32,
    attempts: u32,
}

#[cfg(target_os = "espidf")]
impl WifiAdapter {
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        hostname: &str,
    ) -> Result<Self, EspError> {
        let mut esp_wifi = EspWifi::new(modem, sysloop.clone(), Some(nvs))?;
        if let Err(e) = esp_wifi.sta_netif_mut().set_hostname(hostname) {
            warn!("WiFi: could not set hostname '{}': {}", hostname, e);
        }
        let wifi = BlockingWifi::wrap(esp_wifi, sysloop)?;
        Ok(Self::with_driver(wifi))
    }

    fn with_driver(wifi: BlockingWifi<EspWifi<'static>>) -> Self {
        Self {
            state: WifiState::Idle,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_ms: INITIAL_BACKOFF_MS,
            wifi,
        }
    }

    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        let failed = |step: &str, e: EspError| {
            warn!("WiFi: {} failed: {}", step, e);
            ConnectivityError::ConnectionFailed
        };
        self.wifi.set_configuration(&config).map_err(|e| failed("configure", e))?;
        if !self.wifi.is_started().map_err(|e| failed("query", e))? {
            self.wifi.start().map_err(|e| failed("start", e))?;
        }
        self.wifi.connect().map_err(|e| failed("connect", e))?;
        self.wifi.wait_netif_up().map_err(|e| failed("netif up", e))?;

        if let Ok(ip) = self.wifi.wifi().sta_netif().get_ip_info() {
            info!("WiFi: IP {}", ip.ip);
        }
        Ok(())
    }

    fn platform_disconnect(&mut self) {
        if let Err(e) = self.wifi.disconnect() {
            warn!("WiFi: disconnect: {}", e);
        }
    }

    fn platform_is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiAdapter {
    pub fn new() -> Self {
        Self {
            state: WifiState::Idle,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_ms: INITIAL_BACKOFF_MS,
            sim: SimLink::default(),
        }
    }

    /// Simulation: fail the next `n` connect attempts.
    pub fn sim_fail_next(&mut self, n: u32) {
        self.sim.failures_left = n;
    }

    /// Simulation: drop the link as if the AP went away.
    pub fn sim_drop_link(&mut self) {
        self.sim.up = false;
    }

    pub fn sim_attempts(&self) -> u32 {
        self.sim.attempts
    }

    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        self.sim.attempts += 1;
        if self.sim.failures_left > 0 {
            self.sim.failures_left -= 1;
            warn!("WiFi(sim): simulated failure (attempt {})", self.sim.attempts);
            return Err(ConnectivityError::ConnectionFailed);
        }
        self.sim.up = true;
        info!("WiFi(sim): joined '{}'", self.ssid);
        Ok(())
    }

    fn platform_disconnect(&mut self) {
        self.sim.up = false;
    }

    fn platform_is_connected(&self) -> bool {
        self.sim.up
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl WifiAdapter {
    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn has_credentials(&self) -> bool {
        !self.ssid.is_empty()
    }

    /// Delay before the next attempt after a failure.
    pub fn backoff_ms(&self) -> u64 {
        self.backoff_ms
    }

    fn attempt(&mut self, now_ms: u64, attempt: u32) -> Result<(), ConnectivityError> {
        match self.platform_connect() {
            Ok(()) => {
                self.state = WifiState::Connected;
                self.backoff_ms = INITIAL_BACKOFF_MS;
                info!("WiFi: connected to '{}'", self.ssid);
                Ok(())
            }
            Err(e) => {
                error!("WiFi: connection failed: {} (retry in {} ms)", e, self.backoff_ms);
                self.state = WifiState::Backoff {
                    attempt: attempt + 1,
                    retry_at_ms: now_ms.saturating_add(self.backoff_ms),
                };
                self.backoff_ms = (self.backoff_ms * 2).min(MAX_BACKOFF_MS);
                Err(e)
            }
        }
    }
}

impl ConnectivityPort for WifiAdapter {
    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials set (SSID='{}')", self.ssid);
        Ok(())
    }

    fn connect(&mut self, now_ms: u64) -> Result<(), ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        info!("WiFi: connecting to '{}'", self.ssid);
        self.attempt(now_ms, 0)
    }

    fn disconnect(&mut self) {
        self.platform_disconnect();
        self.state = WifiState::Idle;
        self.backoff_ms = INITIAL_BACKOFF_MS;
        info!("WiFi: disconnected");
    }

    fn is_connected(&self) -> bool {
        self.state == WifiState::Connected && self.platform_is_connected()
    }

    fn poll(&mut self, now_ms: u64) {
        match self.state {
            WifiState::Connected if !self.platform_is_connected() => {
                warn!("WiFi: connection lost, reconnecting in {} ms", self.backoff_ms);
                self.state = WifiState::Backoff {
                    attempt: 0,
                    retry_at_ms: now_ms.saturating_add(self.backoff_ms),
                };
            }
            WifiState::Backoff { attempt, retry_at_ms } if now_ms >= retry_at_ms => {
                info!("WiFi: reconnect attempt {}", attempt + 1);
                let _ = self.attempt(now_ms, attempt);
            }
            _ => {}
        }
    }
}
