//! Dooropener firmware: main entry point.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                     │
//! │                                                               │
//! │  HardwareAdapter     HttpClientAdapter   NvsAdapter           │
//! │  (RelayInput+Indic.) (HttpClient)        (Config+Storage)     │
//! │  WifiAdapter         SystemAdapter       LogEventSink         │
//! │                                                               │
//! │  ─────────────────── Port Trait Boundary ─────────────────    │
//! │                                                               │
//! │  ┌─────────────────────────────────────────────────────────┐  │
//! │  │           AppService (pure logic)                       │  │
//! │  │   RelayChannel ×2 · Bell · LifeCheck                    │  │
//! │  └─────────────────────────────────────────────────────────┘  │
//! │                                                               │
//! │  HTTP server task ──CommandMailbox──▶ control loop            │
//! │                   ◀──SharedState────                          │
//! └───────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use dooropener::adapters::device_id;
use dooropener::adapters::hardware::HardwareAdapter;
use dooropener::adapters::http::HttpClientAdapter;
use dooropener::adapters::log_sink::LogEventSink;
use dooropener::adapters::nvs::NvsAdapter;
use dooropener::adapters::system::SystemAdapter;
use dooropener::adapters::time::uptime_ms;
use dooropener::adapters::wifi::{ConnectivityPort, WifiAdapter};
use dooropener::app::mailbox::CommandMailbox;
use dooropener::app::ports::ConfigPort;
use dooropener::app::service::AppService;
use dooropener::config::BridgeConfig;
use dooropener::drivers::hw_init;
use dooropener::drivers::watchdog::{timeout_for, Watchdog};
use dooropener::web;

/// Commands from the HTTP server task to the control loop.
static MAILBOX: CommandMailbox = CommandMailbox::new();

/// How often the status snapshot is republished for the web side.
const STATUS_PUBLISH_MS: u64 = 500;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Dooropener v{:<24}║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Peripherals ────────────────────────────────────────
    hw_init::init_peripherals().map_err(dooropener::Error::from)?;
    if let Err(e) = hw_init::init_isr_service() {
        warn!("ISR service init failed: {}; relay inputs fall back to level polling", e);
    }

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 3. Config from NVS (or defaults) ──────────────────────
    let mut nvs = NvsAdapter::new(nvs_partition.clone());
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Stored config unusable ({}), using defaults", e);
            BridgeConfig::default()
        }
    };

    // ── 4. Device identity ────────────────────────────────────
    let mac = device_id::read_mac();
    let device = device_id::device_info(&mac);
    info!("Device ID: {} (hostname: {})", device.device_id, device.hostname);

    // ── 5. Application core ───────────────────────────────────
    let mut app = AppService::new(config.clone(), uptime_ms());
    if let Some(reason) = app.restore_reboot_reason(&mut nvs) {
        info!("Last reboot: {}", reason);
    }

    // ── 6. WiFi station ───────────────────────────────────────
    let mut wifi = WifiAdapter::new(peripherals.modem, sysloop, nvs_partition, &device.hostname)?;
    let mut wifi_credentials = (config.wifi_ssid.clone(), config.wifi_password.clone());
    join_network(&mut wifi, &config, uptime_ms());

    // ── 7. Web interface ──────────────────────────────────────
    let state = web::shared_state(device.clone(), config.clone());
    let _server = web::server::start(state.clone(), &MAILBOX)?;

    // ── 8. Adapters ───────────────────────────────────────────
    let mut hw = HardwareAdapter::with_board_pins(config.debounce_ms);
    let mut http = HttpClientAdapter::new(config.http_timeout_ms);
    let mut system = SystemAdapter::new();
    let mut sink = LogEventSink::new();

    // The loop may block in HTTP calls, so the TWDT timeout follows the
    // request timeout.  Subscribed last: WiFi bring-up blocks longer.
    let mut watchdog = Watchdog::new(timeout_for(config.http_timeout_ms));

    app.start(uptime_ms(), &mut hw, &mut sink);
    let mut generation = app.config_generation();
    let mut last_publish: Option<u64> = None;

    info!("System ready. Entering control loop.");

    // ── 9. Control loop ───────────────────────────────────────
    loop {
        let now = uptime_ms();
        while let Some(cmd) = MAILBOX.take() {
            app.handle_command(cmd, now, &mut hw, &mut sink);
        }

        app.tick(now, &mut hw, &mut http, &mut sink);

        // Actor calls and probes may have blocked; re-read the clock.
        let now = uptime_ms();
        app.reboot_if_due(now, &mut nvs, &mut hw, &mut system);
        app.auto_save_if_needed(now, &nvs);
        wifi.poll(now);

        if app.config_generation() != generation {
            generation = app.config_generation();
            let cfg = app.config();
            hw.set_debounce_ms(cfg.debounce_ms);
            http.set_timeout_ms(cfg.http_timeout_ms);
            watchdog.set_timeout(timeout_for(cfg.http_timeout_ms));
            if (cfg.wifi_ssid.as_str(), cfg.wifi_password.as_str())
                != (wifi_credentials.0.as_str(), wifi_credentials.1.as_str())
            {
                wifi_credentials = (cfg.wifi_ssid.clone(), cfg.wifi_password.clone());
                wifi.disconnect();
                join_network(&mut wifi, cfg, now);
            }
            web::publish_config(&state, cfg);
        }

        if last_publish.is_none_or(|t| now.saturating_sub(t) >= STATUS_PUBLISH_MS) {
            web::publish_status(&state, app.status(now, &device, wifi.is_connected()));
            last_publish = Some(now);
        }

        watchdog.feed();
        std::thread::sleep(Duration::from_millis(u64::from(app.config().poll_interval_ms)));
    }
}

/// Apply the configured credentials and make a first connection attempt.
/// Failures are retried by [`ConnectivityPort::poll`].
fn join_network(wifi: &mut WifiAdapter, config: &BridgeConfig, now_ms: u64) {
    if config.wifi_ssid.is_empty() {
        warn!("WiFi: no SSID configured; set wifi.ssid or build with DOOROPENER_WIFI_SSID");
        return;
    }
    if let Err(e) = wifi.set_credentials(&config.wifi_ssid, &config.wifi_password) {
        warn!("WiFi: {}", e);
        return;
    }
    if let Err(e) = wifi.connect(now_ms) {
        warn!("WiFi: initial connect failed ({}), retrying in background", e);
    }
}
