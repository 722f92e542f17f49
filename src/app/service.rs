//! Application service: the hexagonal core.
//!
//! [`AppService`] owns both relay channels, the bell, the life check and
//! the live configuration.  It exposes a clean, hardware-agnostic API.  All
//! I/O flows through port traits injected at call sites, making the entire
//! service testable with mock adapters.
//!
//! ```text
//!  RelayInputPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                     │        AppService        │
//!   IndicatorPort ◀── │ Relays · Bell · LifeCheck│ ──▶ HttpClientPort
//!                     └──────────────────────────┘
//! ```

use log::{error, info, warn};

use crate::bell::Bell;
use crate::config::{validate_config, BridgeConfig, STORAGE_NAMESPACE};
use crate::lifecheck::{LifeCheck, LifeCheckAction};
use crate::relay::{RelayAction, RelayChannel, RelayId};
use crate::status::{DeviceInfo, RebootReason, RelayStatus, StatusSnapshot};

use super::commands::AppCommand;
use super::events::{AppEvent, CallOutcome, PressSource};
use super::ports::{
    ConfigPort, EventSink, HttpClientPort, Indicator, IndicatorPort, RelayInputPort, StoragePort,
    SystemPort,
};

/// Quiet period after the last config change before it is written to NVS.
pub const AUTO_SAVE_DELAY_MS: u64 = 5_000;

/// Grace period between scheduling a reboot and performing it, so the
/// HTTP response that requested it can still leave the device.
pub const REBOOT_DELAY_MS: u64 = 1_000;

/// Storage key of the persisted [`RebootReason`].
pub const REBOOT_REASON_KEY: &str = "rebootrsn";

#[derive(Debug, Clone, Copy)]
struct PendingReboot {
    at_ms: u64,
    reason: RebootReason,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService {
    config: BridgeConfig,
    relays: [RelayChannel; 2],
    /// Virtual presses queued by `TriggerRelay`, consumed on the next tick.
    virtual_presses: [bool; 2],
    bell: Bell,
    life: LifeCheck,
    boot_ms: u64,
    config_dirty: bool,
    dirty_since_ms: u64,
    config_generation: u32,
    pending_reboot: Option<PendingReboot>,
    last_reboot_reason: Option<RebootReason>,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// `now_ms` is the boot reference for the connectivity watchdog.
    pub fn new(config: BridgeConfig, now_ms: u64) -> Self {
        let relays = RelayId::ALL.map(|id| RelayChannel::new(id, config.relay(id)));
        let bell = Bell::new(config.bell_honk_ms);
        let life = LifeCheck::new(&config, now_ms);
        Self {
            config,
            relays,
            virtual_presses: [false; 2],
            bell,
            life,
            boot_ms: now_ms,
            config_dirty: false,
            dirty_since_ms: 0,
            config_generation: 0,
            pending_reboot: None,
            last_reboot_reason: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Read (and clear) the reason recorded before the previous restart.
    pub fn restore_reboot_reason(&mut self, storage: &mut impl StoragePort) -> Option<RebootReason> {
        if !storage.exists(STORAGE_NAMESPACE, REBOOT_REASON_KEY) {
            return None;
        }
        let mut buf = [0u8; 8];
        let reason = match storage.read(STORAGE_NAMESPACE, REBOOT_REASON_KEY, &mut buf) {
            Ok(n) => postcard::from_bytes::<RebootReason>(&buf[..n]).ok(),
            Err(e) => {
                warn!("Reboot reason unreadable: {}", e);
                None
            }
        };
        if let Err(e) = storage.delete(STORAGE_NAMESPACE, REBOOT_REASON_KEY) {
            warn!("Reboot reason not cleared: {}", e);
        }
        if let Some(reason) = reason {
            info!("Last reboot: {}", reason);
        }
        self.last_reboot_reason = reason;
        reason
    }

    /// Switch every indicator off and honk once if configured.
    pub fn start(&mut self, now_ms: u64, hw: &mut impl IndicatorPort, sink: &mut impl EventSink) {
        hw.all_off();
        let startup_honk = self.config.bell_startup_honk;
        sink.emit(&AppEvent::Started { startup_honk });
        info!(
            "AppService started ({}: {}, {}: {})",
            RelayId::Relay1,
            self.config.relay(RelayId::Relay1).name,
            RelayId::Relay2,
            self.config.relay(RelayId::Relay2).name,
        );
        if startup_honk {
            self.honk(now_ms, sink);
        }
        self.refresh_indicators(hw);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one loop iteration: inputs → on calls → cool-downs → off calls →
    /// bell → life check → watchdog → indicators.
    ///
    /// The `hw` parameter satisfies **both** [`RelayInputPort`] and
    /// [`IndicatorPort`], which avoids a double mutable borrow while keeping
    /// the port boundary explicit.
    pub fn tick(
        &mut self,
        now_ms: u64,
        hw: &mut (impl RelayInputPort + IndicatorPort),
        http: &mut impl HttpClientPort,
        sink: &mut impl EventSink,
    ) {
        // 1. Presses (physical edges first, then queued virtual presses)
        for id in RelayId::ALL {
            if hw.poll_press(id, now_ms) {
                self.press(id, PressSource::Input, now_ms, http, sink);
            }
            if core::mem::take(&mut self.virtual_presses[id.index()]) {
                self.press(id, PressSource::Virtual, now_ms, http, sink);
            }
        }

        // 2. Cool-downs
        for id in RelayId::ALL {
            if let Some(action) = self.relays[id.index()].tick(now_ms) {
                self.call_actor(id, action, http, sink);
                info!("{} ({}): cooled down", id, self.config.relay(id).name);
                sink.emit(&AppEvent::RelayCooledDown(id));
            }
        }

        // 3. Bell
        self.bell.tick(now_ms);

        // 4. Life check
        match self.life.tick(now_ms) {
            LifeCheckAction::Probe => {
                let online = self.probe(http);
                self.life.record_probe(now_ms, online);
                sink.emit(&AppEvent::ConnectivityChecked { online });
            }
            LifeCheckAction::Skipped => {
                warn!("WLAN check skipped: no online url configured");
                sink.emit(&AppEvent::ConnectivitySkipped);
            }
            LifeCheckAction::Idle => {}
        }

        // 5. Connectivity watchdog
        if self.pending_reboot.is_none() && self.life.reboot_due(now_ms) {
            error!(
                "No connectivity for {} s, rebooting",
                self.life.offline_for_ms(now_ms) / 1000
            );
            self.schedule_reboot(now_ms, RebootReason::ConnectivityLost, sink);
        }

        // 6. Indicators
        self.refresh_indicators(hw);
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (from the HTTP API).
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u64,
        hw: &mut impl IndicatorPort,
        sink: &mut impl EventSink,
    ) {
        match cmd {
            AppCommand::Honk => self.honk(now_ms, sink),
            AppCommand::TriggerRelay(id) => {
                self.virtual_presses[id.index()] = true;
            }
            AppCommand::SetRelayEnabled(id, enabled) => {
                self.relays[id.index()].set_enabled(enabled);
                self.config.relay_mut(id).enabled = enabled;
                self.config_generation = self.config_generation.wrapping_add(1);
                self.mark_config_dirty(now_ms);
                info!(
                    "{} ({}): listening {}",
                    id,
                    self.config.relay(id).name,
                    if enabled { "enabled" } else { "disabled" }
                );
                sink.emit(&AppEvent::RelayEnabledChanged { relay: id, enabled });
            }
            AppCommand::UpdateConfig(new_config) => self.apply_config(new_config, now_ms, sink),
            AppCommand::Reboot => self.schedule_reboot(now_ms, RebootReason::Requested, sink),
        }
        self.refresh_indicators(hw);
    }

    /// Restart the device once a scheduled reboot is due.
    ///
    /// Flushes unsaved config and records the reason first.  Returns `true`
    /// if a restart was issued (on hardware this does not return).
    pub fn reboot_if_due<S>(
        &mut self,
        now_ms: u64,
        storage: &mut S,
        hw: &mut impl IndicatorPort,
        system: &mut impl SystemPort,
    ) -> bool
    where
        S: ConfigPort + StoragePort,
    {
        let Some(pending) = self.pending_reboot else {
            return false;
        };
        if now_ms < pending.at_ms {
            return false;
        }
        self.force_save_if_dirty(&*storage);

        let mut buf = [0u8; 8];
        match postcard::to_slice(&pending.reason, &mut buf) {
            Ok(bytes) => {
                if let Err(e) = storage.write(STORAGE_NAMESPACE, REBOOT_REASON_KEY, bytes) {
                    warn!("Reboot reason not stored: {}", e);
                }
            }
            Err(e) => warn!("Reboot reason not encoded: {}", e),
        }

        info!("Restarting: {}", pending.reason);
        self.pending_reboot = None;
        hw.all_off();
        system.restart();
        true
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a status snapshot for the web API.
    pub fn status(&self, now_ms: u64, device: &DeviceInfo, wifi_connected: bool) -> StatusSnapshot {
        let relays = self
            .relays
            .iter()
            .map(|ch| RelayStatus {
                number: ch.id().number(),
                name: self.config.relay(ch.id()).name.clone(),
                enabled: ch.is_enabled(),
                active: ch.is_holding(),
                remaining_ms: ch.remaining_ms(now_ms),
                trigger_count: ch.trigger_count(),
                failed_calls: ch.failed_calls(),
                last_trigger_secs_ago: ch
                    .last_trigger_ms()
                    .map(|t| now_ms.saturating_sub(t) / 1000),
            })
            .collect();

        StatusSnapshot {
            device: device.clone(),
            uptime_secs: now_ms.saturating_sub(self.boot_ms) / 1000,
            wifi_connected,
            online: self.life.online(),
            offline_secs: self.life.offline_for_ms(now_ms) / 1000,
            reboot_in_secs: self.life.reboot_in_ms(now_ms).map(|ms| ms / 1000),
            reboot_pending: self.pending_reboot.map(|p| p.reason),
            last_reboot_reason: self.last_reboot_reason,
            bell_sounding: self.bell.is_sounding(),
            honk_count: self.bell.honk_count(),
            probe_count: self.life.probe_count(),
            config_dirty: self.config_dirty,
            relays,
        }
    }

    /// The live configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Bumped on every applied config change (lets the loop spot new WiFi
    /// credentials or a new poll interval).
    pub fn config_generation(&self) -> u32 {
        self.config_generation
    }

    pub fn relay(&self, id: RelayId) -> &RelayChannel {
        &self.relays[id.index()]
    }

    pub fn bell(&self) -> &Bell {
        &self.bell
    }

    pub fn life_check(&self) -> &LifeCheck {
        &self.life
    }

    pub fn reboot_pending(&self) -> Option<RebootReason> {
        self.pending_reboot.map(|p| p.reason)
    }

    pub fn last_reboot_reason(&self) -> Option<RebootReason> {
        self.last_reboot_reason
    }

    // ── Internal ──────────────────────────────────────────────

    fn press(
        &mut self,
        id: RelayId,
        source: PressSource,
        now_ms: u64,
        http: &mut impl HttpClientPort,
        sink: &mut impl EventSink,
    ) {
        match self.relays[id.index()].press(now_ms) {
            Ok(action) => {
                info!("{} ({}): pressed ({:?})", id, self.config.relay(id).name, source);
                sink.emit(&AppEvent::RelayPressed { relay: id, source });
                self.call_actor(id, action, http, sink);
            }
            Err(reason) => {
                info!("{}: press ignored ({:?})", id, reason);
                sink.emit(&AppEvent::RelayIgnored {
                    relay: id,
                    source,
                    reason,
                });
            }
        }
    }

    /// GET the relay's on or off URL.  Failures are counted, never retried.
    fn call_actor(
        &mut self,
        id: RelayId,
        action: RelayAction,
        http: &mut impl HttpClientPort,
        sink: &mut impl EventSink,
    ) {
        let relay = self.config.relay(id);
        let (url, half) = match action {
            RelayAction::SwitchOn => (relay.on_url.as_str(), "on"),
            RelayAction::SwitchOff => (relay.off_url.as_str(), "off"),
        };

        let outcome = if url.is_empty() {
            warn!("{} ({}): no {} url", id, relay.name, half);
            CallOutcome::NoUrl
        } else {
            let outcome = CallOutcome::from_response(http.get(url));
            match outcome {
                CallOutcome::Success(_) => info!("call successful: {}", url),
                CallOutcome::Rejected(status) => error!("call failed: {} (HTTP {})", url, status),
                CallOutcome::Failed(e) => error!("call failed: {} ({})", url, e),
                CallOutcome::NoUrl => {}
            }
            outcome
        };

        if outcome.is_failure() {
            self.relays[id.index()].record_failed_call();
        }
        sink.emit(&AppEvent::SwitchCalled {
            relay: id,
            action,
            outcome,
        });
    }

    fn probe(&self, http: &mut impl HttpClientPort) -> bool {
        let url = self.config.online_check_url.as_str();
        match http.get(url) {
            Ok(status) if (200..300).contains(&status) => true,
            Ok(status) => {
                error!("WLAN failed! {} answered HTTP {}", url, status);
                false
            }
            Err(e) => {
                error!("WLAN failed! {} ({})", url, e);
                false
            }
        }
    }

    fn honk(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        if self.bell.honk(now_ms) {
            sink.emit(&AppEvent::BellRang);
        } else {
            info!("Bell already sounding, honk dropped");
        }
    }

    fn apply_config(&mut self, new_config: BridgeConfig, now_ms: u64, sink: &mut impl EventSink) {
        if let Err(e) = validate_config(&new_config) {
            warn!("Config update rejected: {}", e);
            sink.emit(&AppEvent::ConfigRejected(e));
            return;
        }
        for id in RelayId::ALL {
            self.relays[id.index()].reconfigure(new_config.relay(id));
        }
        self.bell.set_honk_ms(new_config.bell_honk_ms);
        self.life.reconfigure(&new_config, now_ms);
        self.config = new_config;
        self.config_generation = self.config_generation.wrapping_add(1);
        self.mark_config_dirty(now_ms);
        info!("Configuration updated at runtime");
        sink.emit(&AppEvent::ConfigUpdated);
    }

    fn schedule_reboot(&mut self, now_ms: u64, reason: RebootReason, sink: &mut impl EventSink) {
        if self.pending_reboot.is_some() {
            return;
        }
        self.pending_reboot = Some(PendingReboot {
            at_ms: now_ms + REBOOT_DELAY_MS,
            reason,
        });
        sink.emit(&AppEvent::RebootScheduled(reason));
    }

    /// Mirror domain state onto the LEDs and the bell line.
    fn refresh_indicators(&self, hw: &mut impl IndicatorPort) {
        hw.set_indicator(Indicator::Run, self.life.run_led());
        hw.set_indicator(Indicator::Wlan, self.life.wlan_led());
        for ch in &self.relays {
            hw.set_indicator(Indicator::Relay(ch.id()), ch.is_holding());
        }
        hw.set_indicator(Indicator::Bell, self.bell.is_sounding());
        hw.set_bell_output(self.bell.is_sounding());
    }

    // ── Config dirty-flag management ──────────────────────────

    /// Mark the config as modified; restarts the auto-save countdown.
    pub fn mark_config_dirty(&mut self, now_ms: u64) {
        self.config_dirty = true;
        self.dirty_since_ms = now_ms;
    }

    /// Save once the config has been quiet for [`AUTO_SAVE_DELAY_MS`].
    /// Returns `true` if the config was saved.
    pub fn auto_save_if_needed(&mut self, now_ms: u64, storage: &impl ConfigPort) -> bool {
        if !self.config_dirty || now_ms.saturating_sub(self.dirty_since_ms) < AUTO_SAVE_DELAY_MS {
            return false;
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config auto-saved to NVS");
                true
            }
            Err(e) => {
                warn!("Config auto-save failed: {}", e);
                // Retry after another quiet period instead of every tick.
                self.dirty_since_ms = now_ms;
                false
            }
        }
    }

    /// Force-save if dirty (call before a restart).
    pub fn force_save_if_dirty(&mut self, storage: &impl ConfigPort) {
        if !self.config_dirty {
            return;
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config force-saved before restart");
            }
            Err(e) => {
                warn!("Config force-save failed: {}", e);
            }
        }
    }

    /// Whether the config has unsaved changes.
    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }
}
