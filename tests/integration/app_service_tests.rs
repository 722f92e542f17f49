//! Integration tests for the AppService → ports pipeline.
//!
//! Relay presses, actor calls, the bell, the life check watchdog and the
//! config persistence path, each driven through the mock adapters with an
//! explicit millisecond clock.

use crate::mock_hw::{MockHardware, MockHttp, MockNvs, MockSystem, RecordingSink};

use dooropener::app::commands::AppCommand;
use dooropener::app::events::{AppEvent, CallOutcome, PressSource};
use dooropener::app::ports::{HttpError, Indicator, StoragePort};
use dooropener::app::service::{AppService, AUTO_SAVE_DELAY_MS, REBOOT_REASON_KEY};
use dooropener::config::{BridgeConfig, STORAGE_NAMESPACE};
use dooropener::relay::{IgnoreReason, RelayAction, RelayId};
use dooropener::status::{DeviceInfo, RebootReason};

const ON: &str = "http://actor.local/relay/0?turn=on";
const OFF: &str = "http://actor.local/relay/0?turn=off";
const PROBE: &str = "http://probe.local/";

fn config() -> BridgeConfig {
    let mut cfg = BridgeConfig::default();
    cfg.relays[0].on_url = ON.into();
    cfg.relays[0].off_url = OFF.into();
    cfg.relays[0].cool_down_secs = 3;
    cfg.bell_startup_honk = false;
    cfg.online_check_url = String::new();
    cfg
}

struct Rig {
    app: AppService,
    hw: MockHardware,
    http: MockHttp,
    sink: RecordingSink,
}

impl Rig {
    fn new(cfg: BridgeConfig) -> Self {
        let mut rig = Self {
            app: AppService::new(cfg, 0),
            hw: MockHardware::new(),
            http: MockHttp::new(),
            sink: RecordingSink::new(),
        };
        rig.app.start(0, &mut rig.hw, &mut rig.sink);
        rig
    }

    fn tick(&mut self, now_ms: u64) {
        self.app.tick(now_ms, &mut self.hw, &mut self.http, &mut self.sink);
    }

    fn command(&mut self, cmd: AppCommand, now_ms: u64) {
        self.app.handle_command(cmd, now_ms, &mut self.hw, &mut self.sink);
    }
}

// ── Relay cycle ───────────────────────────────────────────────

#[test]
fn press_switches_actor_on_then_off_after_cool_down() {
    let mut rig = Rig::new(config());

    rig.hw.press(RelayId::Relay1);
    rig.tick(100);
    assert_eq!(rig.http.requests, vec![ON.to_string()]);
    assert!(rig.hw.is_lit(Indicator::Relay(RelayId::Relay1)));
    assert!(rig.sink.contains(&AppEvent::RelayPressed {
        relay: RelayId::Relay1,
        source: PressSource::Input,
    }));

    rig.tick(3_099);
    assert_eq!(rig.http.count(OFF), 0, "cool-down not over yet");

    rig.tick(3_100);
    assert_eq!(rig.http.requests, vec![ON.to_string(), OFF.to_string()]);
    assert!(!rig.hw.is_lit(Indicator::Relay(RelayId::Relay1)));
    assert!(rig.sink.contains(&AppEvent::RelayCooledDown(RelayId::Relay1)));
}

#[test]
fn press_during_cool_down_is_ignored() {
    let mut rig = Rig::new(config());

    rig.hw.press(RelayId::Relay1);
    rig.tick(0);
    rig.hw.press(RelayId::Relay1);
    rig.tick(1_000);

    assert_eq!(rig.http.count(ON), 1);
    assert!(rig.sink.contains(&AppEvent::RelayIgnored {
        relay: RelayId::Relay1,
        source: PressSource::Input,
        reason: IgnoreReason::Busy,
    }));

    // Armed again after the off call.
    rig.tick(3_000);
    rig.hw.press(RelayId::Relay1);
    rig.tick(3_050);
    assert_eq!(rig.http.count(ON), 2);
}

#[test]
fn relays_run_independently() {
    let mut cfg = config();
    cfg.relays[1].on_url = "http://gate.local/on".into();
    cfg.relays[1].off_url = "http://gate.local/off".into();
    cfg.relays[1].cool_down_secs = 60;
    let mut rig = Rig::new(cfg);

    rig.hw.press(RelayId::Relay1);
    rig.hw.press(RelayId::Relay2);
    rig.tick(0);
    rig.tick(3_000);

    assert_eq!(rig.http.count(OFF), 1);
    assert_eq!(rig.http.count("http://gate.local/off"), 0);
    assert!(rig.hw.is_lit(Indicator::Relay(RelayId::Relay2)));
    assert!(!rig.hw.is_lit(Indicator::Relay(RelayId::Relay1)));
}

#[test]
fn missing_urls_still_run_the_cycle() {
    let mut rig = Rig::new(BridgeConfig {
        bell_startup_honk: false,
        online_check_url: String::new(),
        ..BridgeConfig::default()
    });

    rig.hw.press(RelayId::Relay1);
    rig.tick(0);
    assert!(rig.http.requests.is_empty());
    assert!(rig.sink.contains(&AppEvent::SwitchCalled {
        relay: RelayId::Relay1,
        action: RelayAction::SwitchOn,
        outcome: CallOutcome::NoUrl,
    }));
    assert!(rig.app.relay(RelayId::Relay1).is_holding());
}

#[test]
fn failed_calls_are_counted_not_retried() {
    let mut rig = Rig::new(config());
    rig.http.respond(ON, Err(HttpError::Timeout));
    rig.http.respond(OFF, Ok(500));

    rig.hw.press(RelayId::Relay1);
    rig.tick(0);
    rig.tick(3_000);
    rig.tick(6_000);

    assert_eq!(rig.http.requests.len(), 2);
    let status = rig.app.status(6_000, &DeviceInfo::default(), true);
    assert_eq!(status.relays[0].failed_calls, 2);
    assert_eq!(status.relays[0].trigger_count, 1);
}

#[test]
fn disabling_mid_cycle_still_switches_off() {
    let mut rig = Rig::new(config());

    rig.hw.press(RelayId::Relay1);
    rig.tick(0);
    rig.command(AppCommand::SetRelayEnabled(RelayId::Relay1, false), 1_000);
    rig.tick(1_000);
    assert_eq!(rig.http.count(OFF), 0);

    rig.tick(3_000);
    assert_eq!(rig.http.requests, vec![ON.to_string(), OFF.to_string()]);
    assert!(!rig.hw.is_lit(Indicator::Relay(RelayId::Relay1)));

    // New presses are ignored until re-enabled.
    rig.hw.press(RelayId::Relay1);
    rig.tick(4_000);
    assert_eq!(rig.http.count(ON), 1);
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn virtual_trigger_runs_on_next_tick() {
    let mut rig = Rig::new(config());

    rig.command(AppCommand::TriggerRelay(RelayId::Relay1), 10);
    assert!(rig.http.requests.is_empty(), "no I/O from command handling");

    rig.tick(20);
    assert_eq!(rig.http.count(ON), 1);
    assert!(rig.sink.contains(&AppEvent::RelayPressed {
        relay: RelayId::Relay1,
        source: PressSource::Virtual,
    }));
}

#[test]
fn disabled_relay_ignores_presses_and_persists_after_quiet_period() {
    let mut rig = Rig::new(config());
    let nvs = MockNvs::new();

    rig.command(AppCommand::SetRelayEnabled(RelayId::Relay1, false), 1_000);
    assert!(rig.app.is_config_dirty());
    assert!(!rig.app.config().relays[0].enabled);

    rig.hw.press(RelayId::Relay1);
    rig.tick(1_100);
    assert!(rig.http.requests.is_empty());
    assert!(rig.sink.contains(&AppEvent::RelayIgnored {
        relay: RelayId::Relay1,
        source: PressSource::Input,
        reason: IgnoreReason::Disabled,
    }));

    assert!(!rig.app.auto_save_if_needed(1_000 + AUTO_SAVE_DELAY_MS - 1, &nvs));
    assert!(rig.app.auto_save_if_needed(1_000 + AUTO_SAVE_DELAY_MS, &nvs));
    assert_eq!(nvs.saved_config().map(|c| c.relays[0].enabled), Some(false));
    assert!(!rig.app.is_config_dirty());
}

#[test]
fn auto_save_waits_for_the_last_change() {
    let mut rig = Rig::new(config());
    let nvs = MockNvs::new();

    rig.command(AppCommand::SetRelayEnabled(RelayId::Relay2, false), 0);
    rig.command(AppCommand::SetRelayEnabled(RelayId::Relay2, true), 4_000);

    assert!(!rig.app.auto_save_if_needed(AUTO_SAVE_DELAY_MS, &nvs));
    assert!(rig.app.auto_save_if_needed(4_000 + AUTO_SAVE_DELAY_MS, &nvs));
    assert_eq!(nvs.save_count.get(), 1);
}

#[test]
fn failed_auto_save_retries_after_another_quiet_period() {
    let mut rig = Rig::new(config());
    let nvs = MockNvs::new();
    nvs.fail_saves.set(true);

    rig.command(AppCommand::SetRelayEnabled(RelayId::Relay1, false), 0);
    assert!(!rig.app.auto_save_if_needed(AUTO_SAVE_DELAY_MS, &nvs));
    assert!(rig.app.is_config_dirty());

    nvs.fail_saves.set(false);
    assert!(!rig.app.auto_save_if_needed(AUTO_SAVE_DELAY_MS + 1, &nvs));
    assert!(rig.app.auto_save_if_needed(2 * AUTO_SAVE_DELAY_MS, &nvs));
}

#[test]
fn config_update_applies_and_bumps_generation() {
    let mut rig = Rig::new(config());
    let before = rig.app.config_generation();

    let mut cfg = config();
    cfg.relays[0].cool_down_secs = 10;
    rig.command(AppCommand::UpdateConfig(cfg.clone()), 0);

    assert_eq!(rig.app.config(), &cfg);
    assert_ne!(rig.app.config_generation(), before);
    assert!(rig.sink.contains(&AppEvent::ConfigUpdated));

    rig.hw.press(RelayId::Relay1);
    rig.tick(100);
    rig.tick(3_100);
    assert_eq!(rig.http.count(OFF), 0, "new cool-down in effect");
    rig.tick(10_100);
    assert_eq!(rig.http.count(OFF), 1);
}

#[test]
fn invalid_config_update_rejected() {
    let mut rig = Rig::new(config());
    let before = rig.app.config_generation();

    let mut cfg = config();
    cfg.http_timeout_ms = 1;
    rig.command(AppCommand::UpdateConfig(cfg), 0);

    assert_eq!(rig.app.config(), &config());
    assert_eq!(rig.app.config_generation(), before);
    assert!(!rig.app.is_config_dirty());
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::ConfigRejected(_))),
        1
    );
}

// ── Bell ──────────────────────────────────────────────────────

#[test]
fn startup_honk_sounds_once_for_honk_ms() {
    let mut cfg = config();
    cfg.bell_startup_honk = true;
    cfg.bell_honk_ms = 200;
    let mut rig = Rig::new(cfg);

    assert_eq!(rig.hw.all_off_calls, 1);
    assert!(rig.hw.bell_output);
    assert!(rig.hw.is_lit(Indicator::Bell));
    assert!(rig.sink.contains(&AppEvent::Started { startup_honk: true }));

    rig.tick(199);
    assert!(rig.hw.bell_output);
    rig.tick(200);
    assert!(!rig.hw.bell_output);
    assert!(!rig.hw.is_lit(Indicator::Bell));
    assert_eq!(rig.hw.bell_pulses, 1);
}

#[test]
fn honk_while_sounding_is_dropped() {
    let mut rig = Rig::new(config());

    rig.command(AppCommand::Honk, 0);
    rig.command(AppCommand::Honk, 50);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::BellRang), 1);

    rig.tick(500);
    rig.command(AppCommand::Honk, 600);
    assert_eq!(rig.app.bell().honk_count(), 2);
    assert_eq!(rig.hw.bell_pulses, 2);
}

// ── Life check and watchdog ───────────────────────────────────

fn watchdog_config() -> BridgeConfig {
    let mut cfg = config();
    cfg.online_check_url = PROBE.into();
    cfg.online_check_interval_secs = 10;
    cfg.offline_reboot_secs = 20;
    cfg
}

#[test]
fn successful_probe_lights_wlan_led() {
    let mut rig = Rig::new(watchdog_config());

    rig.tick(0);
    assert_eq!(rig.http.count(PROBE), 1);
    assert!(rig.hw.is_lit(Indicator::Run));
    assert!(rig.hw.is_lit(Indicator::Wlan));
    assert!(rig.sink.contains(&AppEvent::ConnectivityChecked { online: true }));

    // Heartbeat gap, then the next probe.
    rig.tick(10_000);
    assert!(!rig.hw.is_lit(Indicator::Run));
    rig.tick(10_500);
    assert_eq!(rig.http.count(PROBE), 2);
    assert!(rig.hw.is_lit(Indicator::Run));
}

#[test]
fn offline_too_long_reboots_and_remembers_why() {
    let mut rig = Rig::new(watchdog_config());
    rig.http.respond(PROBE, Err(HttpError::Connect));
    let mut nvs = MockNvs::new();
    let mut system = MockSystem::default();

    for now in [0, 5_000, 10_000, 10_500, 15_000] {
        rig.tick(now);
    }
    assert!(rig.app.reboot_pending().is_none());
    assert!(!rig.hw.is_lit(Indicator::Wlan));
    let status = rig.app.status(15_000, &DeviceInfo::default(), true);
    assert_eq!(status.online, Some(false));
    assert_eq!(status.reboot_in_secs, Some(5));

    rig.tick(20_000);
    assert_eq!(rig.app.reboot_pending(), Some(RebootReason::ConnectivityLost));
    assert!(rig.sink.contains(&AppEvent::RebootScheduled(RebootReason::ConnectivityLost)));

    assert!(!rig.app.reboot_if_due(20_500, &mut nvs, &mut rig.hw, &mut system));
    assert!(rig.app.reboot_if_due(21_000, &mut nvs, &mut rig.hw, &mut system));
    assert_eq!(system.restarts, 1);
    assert!(nvs.exists(STORAGE_NAMESPACE, REBOOT_REASON_KEY));

    let mut next_boot = AppService::new(watchdog_config(), 0);
    assert_eq!(
        next_boot.restore_reboot_reason(&mut nvs),
        Some(RebootReason::ConnectivityLost)
    );
    assert_eq!(next_boot.last_reboot_reason(), Some(RebootReason::ConnectivityLost));
    assert!(!nvs.exists(STORAGE_NAMESPACE, REBOOT_REASON_KEY));
}

#[test]
fn probe_success_resets_the_offline_timer() {
    let mut rig = Rig::new(watchdog_config());
    rig.http.respond(PROBE, Err(HttpError::Timeout));

    rig.tick(0);
    rig.tick(10_000);
    rig.http.respond(PROBE, Ok(204));
    rig.tick(10_500);
    rig.tick(20_000);
    rig.tick(25_000);

    assert!(rig.app.reboot_pending().is_none());
    assert_eq!(rig.app.life_check().offline_for_ms(25_000), 14_500);
}

#[test]
fn no_probe_url_never_reboots() {
    let mut cfg = watchdog_config();
    cfg.online_check_url = String::new();
    let mut rig = Rig::new(cfg);

    for now in (0..=120_000).step_by(500) {
        rig.tick(now);
    }
    assert!(rig.http.requests.is_empty());
    assert!(rig.app.reboot_pending().is_none());
    assert!(rig.sink.count(|e| *e == AppEvent::ConnectivitySkipped) > 1);
    assert!(!rig.hw.is_lit(Indicator::Wlan));
}

#[test]
fn enabling_probe_at_runtime_probes_before_any_reboot() {
    let mut cfg = watchdog_config();
    cfg.online_check_url = String::new();
    let mut rig = Rig::new(cfg);

    // Two hours without a probe URL.
    for now in (0..=7_200_000).step_by(1_000) {
        rig.tick(now);
    }
    assert!(rig.app.reboot_pending().is_none());

    let mut armed = rig.app.config().clone();
    armed.online_check_url = PROBE.into();
    rig.http.respond(PROBE, Err(HttpError::Connect));
    rig.command(AppCommand::UpdateConfig(armed), 7_200_000);

    rig.tick(7_200_000);
    assert_eq!(rig.http.count(PROBE), 1, "first probe runs right away");
    assert!(rig.app.reboot_pending().is_none());

    for now in (7_201_000..20_000 + 7_200_000).step_by(1_000) {
        rig.tick(now);
    }
    assert!(rig.app.reboot_pending().is_none());

    rig.tick(7_220_000);
    assert_eq!(rig.app.reboot_pending(), Some(RebootReason::ConnectivityLost));
}

#[test]
fn requested_reboot_flushes_dirty_config_first() {
    let mut rig = Rig::new(config());
    let mut nvs = MockNvs::new();
    let mut system = MockSystem::default();

    rig.command(AppCommand::SetRelayEnabled(RelayId::Relay2, false), 0);
    rig.command(AppCommand::Reboot, 100);
    rig.command(AppCommand::Reboot, 200);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::RebootScheduled(_))),
        1
    );

    assert!(rig.app.reboot_if_due(1_100, &mut nvs, &mut rig.hw, &mut system));
    assert_eq!(nvs.save_count.get(), 1);
    assert_eq!(nvs.saved_config().map(|c| c.relays[1].enabled), Some(false));
    assert_eq!(system.restarts, 1);
    assert!(!rig.hw.bell_output);
}
