//! Integration tests for the HTTP router, from request to queued command
//! and on into the application service.

use std::cell::Cell;
use std::time::Duration;

use crate::mock_hw::{MockHardware, MockHttp, RecordingSink};

use dooropener::app::commands::AppCommand;
use dooropener::app::mailbox::{CommandMailbox, MAILBOX_DEPTH};
use dooropener::app::service::AppService;
use dooropener::config::BridgeConfig;
use dooropener::relay::RelayId;
use dooropener::status::DeviceInfo;
use dooropener::web::routes::{ApiRequest, ApiResponse, ApiRouter, HttpMethod};
use dooropener::web::{lock_state, publish_status, shared_state, SharedState, ACTION_BURST};

thread_local! {
    static CLOCK_MS: Cell<u64> = const { Cell::new(0) };
}

fn test_clock() -> Duration {
    Duration::from_millis(CLOCK_MS.with(Cell::get))
}

fn set_clock(ms: u64) {
    CLOCK_MS.with(|c| c.set(ms));
}

fn device() -> DeviceInfo {
    DeviceInfo {
        device_id: "DO-AABBCC".into(),
        hostname: "dooropener-aabbcc".into(),
        firmware_version: "0.3.0".into(),
    }
}

fn setup() -> (ApiRouter, SharedState, CommandMailbox) {
    set_clock(0);
    let mut cfg = BridgeConfig::default();
    cfg.wifi_ssid = "HomeNet".into();
    cfg.wifi_password = "correct horse".into();
    (
        ApiRouter::with_clock(test_clock),
        shared_state(device(), cfg),
        CommandMailbox::new(),
    )
}

fn json(resp: &ApiResponse) -> serde_json::Value {
    assert_eq!(resp.content_type, "application/json");
    serde_json::from_str(&resp.body).expect("response body is JSON")
}

#[test]
fn status_reflects_published_snapshot() {
    let (mut router, state, mailbox) = setup();

    let resp = router.handle(&ApiRequest::get("/api/status"), &state, &mailbox);
    assert_eq!(resp.status, 200);
    assert_eq!(json(&resp)["device"]["device_id"], "DO-AABBCC");

    let app = AppService::new(BridgeConfig::default(), 0);
    publish_status(&state, app.status(61_000, &device(), true));

    let body = json(&router.handle(&ApiRequest::get("/api/status"), &state, &mailbox));
    assert_eq!(body["uptime_secs"], 61);
    assert_eq!(body["wifi_connected"], true);
    assert_eq!(body["relays"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["relays"][1]["name"], "Relay 2");
}

#[test]
fn config_listing_masks_password() {
    let (mut router, state, mailbox) = setup();

    let body = json(&router.handle(&ApiRequest::get("/api/config"), &state, &mailbox));
    assert_eq!(body["wifi.ssid"], "HomeNet");
    assert_eq!(body["wifi.password"], "********");
    assert_eq!(body["relay1.cool_down_secs"], "3");
    assert_eq!(body["life_check.url"], "https://google.de");
}

#[test]
fn config_patch_queues_validated_update() {
    let (mut router, state, mailbox) = setup();

    let resp = router.handle(
        &ApiRequest::post(
            "/api/config",
            br#"{"relay1.on_url": "http://10.0.0.7/on", "relay1.cool_down_secs": 8, "wifi.password": "********"}"#,
        ),
        &state,
        &mailbox,
    );
    assert_eq!(resp.status, 202);

    let Some(AppCommand::UpdateConfig(cfg)) = mailbox.take() else {
        panic!("expected a queued config update");
    };
    assert_eq!(cfg.relays[0].on_url, "http://10.0.0.7/on");
    assert_eq!(cfg.relays[0].cool_down_secs, 8);
    assert_eq!(cfg.wifi_password, "correct horse");

    // The next GET already sees the patch.
    let body = json(&router.handle(&ApiRequest::get("/api/config"), &state, &mailbox));
    assert_eq!(body["relay1.cool_down_secs"], "8");
}

#[test]
fn bad_config_patch_is_400_and_changes_nothing() {
    let (mut router, state, mailbox) = setup();
    let before = lock_state(&state).config.clone();

    for body in [
        &br#"{"relay1.cool_down_secs": 0}"#[..],
        br#"{"relay1.on_url": "ftp://nope"}"#,
        br#"{"bell.honk_ms": "loud"}"#,
        br#"{"no.such.key": 1}"#,
        br#"{"bell.honk_ms": [1]}"#,
        br#"[1, 2]"#,
        b"not json",
    ] {
        let resp = router.handle(&ApiRequest::post("/api/config", body), &state, &mailbox);
        assert_eq!(resp.status, 400, "body {:?}", String::from_utf8_lossy(body));
        assert!(json(&resp)["error"].is_string());
    }
    assert!(mailbox.is_empty());
    assert_eq!(lock_state(&state).config, before);
}

#[test]
fn action_endpoints_queue_commands() {
    let (mut router, state, mailbox) = setup();

    let cases = [
        ("/api/bell", AppCommand::Honk),
        ("/api/relay/2/trigger", AppCommand::TriggerRelay(RelayId::Relay2)),
        ("/api/relay/1/enable", AppCommand::SetRelayEnabled(RelayId::Relay1, true)),
        ("/api/reboot", AppCommand::Reboot),
    ];
    for (path, expected) in cases {
        let resp = router.handle(&ApiRequest::post(path, b""), &state, &mailbox);
        assert_eq!(resp.status, 202, "{path}");
        assert_eq!(mailbox.take(), Some(expected));
    }
}

#[test]
fn unknown_paths_and_methods() {
    let (mut router, state, mailbox) = setup();

    assert_eq!(router.handle(&ApiRequest::get("/api/nothing"), &state, &mailbox).status, 404);
    assert_eq!(router.handle(&ApiRequest::post("/api/relay/9/trigger", b""), &state, &mailbox).status, 404);
    assert_eq!(router.handle(&ApiRequest::get("/api/reboot"), &state, &mailbox).status, 405);

    let delete = ApiRequest { method: HttpMethod::Other, path: "/api/config", body: b"" };
    let resp = router.handle(&delete, &state, &mailbox);
    assert_eq!(resp.status, 405);
    assert_eq!(json(&resp)["error"], "method not allowed");
}

#[test]
fn index_serves_html_page() {
    let (mut router, state, mailbox) = setup();

    let resp = router.handle(&ApiRequest::get("/"), &state, &mailbox);
    assert_eq!(resp.status, 200);
    assert!(resp.content_type.starts_with("text/html"));
    assert!(resp.body.contains("DO-AABBCC"));
    assert!(!resp.body.contains("correct horse"));
}

#[test]
fn actions_are_rate_limited_and_refill() {
    let (mut router, state, mailbox) = setup();

    for _ in 0..ACTION_BURST {
        assert_eq!(router.handle(&ApiRequest::post("/api/bell", b""), &state, &mailbox).status, 202);
    }
    let resp = router.handle(&ApiRequest::post("/api/bell", b""), &state, &mailbox);
    assert_eq!(resp.status, 429);
    assert_eq!(mailbox.len(), ACTION_BURST as usize);

    // Reads are never limited.
    assert_eq!(router.handle(&ApiRequest::get("/api/status"), &state, &mailbox).status, 200);

    set_clock(60_000);
    assert_eq!(router.handle(&ApiRequest::post("/api/bell", b""), &state, &mailbox).status, 202);
}

#[test]
fn full_mailbox_is_503() {
    let (mut router, state, mailbox) = setup();
    for _ in 0..MAILBOX_DEPTH {
        assert!(mailbox.post(AppCommand::Honk).is_ok());
    }

    let resp = router.handle(&ApiRequest::post("/api/relay/1/trigger", b""), &state, &mailbox);
    assert_eq!(resp.status, 503);
    assert_eq!(mailbox.len(), MAILBOX_DEPTH);
}

#[test]
fn virtual_press_reaches_the_actor() {
    let (mut router, state, mailbox) = setup();
    let mut cfg = BridgeConfig::default();
    cfg.relays[0].on_url = "http://actor.local/on".into();
    cfg.bell_startup_honk = false;
    cfg.online_check_url = String::new();

    let mut app = AppService::new(cfg, 0);
    let mut hw = MockHardware::new();
    let mut http = MockHttp::new();
    let mut sink = RecordingSink::new();
    app.start(0, &mut hw, &mut sink);

    let resp = router.handle(&ApiRequest::post("/api/relay/1/trigger", b""), &state, &mailbox);
    assert_eq!(resp.status, 202);

    while let Some(cmd) = mailbox.take() {
        app.handle_command(cmd, 10, &mut hw, &mut sink);
    }
    app.tick(20, &mut hw, &mut http, &mut sink);

    assert_eq!(http.requests, vec!["http://actor.local/on".to_string()]);
    assert_eq!(app.relay(RelayId::Relay1).trigger_count(), 1);
}
