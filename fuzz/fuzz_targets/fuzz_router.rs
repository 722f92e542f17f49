//! Fuzz target: `ApiRouter::handle`
//!
//! The first byte picks the method, the bytes up to the first NUL form the
//! path and the rest is the body.  Every request gets a response with a
//! known status and at most one queued command.
//!
//! cargo fuzz run fuzz_router

#![no_main]

use core::time::Duration;

use dooropener::app::mailbox::CommandMailbox;
use dooropener::config::BridgeConfig;
use dooropener::status::DeviceInfo;
use dooropener::web::routes::{ApiRequest, ApiRouter, HttpMethod};
use dooropener::web::shared_state;
use libfuzzer_sys::fuzz_target;

fn frozen() -> Duration {
    Duration::ZERO
}

fuzz_target!(|data: &[u8]| {
    let Some((&m, rest)) = data.split_first() else {
        return;
    };
    let method = match m % 3 {
        0 => HttpMethod::Get,
        1 => HttpMethod::Post,
        _ => HttpMethod::Other,
    };
    let split = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
    let Ok(path) = core::str::from_utf8(&rest[..split]) else {
        return;
    };
    let body = rest.get(split + 1..).unwrap_or(&[]);

    let mut router = ApiRouter::with_clock(frozen);
    let state = shared_state(DeviceInfo::default(), BridgeConfig::default());
    let mailbox = CommandMailbox::new();

    let resp = router.handle(&ApiRequest { method, path, body }, &state, &mailbox);
    assert!(matches!(resp.status, 200 | 202 | 400 | 404 | 405 | 413 | 429 | 503));
    assert!(mailbox.len() <= 1);
});
