//! Fuzz target: `apply_config_patch`
//!
//! Arbitrary request bodies must either be rejected or produce a
//! configuration that passes validation.
//!
//! cargo fuzz run fuzz_config_patch

#![no_main]

use dooropener::config::{validate_config, BridgeConfig};
use dooropener::web::routes::apply_config_patch;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let base = BridgeConfig::default();
    if let Ok(cfg) = apply_config_patch(&base, data) {
        assert!(validate_config(&cfg).is_ok(), "patch produced an invalid config");
        // Secrets never appear in the listing.
        for (key, value) in cfg.entries() {
            if key == "wifi.password" && !cfg.wifi_password.is_empty() {
                assert_ne!(value, cfg.wifi_password);
            }
        }
    }
});
