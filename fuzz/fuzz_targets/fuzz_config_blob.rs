//! Fuzz target: `decode_config`
//!
//! Corrupted NVS blobs must decode to an error, never a panic, and any
//! blob that does decode is a valid configuration.
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use dooropener::adapters::nvs::decode_config;
use dooropener::config::validate_config;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(cfg) = decode_config(data) {
        assert!(validate_config(&cfg).is_ok());
    }
});
