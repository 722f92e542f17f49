//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below exercises one subsystem against the mock adapters in
//! `mock_hw`.  All tests run on the host with no hardware.

mod app_service_tests;
mod mock_hw;
mod web_api_tests;
