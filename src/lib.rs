//! Dooropener bridge library.
//!
//! Turns the two dry-contact relay outputs of a door intercom into HTTP
//! calls against actor switches, rings a local bell, and watches the
//! uplink with a connectivity probe that reboots the device when it stays
//! offline.  Everything except the ESP-IDF glue is host-testable; platform
//! code is guarded by `#[cfg(target_os = "espidf")]` inside each module.

#![deny(unused_must_use)]

pub mod app;
pub mod bell;
pub mod config;
pub mod lifecheck;
pub mod relay;
pub mod status;
pub mod web;

pub mod adapters;
pub mod drivers;

pub mod error;
pub mod pins;

pub use error::{Error, Result};
