//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules for the bridge: relay
//! cool-downs, actor calls, the bell, the life check and the connectivity
//! watchdog.  All interaction with hardware and the network happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod commands;
pub mod events;
pub mod mailbox;
pub mod ports;
pub mod service;
