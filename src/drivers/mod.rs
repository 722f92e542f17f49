//! Board drivers and one-shot hardware initialisation.

pub mod bell;
pub mod hw_init;
pub mod relay_input;
pub mod status_led;
pub mod watchdog;
