//! Single-colour status LED driver.
//!
//! One GPIO per LED (run, WLAN, relay 1, relay 2, bell).  The driver caches
//! the last written state so the control loop can refresh every LED on each
//! iteration without redundant register writes.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives a [`RawGpio`](super::hw_init::RawGpio) output.
//! On host/test: any `embedded-hal` output pin (mocks track state in memory).

use embedded_hal::digital::OutputPin;
use log::warn;

pub struct StatusLed<P: OutputPin> {
    pin: P,
    label: &'static str,
    lit: Option<bool>,
}

impl<P: OutputPin> StatusLed<P> {
    pub fn new(pin: P, label: &'static str) -> Self {
        Self {
            pin,
            label,
            lit: None,
        }
    }

    pub fn set(&mut self, on: bool) {
        if self.lit == Some(on) {
            return;
        }
        let result = if on { self.pin.set_high() } else { self.pin.set_low() };
        match result {
            Ok(()) => self.lit = Some(on),
            Err(_) => warn!("{} LED: GPIO write failed", self.label),
        }
    }

    pub fn off(&mut self) {
        self.set(false);
    }

    pub fn is_lit(&self) -> bool {
        self.lit == Some(true)
    }
}
