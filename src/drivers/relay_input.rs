//! Relay input driver with edge latch and debounce.
//!
//! Each intercom relay is a dry contact on a GPIO.  A short pulse can
//! arrive while the control loop is blocked in an actor call, so edges are
//! captured twice:
//!
//! * the GPIO ISR stores the edge time in a per-relay atomic latch
//!   ([`latch_edge`]), and
//! * [`RelayInput::poll`] samples the level and detects inactive→active
//!   transitions itself.
//!
//! Either source yields a candidate edge; the candidate is accepted when at
//! least `debounce_ms` passed since the previously accepted one.  A level
//! that stays active does not retrigger.

use core::sync::atomic::{AtomicU32, Ordering};

use embedded_hal::digital::InputPin;
use log::warn;

/// Number of relay inputs with an ISR latch.
pub const RELAY_INPUTS: usize = 2;

/// ISR → main-loop edge latches (ms since boot; 0 = empty).
static EDGE_LATCH: [AtomicU32; RELAY_INPUTS] = [AtomicU32::new(0), AtomicU32::new(0)];

/// Record an edge from ISR context.  Lock-free; later edges overwrite earlier
/// ones until the main loop takes the latch.
pub fn latch_edge(index: usize, now_ms: u32) {
    if let Some(slot) = EDGE_LATCH.get(index) {
        slot.store(now_ms.max(1), Ordering::Release);
    }
}

fn take_latched_edge(index: usize) -> Option<u32> {
    let slot = EDGE_LATCH.get(index)?;
    match slot.swap(0, Ordering::AcqRel) {
        0 => None,
        t => Some(t),
    }
}

pub struct RelayInput<P: InputPin> {
    pin: P,
    /// Latch slot shared with the ISR (`None` = level polling only).
    latch: Option<usize>,
    active_high: bool,
    debounce_ms: u32,
    was_active: bool,
    last_accepted_ms: Option<u32>,
}

impl<P: InputPin> RelayInput<P> {
    pub fn new(pin: P, latch: Option<usize>, active_high: bool, debounce_ms: u32) -> Self {
        if let Some(index) = latch {
            // Drop anything the ISR caught before we existed.
            let _ = take_latched_edge(index);
        }
        Self {
            pin,
            latch,
            active_high,
            debounce_ms,
            was_active: false,
            last_accepted_ms: None,
        }
    }

    pub fn set_debounce_ms(&mut self, debounce_ms: u32) {
        self.debounce_ms = debounce_ms;
    }

    /// Returns `true` exactly once per debounced activation.
    pub fn poll(&mut self, now_ms: u32) -> bool {
        let active = self.is_active();
        let level_edge = active && !self.was_active;
        self.was_active = active;

        let latched = self.latch.and_then(take_latched_edge);
        let edge_ms = match (latched, level_edge) {
            (Some(t), _) => t,
            (None, true) => now_ms,
            (None, false) => return false,
        };

        if let Some(last) = self.last_accepted_ms {
            if edge_ms.wrapping_sub(last) < self.debounce_ms {
                return false;
            }
        }
        self.last_accepted_ms = Some(edge_ms);
        true
    }

    /// Raw level mapped to active/inactive (read errors count as inactive).
    pub fn is_active(&mut self) -> bool {
        match self.pin.is_high() {
            Ok(high) => high == self.active_high,
            Err(_) => {
                warn!("relay input: pin read failed, treating as inactive");
                false
            }
        }
    }
}
