//! Bell (gong) output driver.
//!
//! The bell is a plain switched output (relay or MOSFET driving the gong
//! coil).  Timing lives in [`crate::bell::Bell`]; this driver only owns the
//! pin and guarantees the line ends up low when dropped.

use embedded_hal::digital::OutputPin;
use log::{info, warn};

pub struct BellDriver<P: OutputPin> {
    pin: P,
    sounding: bool,
}

impl<P: OutputPin> BellDriver<P> {
    pub fn new(mut pin: P) -> Self {
        if pin.set_low().is_err() {
            warn!("Bell: initial GPIO write failed");
        }
        Self { pin, sounding: false }
    }

    pub fn set(&mut self, on: bool) {
        if self.sounding == on {
            return;
        }
        let result = if on { self.pin.set_high() } else { self.pin.set_low() };
        match result {
            Ok(()) => {
                self.sounding = on;
                if on {
                    info!("Bell: honk");
                }
            }
            Err(_) => warn!("Bell: GPIO write failed"),
        }
    }

    pub fn is_sounding(&self) -> bool {
        self.sounding
    }
}

impl<P: OutputPin> Drop for BellDriver<P> {
    fn drop(&mut self) {
        let _ = self.pin.set_low();
    }
}
